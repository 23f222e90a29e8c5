//! Derivation path variants used by Solana-family wallets.

use std::fmt;

use serde::{Deserialize, Serialize};

/// BIP-44 coin type for Solana.
pub const SOLANA_COIN_TYPE: u32 = 501;
/// BIP-44 coin type for SafeCoin.
pub const SAFECOIN_COIN_TYPE: u32 = 19165;

/// Path layouts wallets have shipped over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivationType {
    /// `m/{coin}'/{wallet}'/0'/{account}'`
    Deprecated,
    /// `m/44'/{coin}'/{wallet}'`
    Bip44,
    /// `m/44'/{coin}'/{wallet}'/0'`
    Bip44Change,
}

/// A derivation path for one wallet of one chain.
///
/// Renders with a `'` marker on every segment because every segment is
/// derived hardened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DerivablePath {
    pub kind: DerivationType,
    pub coin_type: u32,
    pub wallet_index: u32,
    pub account_index: Option<u32>,
}

impl DerivablePath {
    pub fn new(
        kind: DerivationType,
        coin_type: u32,
        wallet_index: u32,
        account_index: Option<u32>,
    ) -> Self {
        Self {
            kind,
            coin_type,
            wallet_index,
            account_index,
        }
    }

    /// `bip44Change` path for `coin_type`, wallet 0, account 0.
    pub fn default_for(coin_type: u32) -> Self {
        Self::new(DerivationType::Bip44Change, coin_type, 0, Some(0))
    }

    pub fn rendered(&self) -> String {
        match self.kind {
            DerivationType::Deprecated => format!(
                "m/{}'/{}'/0'/{}'",
                self.coin_type,
                self.wallet_index,
                self.account_index.unwrap_or(0)
            ),
            DerivationType::Bip44 => {
                format!("m/44'/{}'/{}'", self.coin_type, self.wallet_index)
            }
            DerivationType::Bip44Change => {
                format!("m/44'/{}'/{}'/0'", self.coin_type, self.wallet_index)
            }
        }
    }
}

impl Default for DerivablePath {
    fn default() -> Self {
        Self::default_for(SAFECOIN_COIN_TYPE)
    }
}

impl fmt::Display for DerivablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered())
    }
}
