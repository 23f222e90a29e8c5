//! Chain variants the kit can drive.
//!
//! Every chain shares the wire format and key derivation; what differs is
//! the BIP-44 coin type, the ids of the token-family programs and the public
//! RPC endpoints.

use std::fmt;

use derivable_keys::path::{SAFECOIN_COIN_TYPE, SOLANA_COIN_TYPE};
use derivable_tx::ProgramIds;
use serde::Deserialize;

/// Capabilities of one chain variant.
pub trait DerivableChain: fmt::Debug + Send + Sync {
    /// Stable identifier used to key storage and the kit registry.
    fn uid(&self) -> &'static str;

    fn coin_type(&self) -> u32;

    fn program_ids(&self) -> ProgramIds;

    fn mainnet_url(&self) -> &'static str;

    fn testnet_url(&self) -> &'static str;

    fn devnet_url(&self) -> &'static str;

    fn is_mainnet(&self, url: &str) -> bool {
        same_endpoint(url, self.mainnet_url())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Solana;

impl DerivableChain for Solana {
    fn uid(&self) -> &'static str {
        "solana"
    }

    fn coin_type(&self) -> u32 {
        SOLANA_COIN_TYPE
    }

    fn program_ids(&self) -> ProgramIds {
        ProgramIds::SOLANA
    }

    fn mainnet_url(&self) -> &'static str {
        "https://api.mainnet-beta.solana.com/"
    }

    fn testnet_url(&self) -> &'static str {
        "https://api.testnet.solana.com/"
    }

    fn devnet_url(&self) -> &'static str {
        "https://api.devnet.solana.com/"
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SafeCoin;

impl DerivableChain for SafeCoin {
    fn uid(&self) -> &'static str {
        "safe-coin"
    }

    fn coin_type(&self) -> u32 {
        SAFECOIN_COIN_TYPE
    }

    fn program_ids(&self) -> ProgramIds {
        ProgramIds::SAFECOIN
    }

    fn mainnet_url(&self) -> &'static str {
        "https://api.mainnet-beta.safecoin.org/"
    }

    fn testnet_url(&self) -> &'static str {
        "https://api.testnet.safecoin.org/"
    }

    fn devnet_url(&self) -> &'static str {
        "https://devnet.safely.org/"
    }
}

static SOLANA: Solana = Solana;
static SAFECOIN: SafeCoin = SafeCoin;

/// Chain selector as it appears in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainKind {
    Solana,
    Safecoin,
}

impl ChainKind {
    pub fn chain(self) -> &'static dyn DerivableChain {
        match self {
            ChainKind::Solana => &SOLANA,
            ChainKind::Safecoin => &SAFECOIN,
        }
    }
}

// Trailing slashes are not significant.
fn same_endpoint(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solana_variant() {
        let chain = ChainKind::Solana.chain();
        assert_eq!(chain.uid(), "solana");
        assert_eq!(chain.coin_type(), 501);
        assert_eq!(chain.program_ids(), ProgramIds::SOLANA);
    }

    #[test]
    fn safecoin_variant() {
        let chain = ChainKind::Safecoin.chain();
        assert_eq!(chain.uid(), "safe-coin");
        assert_eq!(chain.coin_type(), 19165);
        assert_eq!(chain.program_ids(), ProgramIds::SAFECOIN);
    }

    #[test]
    fn mainnet_detection() {
        let chain = Solana;
        assert!(chain.is_mainnet("https://api.mainnet-beta.solana.com/"));
        assert!(chain.is_mainnet("https://api.mainnet-beta.solana.com"));
        assert!(!chain.is_mainnet(chain.devnet_url()));
        assert!(!SafeCoin.is_mainnet(chain.mainnet_url()));
    }

    #[test]
    fn kind_from_config_text() {
        let kind: ChainKind = serde_json::from_str("\"safecoin\"").unwrap();
        assert_eq!(kind, ChainKind::Safecoin);
    }
}
