use std::time::Duration;

use config::{Config, Environment, File};
use derivable_keys::{DerivablePath, DerivationType};
use serde::Deserialize;

use crate::chain::{ChainKind, DerivableChain};
use crate::error::KitResult;

/// Settings for one kit instance.
///
/// Loaded from an optional file and `DERIVABLE__*` environment variables,
/// e.g. `DERIVABLE__CHAIN=safecoin`, `DERIVABLE__RPC_URL=https://...`.
#[derive(Debug, Deserialize, Clone)]
pub struct KitConfig {
    #[serde(default = "default_chain")]
    pub chain: ChainKind,
    /// Falls back to the chain's mainnet endpoint.
    #[serde(default)]
    pub rpc_url: Option<String>,
    #[serde(default)]
    pub wallet_index: u32,
    #[serde(default)]
    pub account_index: u32,
    #[serde(default = "default_derivation")]
    pub derivation: DerivationType,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// 0 disables periodic syncing; cycles then run only when triggered.
    #[serde(default)]
    pub sync_interval_secs: u64,
    #[serde(default = "default_post_send_refresh_delay_ms")]
    pub post_send_refresh_delay_ms: u64,
    #[serde(default = "default_signature_page_limit")]
    pub signature_page_limit: usize,
}

fn default_chain() -> ChainKind {
    ChainKind::Solana
}

fn default_derivation() -> DerivationType {
    DerivationType::Bip44Change
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_post_send_refresh_delay_ms() -> u64 {
    2000
}

fn default_signature_page_limit() -> usize {
    1000
}

impl Default for KitConfig {
    fn default() -> Self {
        Self::for_chain(default_chain())
    }
}

impl KitConfig {
    pub fn for_chain(chain: ChainKind) -> Self {
        Self {
            chain,
            rpc_url: None,
            wallet_index: 0,
            account_index: 0,
            derivation: default_derivation(),
            request_timeout_secs: default_request_timeout_secs(),
            sync_interval_secs: 0,
            post_send_refresh_delay_ms: default_post_send_refresh_delay_ms(),
            signature_page_limit: default_signature_page_limit(),
        }
    }

    /// Layer `path` (if it exists) under the environment.
    pub fn load(path: &str) -> KitResult<Self> {
        let config = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("DERIVABLE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn chain(&self) -> &'static dyn DerivableChain {
        self.chain.chain()
    }

    pub fn rpc_url(&self) -> String {
        self.rpc_url
            .clone()
            .unwrap_or_else(|| self.chain().mainnet_url().to_string())
    }

    pub fn derivation_path(&self) -> DerivablePath {
        DerivablePath::new(
            self.derivation,
            self.chain().coin_type(),
            self.wallet_index,
            Some(self.account_index),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn sync_interval(&self) -> Option<Duration> {
        (self.sync_interval_secs > 0).then(|| Duration::from_secs(self.sync_interval_secs))
    }

    pub fn post_send_refresh_delay(&self) -> Duration {
        Duration::from_millis(self.post_send_refresh_delay_ms)
    }
}
