//! Non-custodial wallet kit for Solana and SafeCoin.
//!
//! A [`DerivableCoinKit`] ties one derived key pair to one node: it prepares
//! and submits native and SPL token transfers, and a [`Syncer`] keeps the
//! balance, block height and transfer history in a [`CoinStorage`] current,
//! publishing every change over `tokio` channels. [`KitRegistry`] owns the
//! open kits of an app.

pub mod blockchain_client;
pub mod chain;
pub mod config;
pub mod error;
pub mod history;
pub mod kit;
pub mod managers;
pub mod registry;
pub mod storage;
pub mod sync_state;
pub mod syncer;

#[cfg(test)]
mod test_support;

pub use blockchain_client::{BlockchainClient, TokenTransfer};
pub use chain::{ChainKind, DerivableChain, SafeCoin, Solana};
pub use config::KitConfig;
pub use error::{KitError, KitResult, SyncError};
pub use history::{FetchedHistory, HistoryFetcher};
pub use kit::DerivableCoinKit;
pub use managers::{AccountInfoManager, TransactionManager};
pub use registry::KitRegistry;
pub use storage::{CoinStorage, CoinTransaction, MemoryStorage, TransactionFilter, TransactionQuery};
pub use sync_state::SyncState;
pub use syncer::Syncer;
