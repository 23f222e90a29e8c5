use derivable_keys::KeyError;
use derivable_rpc::RpcError;
use derivable_tx::TxError;
use thiserror::Error;

/// Errors surfaced by the send flow, storage and kit setup.
#[derive(Debug, Error)]
pub enum KitError {
    #[error("cannot send to yourself")]
    SendToYourself,

    #[error("invalid account info: {0}")]
    InvalidAccountInfo(String),

    #[error("insufficient balance: need {required}, have {available}")]
    InsufficientBalance { required: u64, available: u64 },

    #[error("remaining balance {remaining} is below the rent-exempt minimum {minimum}")]
    RentShortfall { remaining: u64, minimum: u64 },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Tx(#[from] TxError),

    #[error(transparent)]
    Key(#[from] KeyError),
}

pub type KitResult<T> = Result<T, KitError>;

/// Why the last sync cycle did not finish.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    #[error("sync not started")]
    NotStarted,

    #[error("no network connection")]
    NoNetworkConnection,

    #[error(transparent)]
    Rpc(RpcError),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("{0}")]
    Failed(String),
}

impl From<RpcError> for SyncError {
    fn from(e: RpcError) -> Self {
        if e.is_network() {
            SyncError::NoNetworkConnection
        } else {
            SyncError::Rpc(e)
        }
    }
}

impl From<KitError> for SyncError {
    fn from(e: KitError) -> Self {
        match e {
            KitError::Rpc(rpc) => rpc.into(),
            KitError::Storage(msg) => SyncError::Storage(msg),
            other => SyncError::Failed(other.to_string()),
        }
    }
}
