use derivable_keys::KeyError;
use thiserror::Error;

/// Message and transaction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxError {
    #[error("account index overflow: {0} keys")]
    AccountIndexOverflow(usize),

    #[error("unknown account key: {0}")]
    UnknownAccountKey(String),

    #[error("invalid message version: {0}")]
    InvalidMessageVersion(u8),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("non-required signer: {0}")]
    NonRequiredSigner(String),

    #[error("signature not found")]
    SignatureNotFound,

    #[error("no signer provided")]
    NoSignerProvided,

    #[error(transparent)]
    Key(#[from] KeyError),
}
