use thiserror::Error;

/// Key derivation and address errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid derivation path: {0}")]
    InvalidDerivationPath(String),

    #[error("seed derivation failed: {0}")]
    SeedDerivationFailed(String),

    #[error("seed too long: {0} bytes, max 32")]
    SeedTooLong(usize),

    #[error("invalid seed: derived address is on the ed25519 curve")]
    InvalidSeed,

    #[error("program address not found")]
    ProgramAddressNotFound,

    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("invalid secret key: {0}")]
    InvalidSecretKey(String),
}
