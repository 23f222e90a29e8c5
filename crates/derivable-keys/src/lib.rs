//! Key material for Solana-family chains.
//!
//! Everything a derivable coin kit needs before it can talk to a node:
//! SLIP-0010 Ed25519 derivation from a BIP-39 seed, the derivation path
//! variants wallets have used over time, Base58 public keys, and the
//! program-derived-address math used for associated token accounts.
//!
//! Only `ed25519-dalek`, `curve25519-dalek`, `sha2` and `hmac` are used for
//! the cryptography; no chain SDK is pulled in.

pub mod error;
pub mod hd;
pub mod keypair;
pub mod path;
pub mod pda;
pub mod public_key;

pub use error::KeyError;
pub use hd::{derive_path, master_key_from_seed, public_key_from_seed, Keys};
pub use keypair::DerivableKeyPair;
pub use path::{DerivablePath, DerivationType};
pub use pda::{associated_token_address, create_program_address, find_program_address};
pub use public_key::PublicKey;
