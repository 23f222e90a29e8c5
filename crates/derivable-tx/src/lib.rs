//! Transaction construction for Solana-family chains.
//!
//! Instruction builders for the well-known programs, legacy and v0 messages
//! with address lookup table compaction, signature slots, the binary wire
//! format, and fee estimation. Everything here is pure: no I/O, no clock.

pub mod error;
pub mod fee;
pub mod hash;
pub mod instruction;
pub mod message;
pub mod prepared;
pub mod programs;
pub mod short_vec;
pub mod transaction;

pub use error::TxError;
pub use fee::{DefaultFeeCalculator, FeeAmount, FeeCalculator};
pub use hash::Blockhash;
pub use instruction::{AccountMeta, CompiledInstruction, TransactionInstruction};
pub use message::{
    AddressLookupTableAccount, CompiledKeys, LoadedAddresses, Message, MessageAccountKeys,
    MessageAddressTableLookup, MessageHeader, MessageV0, TransactionMessage, VersionedMessage,
};
pub use prepared::PreparedTransaction;
pub use programs::ProgramIds;
pub use transaction::{Signature, VersionedTransaction};
