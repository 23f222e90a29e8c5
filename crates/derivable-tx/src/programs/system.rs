//! System program: native transfers and account creation.

use derivable_keys::PublicKey;

use super::SYSTEM_PROGRAM_ID;
use crate::instruction::{AccountMeta, TransactionInstruction};

/// System program instruction discriminants (little-endian u32).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum SystemInstruction {
    CreateAccount = 0,
    Transfer = 2,
}

impl SystemInstruction {
    pub fn index(self) -> u32 {
        self as u32
    }
}

/// Move `lamports` from `from` to `to`.
///
/// Data: `[2u32 LE][lamports u64 LE]`, 12 bytes.
pub fn transfer(from: &PublicKey, to: &PublicKey, lamports: u64) -> TransactionInstruction {
    let mut data = Vec::with_capacity(12);
    data.extend_from_slice(&SystemInstruction::Transfer.index().to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());

    TransactionInstruction::new(
        SYSTEM_PROGRAM_ID,
        vec![
            AccountMeta::writable(*from, true),
            AccountMeta::writable(*to, false),
        ],
        data,
    )
}

/// Create `new_account` funded with `lamports`, `space` bytes, owned by `owner`.
///
/// Data: `[0u32 LE][lamports u64][space u64][owner 32]`, 52 bytes.
pub fn create_account(
    from: &PublicKey,
    new_account: &PublicKey,
    lamports: u64,
    space: u64,
    owner: &PublicKey,
) -> TransactionInstruction {
    let mut data = Vec::with_capacity(52);
    data.extend_from_slice(&SystemInstruction::CreateAccount.index().to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());
    data.extend_from_slice(&space.to_le_bytes());
    data.extend_from_slice(owner.as_bytes());

    TransactionInstruction::new(
        SYSTEM_PROGRAM_ID,
        vec![
            AccountMeta::writable(*from, true),
            AccountMeta::writable(*new_account, true),
        ],
        data,
    )
}
