//! Well-known programs and their instruction builders.
//!
//! Solana and SafeCoin run the same programs under different ids for the
//! token, associated token and memo programs. Builders that touch those take
//! the program id (or a [`ProgramIds`]) as an argument.

pub mod associated_token;
pub mod memo;
pub mod system;
pub mod token;

use derivable_keys::PublicKey;

/// `11111111111111111111111111111111`
pub const SYSTEM_PROGRAM_ID: PublicKey = PublicKey::new([0u8; 32]);

/// `SysvarRent111111111111111111111111111111111`
pub const SYSVAR_RENT_ID: PublicKey = PublicKey::new([
    0x06, 0xa7, 0xd5, 0x17, 0x19, 0x2c, 0x5c, 0x51, 0x21, 0x8c, 0xc9, 0x4c, 0x3d, 0x4a,
    0xf1, 0x7f, 0x58, 0xda, 0xee, 0x08, 0x9b, 0xa1, 0xfd, 0x44, 0xe3, 0xdb, 0xd9, 0x8a,
    0x00, 0x00, 0x00, 0x00,
]);

/// `TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA`
pub const SOLANA_TOKEN_PROGRAM_ID: PublicKey = PublicKey::new([
    0x06, 0xdd, 0xf6, 0xe1, 0xd7, 0x65, 0xa1, 0x93, 0xd9, 0xcb, 0xe1, 0x46, 0xce, 0xeb,
    0x79, 0xac, 0x1c, 0xb4, 0x85, 0xed, 0x5f, 0x5b, 0x37, 0x91, 0x3a, 0x8c, 0xf5, 0x85,
    0x7e, 0xff, 0x00, 0xa9,
]);

/// `ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL`
pub const SOLANA_ASSOCIATED_TOKEN_PROGRAM_ID: PublicKey = PublicKey::new([
    0x8c, 0x97, 0x25, 0x8f, 0x4e, 0x24, 0x89, 0xf1, 0xbb, 0x3d, 0x10, 0x29, 0x14, 0x8e,
    0x0d, 0x83, 0x0b, 0x5a, 0x13, 0x99, 0xda, 0xff, 0x10, 0x84, 0x04, 0x8e, 0x7b, 0xd8,
    0xdb, 0xe9, 0xf8, 0x59,
]);

/// `MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr`
pub const SOLANA_MEMO_PROGRAM_ID: PublicKey = PublicKey::new([
    0x05, 0x4a, 0x53, 0x5a, 0x99, 0x29, 0x21, 0x06, 0x4d, 0x24, 0xe8, 0x71, 0x60, 0xda,
    0x38, 0x7c, 0x7c, 0x35, 0xb5, 0xdd, 0xbc, 0x92, 0xbb, 0x81, 0xe4, 0x1f, 0xa8, 0x40,
    0x41, 0x05, 0x44, 0x8d,
]);

/// `ToKLx75MGim1d1jRusuVX8xvdvvbSDESVaNXpRA9PHN`
pub const SAFECOIN_TOKEN_PROGRAM_ID: PublicKey = PublicKey::new([
    0x06, 0xdd, 0x78, 0x94, 0x76, 0xcc, 0xa1, 0xba, 0x8f, 0x84, 0xb7, 0x82, 0xc9, 0x4b,
    0x71, 0x36, 0x52, 0xe6, 0x88, 0xee, 0xbd, 0x95, 0xc4, 0xfa, 0xda, 0x98, 0x5f, 0x96,
    0x5e, 0x08, 0x6a, 0x5d,
]);

/// `AToD9iqHSc2fhEP9Jp7UYA6mRjHQ4CTWyzCsw8X3tH7K`
pub const SAFECOIN_ASSOCIATED_TOKEN_PROGRAM_ID: PublicKey = PublicKey::new([
    0x8c, 0x96, 0x88, 0x59, 0x10, 0x1f, 0x9b, 0x4d, 0xb8, 0x37, 0x44, 0x17, 0x7c, 0xb6,
    0x3e, 0x38, 0x6d, 0xb0, 0x50, 0xc0, 0x8a, 0xc1, 0x54, 0x16, 0x9a, 0x96, 0x71, 0x24,
    0x5f, 0xd0, 0x93, 0x46,
]);

/// `MEMDqRW2fYAU19mcFnoDVoqG4Br4t7TdyWjjv38P6Nc`
pub const SAFECOIN_MEMO_PROGRAM_ID: PublicKey = PublicKey::new([
    0x05, 0x2e, 0xb5, 0xa4, 0x6d, 0x29, 0x5c, 0x4d, 0xdf, 0xf0, 0x95, 0xc9, 0xfb, 0x2f,
    0x90, 0xcf, 0xed, 0x92, 0xad, 0x56, 0xee, 0x07, 0x8a, 0xa3, 0x19, 0x28, 0x82, 0xc3,
    0x46, 0xa1, 0x2c, 0xf9,
]);

/// Byte size of an SPL token account, the span used for rent-exemption queries.
pub const TOKEN_ACCOUNT_SPAN: u64 = 165;

/// Program ids of one chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramIds {
    pub system: PublicKey,
    pub token: PublicKey,
    pub associated_token: PublicKey,
    pub memo: PublicKey,
    pub sysvar_rent: PublicKey,
}

impl ProgramIds {
    pub const SOLANA: Self = Self {
        system: SYSTEM_PROGRAM_ID,
        token: SOLANA_TOKEN_PROGRAM_ID,
        associated_token: SOLANA_ASSOCIATED_TOKEN_PROGRAM_ID,
        memo: SOLANA_MEMO_PROGRAM_ID,
        sysvar_rent: SYSVAR_RENT_ID,
    };

    pub const SAFECOIN: Self = Self {
        system: SYSTEM_PROGRAM_ID,
        token: SAFECOIN_TOKEN_PROGRAM_ID,
        associated_token: SAFECOIN_ASSOCIATED_TOKEN_PROGRAM_ID,
        memo: SAFECOIN_MEMO_PROGRAM_ID,
        sysvar_rent: SYSVAR_RENT_ID,
    };
}
