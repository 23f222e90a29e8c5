//! SPL token program instructions.
//!
//! Authorities are read-only signers. When `multi_signers` is non-empty the
//! authority is a multisig account: it is passed as a non-signer and each
//! member signs instead.

use derivable_keys::PublicKey;

use crate::instruction::{AccountMeta, TransactionInstruction};

/// Token program instruction discriminants (first data byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TokenInstruction {
    InitializeMint = 0,
    InitializeAccount = 1,
    Transfer = 3,
    Approve = 4,
    MintTo = 7,
    CloseAccount = 9,
    TransferChecked = 12,
    BurnChecked = 15,
}

impl TokenInstruction {
    pub fn index(self) -> u8 {
        self as u8
    }
}

fn amount_data(kind: TokenInstruction, amount: u64, decimals: Option<u8>) -> Vec<u8> {
    let mut data = Vec::with_capacity(10);
    data.push(kind.index());
    data.extend_from_slice(&amount.to_le_bytes());
    if let Some(decimals) = decimals {
        data.push(decimals);
    }
    data
}

fn push_authority(
    accounts: &mut Vec<AccountMeta>,
    authority: &PublicKey,
    multi_signers: &[PublicKey],
) {
    accounts.push(AccountMeta::readonly(*authority, multi_signers.is_empty()));
    accounts.extend(multi_signers.iter().map(|s| AccountMeta::readonly(*s, true)));
}

/// Data: `[0][decimals][mint_authority 32][has_freeze u8][freeze_authority 32]`.
pub fn initialize_mint(
    token_program: &PublicKey,
    mint: &PublicKey,
    decimals: u8,
    mint_authority: &PublicKey,
    freeze_authority: Option<&PublicKey>,
    sysvar_rent: &PublicKey,
) -> TransactionInstruction {
    let mut data = Vec::with_capacity(67);
    data.push(TokenInstruction::InitializeMint.index());
    data.push(decimals);
    data.extend_from_slice(mint_authority.as_bytes());
    match freeze_authority {
        Some(freeze) => {
            data.push(1);
            data.extend_from_slice(freeze.as_bytes());
        }
        None => {
            data.push(0);
            data.extend_from_slice(&[0u8; 32]);
        }
    }

    TransactionInstruction::new(
        *token_program,
        vec![
            AccountMeta::writable(*mint, false),
            AccountMeta::readonly(*sysvar_rent, false),
        ],
        data,
    )
}

pub fn initialize_account(
    token_program: &PublicKey,
    account: &PublicKey,
    mint: &PublicKey,
    owner: &PublicKey,
    sysvar_rent: &PublicKey,
) -> TransactionInstruction {
    TransactionInstruction::new(
        *token_program,
        vec![
            AccountMeta::writable(*account, false),
            AccountMeta::readonly(*mint, false),
            AccountMeta::readonly(*owner, false),
            AccountMeta::readonly(*sysvar_rent, false),
        ],
        vec![TokenInstruction::InitializeAccount.index()],
    )
}

/// Unchecked transfer. Data: `[3][amount u64 LE]`, 9 bytes.
pub fn transfer(
    token_program: &PublicKey,
    source: &PublicKey,
    destination: &PublicKey,
    owner: &PublicKey,
    amount: u64,
) -> TransactionInstruction {
    TransactionInstruction::new(
        *token_program,
        vec![
            AccountMeta::writable(*source, false),
            AccountMeta::writable(*destination, false),
            AccountMeta::readonly(*owner, true),
        ],
        amount_data(TokenInstruction::Transfer, amount, None),
    )
}

/// Transfer that also asserts the mint and its decimals.
/// Data: `[12][amount u64 LE][decimals]`, 10 bytes.
#[allow(clippy::too_many_arguments)]
pub fn transfer_checked(
    token_program: &PublicKey,
    source: &PublicKey,
    mint: &PublicKey,
    destination: &PublicKey,
    owner: &PublicKey,
    multi_signers: &[PublicKey],
    amount: u64,
    decimals: u8,
) -> TransactionInstruction {
    let mut accounts = vec![
        AccountMeta::writable(*source, false),
        AccountMeta::readonly(*mint, false),
        AccountMeta::writable(*destination, false),
    ];
    push_authority(&mut accounts, owner, multi_signers);

    TransactionInstruction::new(
        *token_program,
        accounts,
        amount_data(TokenInstruction::TransferChecked, amount, Some(decimals)),
    )
}

pub fn approve(
    token_program: &PublicKey,
    account: &PublicKey,
    delegate: &PublicKey,
    owner: &PublicKey,
    multi_signers: &[PublicKey],
    amount: u64,
) -> TransactionInstruction {
    let mut accounts = vec![
        AccountMeta::writable(*account, false),
        AccountMeta::readonly(*delegate, false),
    ];
    push_authority(&mut accounts, owner, multi_signers);

    TransactionInstruction::new(
        *token_program,
        accounts,
        amount_data(TokenInstruction::Approve, amount, None),
    )
}

pub fn mint_to(
    token_program: &PublicKey,
    mint: &PublicKey,
    destination: &PublicKey,
    authority: &PublicKey,
    amount: u64,
) -> TransactionInstruction {
    TransactionInstruction::new(
        *token_program,
        vec![
            AccountMeta::writable(*mint, false),
            AccountMeta::writable(*destination, false),
            AccountMeta::readonly(*authority, true),
        ],
        amount_data(TokenInstruction::MintTo, amount, None),
    )
}

/// Burn that also asserts the mint decimals.
pub fn burn_checked(
    token_program: &PublicKey,
    mint: &PublicKey,
    account: &PublicKey,
    owner: &PublicKey,
    amount: u64,
    decimals: u8,
) -> TransactionInstruction {
    TransactionInstruction::new(
        *token_program,
        vec![
            AccountMeta::writable(*account, false),
            AccountMeta::writable(*mint, false),
            AccountMeta::readonly(*owner, true),
        ],
        amount_data(TokenInstruction::BurnChecked, amount, Some(decimals)),
    )
}

/// Close `account`, sending its lamports to `destination`. Data: `[9]`.
pub fn close_account(
    token_program: &PublicKey,
    account: &PublicKey,
    destination: &PublicKey,
    owner: &PublicKey,
    multi_signers: &[PublicKey],
) -> TransactionInstruction {
    let mut accounts = vec![
        AccountMeta::writable(*account, false),
        AccountMeta::writable(*destination, false),
    ];
    push_authority(&mut accounts, owner, multi_signers);

    TransactionInstruction::new(
        *token_program,
        accounts,
        vec![TokenInstruction::CloseAccount.index()],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::programs::{SOLANA_TOKEN_PROGRAM_ID, SYSVAR_RENT_ID};

    const SOURCE: PublicKey = PublicKey::new([1; 32]);
    const DESTINATION: PublicKey = PublicKey::new([2; 32]);
    const OWNER: PublicKey = PublicKey::new([3; 32]);
    const MINT: PublicKey = PublicKey::new([4; 32]);

    // -- transfer -----------------------------------------------------------

    #[test]
    fn transfer_data_encoding() {
        let ix = transfer(&SOLANA_TOKEN_PROGRAM_ID, &SOURCE, &DESTINATION, &OWNER, 500_000);
        assert_eq!(ix.data.len(), 9);
        assert_eq!(ix.data[0], 3);
        assert_eq!(&ix.data[1..], &500_000u64.to_le_bytes());
        assert_eq!(ix.program_id, SOLANA_TOKEN_PROGRAM_ID);
    }

    #[test]
    fn transfer_account_roles() {
        let ix = transfer(&SOLANA_TOKEN_PROGRAM_ID, &SOURCE, &DESTINATION, &OWNER, 100);
        assert_eq!(
            ix.accounts,
            vec![
                AccountMeta::writable(SOURCE, false),
                AccountMeta::writable(DESTINATION, false),
                AccountMeta::readonly(OWNER, true),
            ]
        );
    }

    #[test]
    fn transfer_checked_layout() {
        let ix = transfer_checked(
            &SOLANA_TOKEN_PROGRAM_ID,
            &SOURCE,
            &MINT,
            &DESTINATION,
            &OWNER,
            &[],
            42,
            6,
        );
        assert_eq!(ix.data.len(), 10);
        assert_eq!(ix.data[0], 12);
        assert_eq!(&ix.data[1..9], &42u64.to_le_bytes());
        assert_eq!(ix.data[9], 6);
        assert_eq!(ix.accounts[1], AccountMeta::readonly(MINT, false));
        assert_eq!(ix.accounts[3], AccountMeta::readonly(OWNER, true));
    }

    #[test]
    fn transfer_checked_with_multisig() {
        let signers = [PublicKey::new([8; 32]), PublicKey::new([9; 32])];
        let ix = transfer_checked(
            &SOLANA_TOKEN_PROGRAM_ID,
            &SOURCE,
            &MINT,
            &DESTINATION,
            &OWNER,
            &signers,
            1,
            0,
        );
        assert_eq!(ix.accounts.len(), 6);
        assert_eq!(ix.accounts[3], AccountMeta::readonly(OWNER, false));
        assert!(ix.accounts[4..].iter().all(|m| m.is_signer && !m.is_writable));
    }

    // -- account lifecycle --------------------------------------------------

    #[test]
    fn initialize_mint_with_and_without_freeze() {
        let freeze = PublicKey::new([5; 32]);
        let with = initialize_mint(
            &SOLANA_TOKEN_PROGRAM_ID,
            &MINT,
            9,
            &OWNER,
            Some(&freeze),
            &SYSVAR_RENT_ID,
        );
        assert_eq!(with.data.len(), 67);
        assert_eq!(&with.data[..2], &[0, 9]);
        assert_eq!(&with.data[2..34], OWNER.as_bytes());
        assert_eq!(with.data[34], 1);
        assert_eq!(&with.data[35..], freeze.as_bytes());

        let without =
            initialize_mint(&SOLANA_TOKEN_PROGRAM_ID, &MINT, 9, &OWNER, None, &SYSVAR_RENT_ID);
        assert_eq!(without.data[34], 0);
        assert_eq!(&without.data[35..], &[0u8; 32]);
    }

    #[test]
    fn initialize_account_layout() {
        let ix =
            initialize_account(&SOLANA_TOKEN_PROGRAM_ID, &SOURCE, &MINT, &OWNER, &SYSVAR_RENT_ID);
        assert_eq!(ix.data, vec![1]);
        assert_eq!(ix.accounts.len(), 4);
        assert!(ix.accounts[0].is_writable);
        assert_eq!(ix.accounts[3].pubkey, SYSVAR_RENT_ID);
    }

    #[test]
    fn close_account_layout() {
        let ix = close_account(&SOLANA_TOKEN_PROGRAM_ID, &SOURCE, &DESTINATION, &OWNER, &[]);
        assert_eq!(ix.data, vec![9]);
        assert_eq!(ix.accounts[0].pubkey, SOURCE);
        assert_eq!(ix.accounts[2], AccountMeta::readonly(OWNER, true));
    }

    #[test]
    fn approve_mint_to_and_burn_checked() {
        let delegate = PublicKey::new([6; 32]);
        let ix = approve(&SOLANA_TOKEN_PROGRAM_ID, &SOURCE, &delegate, &OWNER, &[], 10);
        assert_eq!(ix.data[0], 4);
        assert_eq!(ix.accounts.len(), 3);

        let ix = mint_to(&SOLANA_TOKEN_PROGRAM_ID, &MINT, &DESTINATION, &OWNER, 10);
        assert_eq!(ix.data[0], 7);
        assert!(ix.accounts[0].is_writable);

        let ix = burn_checked(&SOLANA_TOKEN_PROGRAM_ID, &MINT, &SOURCE, &OWNER, 10, 2);
        assert_eq!(ix.data[0], 15);
        assert_eq!(ix.data[9], 2);
        assert_eq!(ix.accounts[0].pubkey, SOURCE);
        assert_eq!(ix.accounts[1].pubkey, MINT);
    }
}
