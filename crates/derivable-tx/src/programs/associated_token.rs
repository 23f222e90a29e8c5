//! Associated token account program.

use derivable_keys::{associated_token_address, KeyError, PublicKey};

use super::ProgramIds;
use crate::instruction::{AccountMeta, TransactionInstruction};

/// The associated token account of `wallet` for `mint` on the chain described by `programs`.
pub fn get_associated_token_address(
    programs: &ProgramIds,
    wallet: &PublicKey,
    mint: &PublicKey,
) -> Result<PublicKey, KeyError> {
    associated_token_address(wallet, mint, &programs.token, &programs.associated_token)
}

/// Create the associated token account of `wallet` for `mint`, paid by `payer`.
///
/// The instruction carries no data.
pub fn create_associated_token_account(
    programs: &ProgramIds,
    payer: &PublicKey,
    wallet: &PublicKey,
    mint: &PublicKey,
) -> Result<TransactionInstruction, KeyError> {
    let associated_account = get_associated_token_address(programs, wallet, mint)?;

    Ok(TransactionInstruction::new(
        programs.associated_token,
        vec![
            AccountMeta::writable(*payer, true),
            AccountMeta::writable(associated_account, false),
            AccountMeta::readonly(*wallet, false),
            AccountMeta::readonly(*mint, false),
            AccountMeta::readonly(programs.system, false),
            AccountMeta::readonly(programs.token, false),
            AccountMeta::readonly(programs.sysvar_rent, false),
        ],
        Vec::new(),
    ))
}
