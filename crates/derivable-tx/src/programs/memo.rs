use derivable_keys::PublicKey;

use crate::instruction::{AccountMeta, TransactionInstruction};

/// Attach a UTF-8 memo. Listed signers must sign the transaction.
pub fn memo(memo_program: &PublicKey, text: &str, signers: &[PublicKey]) -> TransactionInstruction {
    TransactionInstruction::new(
        *memo_program,
        signers
            .iter()
            .map(|s| AccountMeta::readonly(*s, true))
            .collect(),
        text.as_bytes().to_vec(),
    )
}
