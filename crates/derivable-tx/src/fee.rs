//! Expected network fee and rent for a set of instructions.

use derivable_keys::PublicKey;
use serde::{Deserialize, Serialize};

use crate::error::TxError;
use crate::message::{CompiledKeys, TransactionMessage};
use crate::programs::token::TokenInstruction;
use crate::programs::{system::SystemInstruction, ProgramIds};

/// What a transaction will cost its fee payer.
///
/// `account_balances` is rent locked into accounts that outlive the
/// transaction. `deposit` is rent for accounts the same transaction closes
/// again, which the payer gets back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeAmount {
    pub transaction: u64,
    pub account_balances: u64,
    pub deposit: u64,
}

impl FeeAmount {
    pub fn total(&self) -> u64 {
        self.transaction
            .saturating_add(self.account_balances)
            .saturating_add(self.deposit)
    }
}

pub trait FeeCalculator: Send + Sync {
    fn calculate_fee(&self, message: &TransactionMessage) -> Result<FeeAmount, TxError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultFeeCalculator {
    pub lamports_per_signature: u64,
    pub minimum_rent_exemption: u64,
    pub programs: ProgramIds,
}

impl DefaultFeeCalculator {
    pub fn new(
        lamports_per_signature: u64,
        minimum_rent_exemption: u64,
        programs: ProgramIds,
    ) -> Self {
        Self {
            lamports_per_signature,
            minimum_rent_exemption,
            programs,
        }
    }

    /// The account an instruction creates, if it is a system `CreateAccount`
    /// or an associated token account creation.
    fn created_account(
        &self,
        program_id: &PublicKey,
        keys: &[PublicKey],
        data: &[u8],
    ) -> Option<PublicKey> {
        if *program_id == self.programs.system {
            let discriminant = data.get(..4)?;
            let index = u32::from_le_bytes(discriminant.try_into().ok()?);
            if index == SystemInstruction::CreateAccount.index() {
                return keys.last().copied();
            }
        } else if *program_id == self.programs.associated_token {
            return keys.get(1).copied();
        }
        None
    }

    fn is_closed(&self, account: &PublicKey, message: &TransactionMessage) -> bool {
        message.instructions.iter().any(|ix| {
            ix.program_id == self.programs.token
                && ix.data.first() == Some(&TokenInstruction::CloseAccount.index())
                && ix.accounts.first().map(|m| &m.pubkey) == Some(account)
        })
    }
}

impl FeeCalculator for DefaultFeeCalculator {
    fn calculate_fee(&self, message: &TransactionMessage) -> Result<FeeAmount, TxError> {
        let (header, _) =
            CompiledKeys::compile(&message.instructions, message.payer).get_message_components()?;

        let mut fee = FeeAmount {
            transaction: u64::from(header.num_required_signatures)
                .saturating_mul(self.lamports_per_signature),
            ..FeeAmount::default()
        };

        for ix in &message.instructions {
            let keys: Vec<PublicKey> = ix.accounts.iter().map(|m| m.pubkey).collect();
            let Some(created) = self.created_account(&ix.program_id, &keys, &ix.data) else {
                continue;
            };
            if self.is_closed(&created, message) {
                fee.deposit = fee.deposit.saturating_add(self.minimum_rent_exemption);
            } else {
                fee.account_balances =
                    fee.account_balances.saturating_add(self.minimum_rent_exemption);
            }
        }

        tracing::debug!(
            transaction = fee.transaction,
            account_balances = fee.account_balances,
            deposit = fee.deposit,
            "calculated fee"
        );
        Ok(fee)
    }
}
