use derivable_keys::PublicKey;

use crate::error::TxError;
use crate::short_vec::{encode_length, Reader};

/// An account reference with its capabilities inside one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountMeta {
    pub pubkey: PublicKey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    pub fn writable(pubkey: PublicKey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    pub fn readonly(pubkey: PublicKey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }
}

/// A program invocation before compilation into a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionInstruction {
    pub program_id: PublicKey,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

impl TransactionInstruction {
    pub fn new(program_id: PublicKey, accounts: Vec<AccountMeta>, data: Vec<u8>) -> Self {
        Self {
            program_id,
            accounts,
            data,
        }
    }
}

/// An instruction whose keys are replaced by indices into the message's
/// account key list.
///
/// ```text
/// program_id_index   u8
/// num_accounts       compact-u16
/// account_indices    u8 * num_accounts
/// data_len           compact-u16
/// data               u8 * data_len
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub account_key_indexes: Vec<u8>,
    pub data: Vec<u8>,
}

impl CompiledInstruction {
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        buf.push(self.program_id_index);
        buf.extend_from_slice(&encode_length(self.account_key_indexes.len()));
        buf.extend_from_slice(&self.account_key_indexes);
        buf.extend_from_slice(&encode_length(self.data.len()));
        buf.extend_from_slice(&self.data);
    }

    pub fn serialized_data(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(3 + self.account_key_indexes.len() + self.data.len());
        self.serialize_into(&mut buf);
        buf
    }

    /// Parse one instruction from the front of `data`, returning it with the
    /// number of bytes consumed.
    pub fn deserialize(data: &[u8]) -> Result<(Self, usize), TxError> {
        let mut reader = Reader::new(data);
        let ix = Self::read_from(&mut reader)?;
        Ok((ix, reader.position()))
    }

    pub(crate) fn read_from(reader: &mut Reader<'_>) -> Result<Self, TxError> {
        let program_id_index = reader.read_u8()?;
        let account_key_indexes = reader.read_vec()?;
        let data = reader.read_vec()?;
        Ok(Self {
            program_id_index,
            account_key_indexes,
            data,
        })
    }
}
