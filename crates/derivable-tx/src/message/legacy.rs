use derivable_keys::PublicKey;

use super::account_keys::MessageAccountKeys;
use super::compiled_keys::CompiledKeys;
use super::{MessageHeader, MESSAGE_VERSION_PREFIX};
use crate::error::TxError;
use crate::hash::Blockhash;
use crate::instruction::{CompiledInstruction, TransactionInstruction};
use crate::short_vec::{encode_length, Reader};

/// A legacy (unversioned) message.
///
/// ```text
/// header                3 bytes
/// num_accounts          compact-u16
/// account_keys          32 bytes * num_accounts
/// recent_blockhash      32 bytes
/// num_instructions      compact-u16
/// instructions[]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: MessageHeader,
    pub account_keys: Vec<PublicKey>,
    pub recent_blockhash: Blockhash,
    pub instructions: Vec<CompiledInstruction>,
}

impl Message {
    pub fn compile(
        payer: &PublicKey,
        instructions: &[TransactionInstruction],
        recent_blockhash: Blockhash,
    ) -> Result<Self, TxError> {
        let compiled_keys = CompiledKeys::compile(instructions, *payer);
        let (header, static_keys) = compiled_keys.get_message_components()?;
        let account_keys = MessageAccountKeys::new(static_keys, None);
        let compiled = account_keys.compile_instructions(instructions)?;

        Ok(Self {
            header,
            account_keys: account_keys.static_account_keys().to_vec(),
            recent_blockhash,
            instructions: compiled,
        })
    }

    pub fn is_account_signer(&self, index: usize) -> bool {
        index < self.header.num_required_signatures as usize
    }

    pub fn is_account_writable(&self, index: usize) -> bool {
        self.header.is_static_writable(index, self.account_keys.len())
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256);
        self.header.serialize_into(&mut buf);

        buf.extend_from_slice(&encode_length(self.account_keys.len()));
        for key in &self.account_keys {
            buf.extend_from_slice(key.as_bytes());
        }

        buf.extend_from_slice(self.recent_blockhash.as_bytes());

        buf.extend_from_slice(&encode_length(self.instructions.len()));
        for ix in &self.instructions {
            ix.serialize_into(&mut buf);
        }

        buf
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, TxError> {
        let mut reader = Reader::new(data);
        let message = Self::read_from(&mut reader)?;
        reader.finish()?;
        Ok(message)
    }

    pub(crate) fn read_from(reader: &mut Reader<'_>) -> Result<Self, TxError> {
        if reader.peek_u8()? & MESSAGE_VERSION_PREFIX != 0 {
            return Err(TxError::Deserialization(
                "versioned message passed to legacy decoder".into(),
            ));
        }

        let header = MessageHeader::read_from(reader)?;
        let account_keys = read_keys(reader)?;
        let recent_blockhash = Blockhash::new(reader.read_array::<32>()?);
        let instructions = read_instructions(reader)?;

        Ok(Self {
            header,
            account_keys,
            recent_blockhash,
            instructions,
        })
    }
}

pub(crate) fn read_keys(reader: &mut Reader<'_>) -> Result<Vec<PublicKey>, TxError> {
    let count = reader.read_length()?;
    (0..count)
        .map(|_| Ok(PublicKey::new(reader.read_array::<32>()?)))
        .collect()
}

pub(crate) fn read_instructions(
    reader: &mut Reader<'_>,
) -> Result<Vec<CompiledInstruction>, TxError> {
    let count = reader.read_length()?;
    (0..count)
        .map(|_| CompiledInstruction::read_from(reader))
        .collect()
}
