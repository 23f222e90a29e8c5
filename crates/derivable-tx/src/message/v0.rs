use derivable_keys::PublicKey;

use super::account_keys::MessageAccountKeys;
use super::compiled_keys::CompiledKeys;
use super::legacy::{read_instructions, read_keys};
use super::lookup::{AddressLookupTableAccount, LoadedAddresses, MessageAddressTableLookup};
use super::{MessageHeader, MESSAGE_VERSION_PREFIX, VERSION_PREFIX_MASK};
use crate::error::TxError;
use crate::hash::Blockhash;
use crate::instruction::{CompiledInstruction, TransactionInstruction};
use crate::short_vec::{encode_length, Reader};

/// A version 0 message: the legacy layout behind a `0x80` prefix byte,
/// followed by the address table lookups.
///
/// ```text
/// prefix                 u8 (0x80 | version)
/// header .. instructions as in a legacy message
/// num_lookups            compact-u16
/// lookups[]              (see MessageAddressTableLookup)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageV0 {
    pub header: MessageHeader,
    pub static_account_keys: Vec<PublicKey>,
    pub recent_blockhash: Blockhash,
    pub compiled_instructions: Vec<CompiledInstruction>,
    pub address_table_lookups: Vec<MessageAddressTableLookup>,
}

impl MessageV0 {
    pub fn compile(
        payer: &PublicKey,
        instructions: &[TransactionInstruction],
        recent_blockhash: Blockhash,
        lookup_tables: &[AddressLookupTableAccount],
    ) -> Result<Self, TxError> {
        let mut compiled_keys = CompiledKeys::compile(instructions, *payer);

        let mut address_table_lookups = Vec::new();
        let mut loaded = LoadedAddresses::default();
        for table in lookup_tables {
            if let Some((lookup, drained)) = compiled_keys.extract_table_lookup(table)? {
                address_table_lookups.push(lookup);
                loaded.extend(drained);
            }
        }

        let (header, static_account_keys) = compiled_keys.get_message_components()?;
        let account_keys = MessageAccountKeys::new(static_account_keys, Some(loaded));
        let compiled_instructions = account_keys.compile_instructions(instructions)?;

        Ok(Self {
            header,
            static_account_keys: account_keys.static_account_keys().to_vec(),
            recent_blockhash,
            compiled_instructions,
            address_table_lookups,
        })
    }

    pub fn version(&self) -> u8 {
        0
    }

    pub fn number_of_account_keys_in_lookups(&self) -> usize {
        self.address_table_lookups
            .iter()
            .map(|l| l.writable_indexes.len() + l.readonly_indexes.len())
            .sum()
    }

    /// Resolve the lookups against fetched tables.
    pub fn resolve_address_table_lookups(
        &self,
        tables: &[AddressLookupTableAccount],
    ) -> Result<LoadedAddresses, TxError> {
        let mut loaded = LoadedAddresses::default();
        for lookup in &self.address_table_lookups {
            let table = tables
                .iter()
                .find(|t| t.key == lookup.account_key)
                .ok_or_else(|| TxError::UnknownAccountKey(lookup.account_key.to_string()))?;
            let pick = |index: &u8| {
                table.addresses.get(*index as usize).copied().ok_or_else(|| {
                    TxError::Deserialization(format!(
                        "lookup index {index} out of range for table {}",
                        table.key
                    ))
                })
            };
            for index in &lookup.writable_indexes {
                loaded.writable.push(pick(index)?);
            }
            for index in &lookup.readonly_indexes {
                loaded.readonly.push(pick(index)?);
            }
        }
        Ok(loaded)
    }

    pub fn account_keys(&self, loaded: Option<LoadedAddresses>) -> MessageAccountKeys {
        MessageAccountKeys::new(self.static_account_keys.clone(), loaded)
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256);
        buf.push(MESSAGE_VERSION_PREFIX | self.version());
        self.header.serialize_into(&mut buf);

        buf.extend_from_slice(&encode_length(self.static_account_keys.len()));
        for key in &self.static_account_keys {
            buf.extend_from_slice(key.as_bytes());
        }

        buf.extend_from_slice(self.recent_blockhash.as_bytes());

        buf.extend_from_slice(&encode_length(self.compiled_instructions.len()));
        for ix in &self.compiled_instructions {
            ix.serialize_into(&mut buf);
        }

        buf.extend_from_slice(&encode_length(self.address_table_lookups.len()));
        for lookup in &self.address_table_lookups {
            lookup.serialize_into(&mut buf);
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
        let prefix = reader.read_u8()?;
        if prefix & MESSAGE_VERSION_PREFIX == 0 {
            return Err(TxError::Deserialization(
                "expected a versioned message prefix".into(),
            ));
        }
        let version = prefix & VERSION_PREFIX_MASK;
        if version != 0 {
            return Err(TxError::InvalidMessageVersion(version));
        }

        let header = MessageHeader::read_from(reader)?;
        let static_account_keys = read_keys(reader)?;
        let recent_blockhash = Blockhash::new(reader.read_array::<32>()?);
        let compiled_instructions = read_instructions(reader)?;

        let lookup_count = reader.read_length()?;
        let address_table_lookups = (0..lookup_count)
            .map(|_| MessageAddressTableLookup::read_from(reader))
            .collect::<Result<_, _>>()?;

        Ok(Self {
            header,
            static_account_keys,
            recent_blockhash,
            compiled_instructions,
            address_table_lookups,
        })
    }
}
