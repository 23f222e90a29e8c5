use derivable_keys::PublicKey;

use super::lookup::LoadedAddresses;
use crate::error::TxError;
use crate::instruction::{CompiledInstruction, TransactionInstruction};

/// The full key space of a message: static keys, then lookup-loaded
/// writable keys, then lookup-loaded readonly keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageAccountKeys {
    static_account_keys: Vec<PublicKey>,
    account_keys_from_lookups: Option<LoadedAddresses>,
}

impl MessageAccountKeys {
    pub fn new(
        static_account_keys: Vec<PublicKey>,
        account_keys_from_lookups: Option<LoadedAddresses>,
    ) -> Self {
        Self {
            static_account_keys,
            account_keys_from_lookups,
        }
    }

    pub fn static_account_keys(&self) -> &[PublicKey] {
        &self.static_account_keys
    }

    pub fn key_segments(&self) -> Vec<&[PublicKey]> {
        let mut segments = vec![self.static_account_keys.as_slice()];
        if let Some(loaded) = &self.account_keys_from_lookups {
            segments.push(&loaded.writable);
            segments.push(&loaded.readonly);
        }
        segments
    }

    pub fn get(&self, index: usize) -> Option<&PublicKey> {
        let mut index = index;
        for segment in self.key_segments() {
            if index < segment.len() {
                return segment.get(index);
            }
            index -= segment.len();
        }
        None
    }

    pub fn len(&self) -> usize {
        self.key_segments().iter().map(|s| s.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &PublicKey> {
        self.key_segments().into_iter().flatten()
    }

    pub fn index_of(&self, key: &PublicKey) -> Option<usize> {
        self.iter().position(|k| k == key)
    }

    /// Replace every key reference with its index in this key space.
    pub fn compile_instructions(
        &self,
        instructions: &[TransactionInstruction],
    ) -> Result<Vec<CompiledInstruction>, TxError> {
        let total = self.len();
        if total > u8::MAX as usize {
            return Err(TxError::AccountIndexOverflow(total));
        }

        let resolve = |key: &PublicKey| -> Result<u8, TxError> {
            self.index_of(key)
                .map(|i| i as u8)
                .ok_or_else(|| TxError::UnknownAccountKey(key.to_string()))
        };

        instructions
            .iter()
            .map(|ix| {
                Ok(CompiledInstruction {
                    program_id_index: resolve(&ix.program_id)?,
                    account_key_indexes: ix
                        .accounts
                        .iter()
                        .map(|meta| resolve(&meta.pubkey))
                        .collect::<Result<_, _>>()?,
                    data: ix.data.clone(),
                })
            })
            .collect()
    }
}
