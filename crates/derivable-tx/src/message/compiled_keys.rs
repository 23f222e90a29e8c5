//! Deduplicated account keys with accumulated capabilities.

use derivable_keys::PublicKey;

use super::lookup::{AddressLookupTableAccount, LoadedAddresses, MessageAddressTableLookup};
use super::MessageHeader;
use crate::error::TxError;
use crate::instruction::TransactionInstruction;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompiledKeyMeta {
    pub is_signer: bool,
    pub is_writable: bool,
    pub is_invoked: bool,
}

/// Every key a set of instructions touches, in first-seen order.
///
/// Flags are OR-accumulated: a key seen once as writable and once as
/// readonly stays writable. The payer is always a writable signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledKeys {
    payer: PublicKey,
    key_meta_map: Vec<(PublicKey, CompiledKeyMeta)>,
}

impl CompiledKeys {
    pub fn compile(instructions: &[TransactionInstruction], payer: PublicKey) -> Self {
        let mut keys = Self {
            payer,
            key_meta_map: Vec::new(),
        };

        let payer_meta = keys.upsert(payer);
        payer_meta.is_signer = true;
        payer_meta.is_writable = true;

        for ix in instructions {
            keys.upsert(ix.program_id).is_invoked = true;
            for account in &ix.accounts {
                let meta = keys.upsert(account.pubkey);
                meta.is_signer |= account.is_signer;
                meta.is_writable |= account.is_writable;
            }
        }

        keys
    }

    fn upsert(&mut self, key: PublicKey) -> &mut CompiledKeyMeta {
        let pos = match self.key_meta_map.iter().position(|(k, _)| *k == key) {
            Some(pos) => pos,
            None => {
                self.key_meta_map.push((key, CompiledKeyMeta::default()));
                self.key_meta_map.len() - 1
            }
        };
        &mut self.key_meta_map[pos].1
    }

    pub fn payer(&self) -> &PublicKey {
        &self.payer
    }

    pub fn meta(&self, key: &PublicKey) -> Option<&CompiledKeyMeta> {
        self.key_meta_map
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, meta)| meta)
    }

    pub fn len(&self) -> usize {
        self.key_meta_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key_meta_map.is_empty()
    }

    /// Header counts and the ordered static key list:
    /// writable signers, readonly signers, writable non-signers, readonly non-signers.
    pub fn get_message_components(&self) -> Result<(MessageHeader, Vec<PublicKey>), TxError> {
        let group = |signer: bool, writable: bool| -> Vec<PublicKey> {
            self.key_meta_map
                .iter()
                .filter(|(_, m)| m.is_signer == signer && m.is_writable == writable)
                .map(|(k, _)| *k)
                .collect()
        };

        let writable_signers = group(true, true);
        let readonly_signers = group(true, false);
        let writable_non_signers = group(false, true);
        let readonly_non_signers = group(false, false);

        let count = |n: usize| u8::try_from(n).map_err(|_| TxError::AccountIndexOverflow(n));
        let header = MessageHeader {
            num_required_signatures: count(writable_signers.len() + readonly_signers.len())?,
            num_readonly_signed_accounts: count(readonly_signers.len())?,
            num_readonly_unsigned_accounts: count(readonly_non_signers.len())?,
        };

        let mut static_keys = writable_signers;
        static_keys.extend(readonly_signers);
        static_keys.extend(writable_non_signers);
        static_keys.extend(readonly_non_signers);

        Ok((header, static_keys))
    }

    /// Move non-signer, non-invoked keys found in `table` out of the static
    /// set and into lookup indices. Returns `None` when nothing matched.
    pub fn extract_table_lookup(
        &mut self,
        table: &AddressLookupTableAccount,
    ) -> Result<Option<(MessageAddressTableLookup, LoadedAddresses)>, TxError> {
        let (writable_indexes, writable) = self.drain_keys_found_in_lookup_table(
            &table.addresses,
            |m| !m.is_signer && !m.is_invoked && m.is_writable,
        )?;
        let (readonly_indexes, readonly) = self.drain_keys_found_in_lookup_table(
            &table.addresses,
            |m| !m.is_signer && !m.is_invoked && !m.is_writable,
        )?;

        if writable_indexes.is_empty() && readonly_indexes.is_empty() {
            return Ok(None);
        }

        Ok(Some((
            MessageAddressTableLookup {
                account_key: table.key,
                writable_indexes,
                readonly_indexes,
            },
            LoadedAddresses { writable, readonly },
        )))
    }

    fn drain_keys_found_in_lookup_table(
        &mut self,
        table_addresses: &[PublicKey],
        filter: impl Fn(&CompiledKeyMeta) -> bool,
    ) -> Result<(Vec<u8>, Vec<PublicKey>), TxError> {
        let mut indexes = Vec::new();
        let mut drained = Vec::new();
        let mut kept = Vec::with_capacity(self.key_meta_map.len());

        for (key, meta) in self.key_meta_map.drain(..) {
            let found = if filter(&meta) {
                table_addresses.iter().position(|a| *a == key)
            } else {
                None
            };
            match found {
                Some(index) => {
                    let index = u8::try_from(index)
                        .map_err(|_| TxError::AccountIndexOverflow(index + 1))?;
                    indexes.push(index);
                    drained.push(key);
                }
                None => kept.push((key, meta)),
            }
        }

        self.key_meta_map = kept;
        Ok((indexes, drained))
    }
}
