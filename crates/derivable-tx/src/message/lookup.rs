use derivable_keys::PublicKey;

use crate::error::TxError;
use crate::short_vec::{encode_length, Reader};

/// An on-chain address lookup table as fetched from the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressLookupTableAccount {
    pub key: PublicKey,
    pub addresses: Vec<PublicKey>,
}

/// Indices into one lookup table, as carried by a v0 message.
///
/// ```text
/// account_key          32 bytes
/// num_writable         compact-u16
/// writable_indexes     u8 * num_writable
/// num_readonly         compact-u16
/// readonly_indexes     u8 * num_readonly
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageAddressTableLookup {
    pub account_key: PublicKey,
    pub writable_indexes: Vec<u8>,
    pub readonly_indexes: Vec<u8>,
}

impl MessageAddressTableLookup {
    pub(crate) fn serialize_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.account_key.as_bytes());
        buf.extend_from_slice(&encode_length(self.writable_indexes.len()));
        buf.extend_from_slice(&self.writable_indexes);
        buf.extend_from_slice(&encode_length(self.readonly_indexes.len()));
        buf.extend_from_slice(&self.readonly_indexes);
    }

    pub(crate) fn read_from(reader: &mut Reader<'_>) -> Result<Self, TxError> {
        let account_key = PublicKey::new(reader.read_array::<32>()?);
        let writable_indexes = reader.read_vec()?;
        let readonly_indexes = reader.read_vec()?;
        Ok(Self {
            account_key,
            writable_indexes,
            readonly_indexes,
        })
    }
}

/// Keys a v0 message loads from lookup tables, writable segment first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedAddresses {
    pub writable: Vec<PublicKey>,
    pub readonly: Vec<PublicKey>,
}

impl LoadedAddresses {
    pub fn len(&self) -> usize {
        self.writable.len() + self.readonly.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writable.is_empty() && self.readonly.is_empty()
    }

    pub fn extend(&mut self, other: LoadedAddresses) {
        self.writable.extend(other.writable);
        self.readonly.extend(other.readonly);
    }
}
