//! Legacy and v0 messages, and the compilation step that turns
//! instructions into one.

mod account_keys;
mod compiled_keys;
mod legacy;
mod lookup;
mod v0;

pub use account_keys::MessageAccountKeys;
pub use compiled_keys::{CompiledKeyMeta, CompiledKeys};
pub use legacy::Message;
pub use lookup::{AddressLookupTableAccount, LoadedAddresses, MessageAddressTableLookup};
pub use v0::MessageV0;

use derivable_keys::PublicKey;

use crate::error::TxError;
use crate::hash::Blockhash;
use crate::instruction::{CompiledInstruction, TransactionInstruction};
use crate::short_vec::Reader;

/// High bit of the first message byte marks a versioned message.
pub const MESSAGE_VERSION_PREFIX: u8 = 0x80;
pub const VERSION_PREFIX_MASK: u8 = 0x7f;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageHeader {
    pub num_required_signatures: u8,
    pub num_readonly_signed_accounts: u8,
    pub num_readonly_unsigned_accounts: u8,
}

impl MessageHeader {
    pub(crate) fn serialize_into(&self, buf: &mut Vec<u8>) {
        buf.push(self.num_required_signatures);
        buf.push(self.num_readonly_signed_accounts);
        buf.push(self.num_readonly_unsigned_accounts);
    }

    pub(crate) fn read_from(reader: &mut Reader<'_>) -> Result<Self, TxError> {
        Ok(Self {
            num_required_signatures: reader.read_u8()?,
            num_readonly_signed_accounts: reader.read_u8()?,
            num_readonly_unsigned_accounts: reader.read_u8()?,
        })
    }

    /// Whether static key `index` out of `num_static` keys is writable.
    pub fn is_static_writable(&self, index: usize, num_static: usize) -> bool {
        let required = self.num_required_signatures as usize;
        if index < required {
            index < required.saturating_sub(self.num_readonly_signed_accounts as usize)
        } else {
            index < num_static.saturating_sub(self.num_readonly_unsigned_accounts as usize)
        }
    }
}

/// Instructions plus the context needed to compile them into a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionMessage {
    pub payer: PublicKey,
    pub instructions: Vec<TransactionInstruction>,
    pub recent_blockhash: Blockhash,
}

impl TransactionMessage {
    pub fn new(
        payer: PublicKey,
        instructions: Vec<TransactionInstruction>,
        recent_blockhash: Blockhash,
    ) -> Self {
        Self {
            payer,
            instructions,
            recent_blockhash,
        }
    }

    pub fn compile_to_legacy(&self) -> Result<Message, TxError> {
        Message::compile(&self.payer, &self.instructions, self.recent_blockhash)
    }

    pub fn compile_to_v0(
        &self,
        lookup_tables: &[AddressLookupTableAccount],
    ) -> Result<MessageV0, TxError> {
        MessageV0::compile(
            &self.payer,
            &self.instructions,
            self.recent_blockhash,
            lookup_tables,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionedMessage {
    Legacy(Message),
    V0(MessageV0),
}

impl VersionedMessage {
    pub fn header(&self) -> &MessageHeader {
        match self {
            Self::Legacy(m) => &m.header,
            Self::V0(m) => &m.header,
        }
    }

    pub fn static_account_keys(&self) -> &[PublicKey] {
        match self {
            Self::Legacy(m) => &m.account_keys,
            Self::V0(m) => &m.static_account_keys,
        }
    }

    pub fn recent_blockhash(&self) -> &Blockhash {
        match self {
            Self::Legacy(m) => &m.recent_blockhash,
            Self::V0(m) => &m.recent_blockhash,
        }
    }

    pub fn set_recent_blockhash(&mut self, blockhash: Blockhash) {
        match self {
            Self::Legacy(m) => m.recent_blockhash = blockhash,
            Self::V0(m) => m.recent_blockhash = blockhash,
        }
    }

    pub fn instructions(&self) -> &[CompiledInstruction] {
        match self {
            Self::Legacy(m) => &m.instructions,
            Self::V0(m) => &m.compiled_instructions,
        }
    }

    pub fn address_table_lookups(&self) -> Option<&[MessageAddressTableLookup]> {
        match self {
            Self::Legacy(_) => None,
            Self::V0(m) => Some(&m.address_table_lookups),
        }
    }

    /// `None` for legacy messages.
    pub fn version(&self) -> Option<u8> {
        match self {
            Self::Legacy(_) => None,
            Self::V0(m) => Some(m.version()),
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        match self {
            Self::Legacy(m) => m.serialize(),
            Self::V0(m) => m.serialize(),
        }
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, TxError> {
        let mut reader = Reader::new(data);
        let message = Self::read_from(&mut reader)?;
        reader.finish()?;
        Ok(message)
    }

    pub(crate) fn read_from(reader: &mut Reader<'_>) -> Result<Self, TxError> {
        let prefix = reader.peek_u8()?;
        let masked = prefix & VERSION_PREFIX_MASK;
        if masked == prefix {
            return Ok(Self::Legacy(Message::read_from(reader)?));
        }
        match masked {
            0 => Ok(Self::V0(MessageV0::read_from(reader)?)),
            version => Err(TxError::InvalidMessageVersion(version)),
        }
    }
}

impl From<Message> for VersionedMessage {
    fn from(message: Message) -> Self {
        Self::Legacy(message)
    }
}

impl From<MessageV0> for VersionedMessage {
    fn from(message: MessageV0) -> Self {
        Self::V0(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::AccountMeta;
    use crate::programs::system;

    fn key(b: u8) -> PublicKey {
        PublicKey::new([b; 32])
    }

    fn transfer() -> TransactionMessage {
        TransactionMessage::new(
            key(1),
            vec![system::transfer(&key(1), &key(2), 5)],
            Blockhash::new([4; 32]),
        )
    }

    // -- header -------------------------------------------------------------

    #[test]
    fn static_writable_segments() {
        let header = MessageHeader {
            num_required_signatures: 2,
            num_readonly_signed_accounts: 1,
            num_readonly_unsigned_accounts: 1,
        };
        let writable: Vec<bool> = (0..4).map(|i| header.is_static_writable(i, 4)).collect();
        assert_eq!(writable, vec![true, false, true, false]);
    }

    // -- versioned ----------------------------------------------------------

    #[test]
    fn legacy_dispatch_on_first_byte() {
        let message: VersionedMessage = transfer().compile_to_legacy().unwrap().into();
        let decoded = VersionedMessage::deserialize(&message.serialize()).unwrap();
        assert_eq!(decoded.version(), None);
        assert_eq!(decoded, message);
    }

    #[test]
    fn v0_dispatch_on_first_byte() {
        let message: VersionedMessage = transfer().compile_to_v0(&[]).unwrap().into();
        let decoded = VersionedMessage::deserialize(&message.serialize()).unwrap();
        assert_eq!(decoded.version(), Some(0));
        assert_eq!(decoded.address_table_lookups(), Some(&[][..]));
        assert_eq!(decoded, message);
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let mut bytes = transfer().compile_to_v0(&[]).unwrap().serialize();
        bytes[0] = 0x80 | 5;
        assert_eq!(
            VersionedMessage::deserialize(&bytes).unwrap_err(),
            TxError::InvalidMessageVersion(5)
        );
    }

    #[test]
    fn legacy_and_v0_share_static_keys_without_tables() {
        let tm = transfer();
        let legacy = VersionedMessage::from(tm.compile_to_legacy().unwrap());
        let v0 = VersionedMessage::from(tm.compile_to_v0(&[]).unwrap());
        assert_eq!(legacy.static_account_keys(), v0.static_account_keys());
        assert_eq!(legacy.header(), v0.header());
        assert_eq!(legacy.instructions(), v0.instructions());
    }

    #[test]
    fn set_recent_blockhash_replaces_hash() {
        let mut message = VersionedMessage::from(transfer().compile_to_legacy().unwrap());
        message.set_recent_blockhash(Blockhash::new([9; 32]));
        assert_eq!(message.recent_blockhash(), &Blockhash::new([9; 32]));
    }

    #[test]
    fn readonly_account_stays_static_in_legacy() {
        let ix = TransactionInstruction::new(
            key(9),
            vec![AccountMeta::readonly(key(3), false)],
            vec![],
        );
        let tm = TransactionMessage::new(key(1), vec![ix], Blockhash::default());
        let message = tm.compile_to_legacy().unwrap();
        assert_eq!(message.account_keys.len(), 3);
    }
}
