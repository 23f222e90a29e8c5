//! Signed transactions and their wire format.
//!
//! ```text
//! num_signatures     compact-u16
//! signatures         64 bytes * num_signatures
//! message            legacy or versioned bytes
//! ```

use derivable_keys::{DerivableKeyPair, PublicKey};

use crate::error::TxError;
use crate::message::VersionedMessage;
use crate::short_vec::{encode_length, Reader};

pub const SIGNATURE_LENGTH: usize = 64;

pub type Signature = [u8; SIGNATURE_LENGTH];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedTransaction {
    pub signatures: Vec<Signature>,
    pub message: VersionedMessage,
}

impl VersionedTransaction {
    /// Unsigned transaction with one zeroed slot per required signer.
    pub fn new(message: VersionedMessage) -> Self {
        let required = message.header().num_required_signatures as usize;
        Self {
            signatures: vec![[0u8; SIGNATURE_LENGTH]; required],
            message,
        }
    }

    pub fn with_signatures(message: VersionedMessage, signatures: Vec<Signature>) -> Self {
        Self {
            signatures,
            message,
        }
    }

    fn signer_slot(&self, key: &PublicKey) -> Option<usize> {
        let required = self.message.header().num_required_signatures as usize;
        self.message
            .static_account_keys()
            .iter()
            .take(required)
            .position(|k| k == key)
    }

    fn ensure_slots(&mut self) {
        let required = self.message.header().num_required_signatures as usize;
        if self.signatures.len() < required {
            self.signatures.resize(required, [0u8; SIGNATURE_LENGTH]);
        }
    }

    /// Sign the message bytes with each keypair. Keys that are not required
    /// signers of the message are skipped.
    pub fn sign(&mut self, signers: &[&DerivableKeyPair]) {
        self.ensure_slots();
        let message_bytes = self.message.serialize();

        for signer in signers {
            let key = signer.public_key();
            match self.signer_slot(&key) {
                Some(slot) => self.signatures[slot] = signer.sign(&message_bytes),
                None => {
                    tracing::warn!(signer = %key, "skipping signer not required by message");
                }
            }
        }
    }

    /// Place an externally produced signature in the slot for `key`.
    pub fn add_signature(&mut self, key: &PublicKey, signature: Signature) -> Result<(), TxError> {
        let slot = self
            .signer_slot(key)
            .ok_or_else(|| TxError::NonRequiredSigner(key.to_string()))?;
        self.ensure_slots();
        self.signatures[slot] = signature;
        Ok(())
    }

    /// The fee payer's slot, which doubles as the transaction id.
    pub fn signature(&self) -> Option<&Signature> {
        self.signatures.first()
    }

    /// Base58 signature in the slot for `key`. Fails when `key` is not a
    /// required signer or its slot is still a placeholder.
    pub fn find_signature(&self, key: &PublicKey) -> Result<String, TxError> {
        self.signer_slot(key)
            .and_then(|slot| self.signatures.get(slot))
            .filter(|sig| !is_placeholder(sig))
            .map(|sig| bs58::encode(sig).into_string())
            .ok_or(TxError::SignatureNotFound)
    }

    pub fn is_fully_signed(&self) -> bool {
        let required = self.message.header().num_required_signatures as usize;
        self.signatures.len() >= required
            && self.signatures[..required].iter().all(|sig| !is_placeholder(sig))
    }

    pub fn serialize(&self) -> Vec<u8> {
        let message = self.message.serialize();
        let mut wire =
            Vec::with_capacity(3 + self.signatures.len() * SIGNATURE_LENGTH + message.len());
        wire.extend_from_slice(&encode_length(self.signatures.len()));
        for sig in &self.signatures {
            wire.extend_from_slice(sig);
        }
        wire.extend_from_slice(&message);
        wire
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, TxError> {
        let mut reader = Reader::new(data);
        let count = reader.read_length()?;
        let signatures = (0..count)
            .map(|_| reader.read_array::<SIGNATURE_LENGTH>())
            .collect::<Result<Vec<_>, _>>()?;
        let message = VersionedMessage::read_from(&mut reader)?;
        reader.finish()?;
        Ok(Self {
            signatures,
            message,
        })
    }
}

fn is_placeholder(sig: &Signature) -> bool {
    sig.iter().all(|b| *b == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Blockhash;
    use crate::instruction::{AccountMeta, TransactionInstruction};
    use crate::message::{AddressLookupTableAccount, TransactionMessage};
    use crate::programs::system;
    use ed25519_dalek::{Signature as DalekSig, SigningKey, VerifyingKey};

    fn keypair(seed: u8) -> DerivableKeyPair {
        let signing = SigningKey::from_bytes(&[seed; 32]);
        DerivableKeyPair::from_secret_key(&signing.to_keypair_bytes(), Vec::new()).unwrap()
    }

    fn legacy_transfer(from: &DerivableKeyPair) -> VersionedTransaction {
        let message = TransactionMessage::new(
            from.public_key(),
            vec![system::transfer(&from.public_key(), &PublicKey::new([0xbb; 32]), 42)],
            Blockhash::new([0xcc; 32]),
        )
        .compile_to_legacy()
        .unwrap();
        VersionedTransaction::new(message.into())
    }

    fn verify(tx: &VersionedTransaction, slot: usize, key: &PublicKey) -> bool {
        let vk = VerifyingKey::from_bytes(key.as_bytes()).unwrap();
        let sig = DalekSig::from_bytes(&tx.signatures[slot]);
        vk.verify_strict(&tx.message.serialize(), &sig).is_ok()
    }

    // -- slots --------------------------------------------------------------

    #[test]
    fn new_allocates_zeroed_slots() {
        let kp = keypair(1);
        let tx = legacy_transfer(&kp);
        assert_eq!(tx.signatures, vec![[0u8; 64]]);
        assert!(!tx.is_fully_signed());
        assert_eq!(
            tx.find_signature(&kp.public_key()).unwrap_err(),
            TxError::SignatureNotFound
        );
    }

    // -- signing ------------------------------------------------------------

    #[test]
    fn sign_fills_payer_slot_with_valid_signature() {
        let kp = keypair(0x42);
        let mut tx = legacy_transfer(&kp);
        tx.sign(&[&kp]);

        assert!(tx.is_fully_signed());
        assert!(verify(&tx, 0, &kp.public_key()));
        assert_eq!(
            tx.find_signature(&kp.public_key()).unwrap(),
            bs58::encode(tx.signatures[0]).into_string()
        );
        assert_eq!(tx.signature(), Some(&tx.signatures[0]));
    }

    #[test]
    fn sign_is_deterministic() {
        let kp = keypair(0x55);
        let mut a = legacy_transfer(&kp);
        let mut b = legacy_transfer(&kp);
        a.sign(&[&kp]);
        b.sign(&[&kp]);
        assert_eq!(a.serialize(), b.serialize());
    }

    #[test]
    fn sign_skips_unrelated_keys() {
        let kp = keypair(1);
        let stranger = keypair(2);
        let mut tx = legacy_transfer(&kp);
        tx.sign(&[&stranger]);
        assert_eq!(tx.signatures, vec![[0u8; 64]]);
    }

    #[test]
    fn multiple_signers_land_in_their_slots() {
        let payer = keypair(1);
        let second = keypair(2);
        let ix = TransactionInstruction::new(
            PublicKey::new([9; 32]),
            vec![AccountMeta::readonly(second.public_key(), true)],
            vec![],
        );
        let message = TransactionMessage::new(payer.public_key(), vec![ix], Blockhash::default())
            .compile_to_legacy()
            .unwrap();
        let mut tx = VersionedTransaction::new(message.into());
        tx.sign(&[&second, &payer]);

        assert_eq!(tx.signatures.len(), 2);
        assert!(verify(&tx, 0, &payer.public_key()));
        assert!(verify(&tx, 1, &second.public_key()));
        assert_eq!(
            tx.find_signature(&second.public_key()).unwrap(),
            bs58::encode(tx.signatures[1]).into_string()
        );
        assert_eq!(
            tx.find_signature(&PublicKey::new([9; 32])).unwrap_err(),
            TxError::SignatureNotFound
        );
    }

    #[test]
    fn add_signature_rejects_non_required_signer() {
        let mut tx = legacy_transfer(&keypair(1));
        let stranger = PublicKey::new([0xbb; 32]);
        assert_eq!(
            tx.add_signature(&stranger, [1; 64]).unwrap_err(),
            TxError::NonRequiredSigner(stranger.to_base58())
        );
    }

    #[test]
    fn add_signature_places_external_signature() {
        let kp = keypair(3);
        let mut tx = legacy_transfer(&kp);
        let sig = kp.sign(&tx.message.serialize());
        tx.add_signature(&kp.public_key(), sig).unwrap();
        assert!(verify(&tx, 0, &kp.public_key()));
    }

    // -- wire format --------------------------------------------------------

    #[test]
    fn wire_layout_is_count_signatures_message() {
        let kp = keypair(4);
        let mut tx = legacy_transfer(&kp);
        tx.sign(&[&kp]);
        let wire = tx.serialize();
        assert_eq!(wire[0], 1);
        assert_eq!(&wire[1..65], &tx.signatures[0]);
        assert_eq!(&wire[65..], tx.message.serialize().as_slice());
    }

    #[test]
    fn legacy_wire_decodes_to_same_transaction() {
        let kp = keypair(5);
        let mut tx = legacy_transfer(&kp);
        tx.sign(&[&kp]);
        assert_eq!(VersionedTransaction::deserialize(&tx.serialize()).unwrap(), tx);
    }

    #[test]
    fn v0_wire_decodes_to_same_transaction() {
        let kp = keypair(6);
        let table_key = PublicKey::new([0xaa; 32]);
        let readonly = PublicKey::new([0x44; 32]);
        let ix = TransactionInstruction::new(
            PublicKey::new([9; 32]),
            vec![
                AccountMeta::writable(kp.public_key(), true),
                AccountMeta::readonly(readonly, false),
            ],
            vec![7],
        );
        let message = TransactionMessage::new(kp.public_key(), vec![ix], Blockhash::new([1; 32]))
            .compile_to_v0(&[AddressLookupTableAccount {
                key: table_key,
                addresses: vec![readonly],
            }])
            .unwrap();
        let mut tx = VersionedTransaction::new(message.into());
        tx.sign(&[&kp]);

        let decoded = VersionedTransaction::deserialize(&tx.serialize()).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(decoded.message.version(), Some(0));
        assert!(verify(&decoded, 0, &kp.public_key()));
    }

    #[test]
    fn deserialize_rejects_truncated_signatures() {
        let kp = keypair(7);
        let mut tx = legacy_transfer(&kp);
        tx.sign(&[&kp]);
        let wire = tx.serialize();
        assert!(VersionedTransaction::deserialize(&wire[..40]).is_err());
        assert!(VersionedTransaction::deserialize(&[]).is_err());
    }
}
