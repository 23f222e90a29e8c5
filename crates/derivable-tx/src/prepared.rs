use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use derivable_keys::{DerivableKeyPair, PublicKey};

use crate::error::TxError;
use crate::fee::FeeAmount;
use crate::transaction::VersionedTransaction;

/// A transaction ready for submission, together with the keys that sign
/// it and what it will cost.
#[derive(Debug, Clone)]
pub struct PreparedTransaction {
    pub transaction: VersionedTransaction,
    pub signers: Vec<DerivableKeyPair>,
    pub expected_fee: FeeAmount,
}

impl PreparedTransaction {
    pub fn new(
        transaction: VersionedTransaction,
        signers: Vec<DerivableKeyPair>,
        expected_fee: FeeAmount,
    ) -> Self {
        Self {
            transaction,
            signers,
            expected_fee,
        }
    }

    pub fn sign(&mut self) -> Result<(), TxError> {
        if self.signers.is_empty() {
            return Err(TxError::NoSignerProvided);
        }
        let signers: Vec<&DerivableKeyPair> = self.signers.iter().collect();
        self.transaction.sign(&signers);
        Ok(())
    }

    /// Base64 wire bytes, as `sendTransaction` expects them. Signs first
    /// when signers are attached.
    pub fn serialize(&mut self) -> Result<String, TxError> {
        if !self.signers.is_empty() {
            self.sign()?;
        }
        Ok(BASE64.encode(self.transaction.serialize()))
    }

    pub fn find_signature(&self, key: &PublicKey) -> Result<String, TxError> {
        self.transaction.find_signature(key)
    }
}
