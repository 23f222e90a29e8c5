//! The signing identity of one wallet on one chain.

use bip39::{Language, Mnemonic};
use ed25519_dalek::{Signer, SigningKey};
use zeroize::{Zeroize, Zeroizing};

use crate::error::KeyError;
use crate::hd;
use crate::path::DerivablePath;
use crate::public_key::PublicKey;

/// Length of the expanded Ed25519 secret (`seed || public key`).
pub const SECRET_KEY_LENGTH: usize = 64;

/// An Ed25519 key pair together with the mnemonic words it came from.
///
/// Immutable after construction. Secret material is zeroized on drop.
#[derive(Clone)]
pub struct DerivableKeyPair {
    phrase: Zeroizing<Vec<String>>,
    public_key: PublicKey,
    secret_key: Zeroizing<[u8; SECRET_KEY_LENGTH]>,
}

impl DerivableKeyPair {
    /// Derive the key pair at `path` from a BIP-39 seed.
    pub fn from_seed(
        path: &DerivablePath,
        seed: &[u8],
        phrase: Vec<String>,
    ) -> Result<Self, KeyError> {
        let keys = hd::derive_path(&path.rendered(), seed)?;
        let signing_key = SigningKey::from_bytes(&keys.key);
        Ok(Self::from_signing_key(&signing_key, phrase))
    }

    /// Parse an English mnemonic, stretch it with `passphrase` and derive at `path`.
    pub fn from_mnemonic(
        phrase: &str,
        passphrase: &str,
        path: &DerivablePath,
    ) -> Result<Self, KeyError> {
        let mnemonic = Mnemonic::parse_in_normalized(Language::English, phrase)
            .map_err(|e| KeyError::InvalidMnemonic(e.to_string()))?;

        let mut seed = mnemonic.to_seed(passphrase);
        let words = mnemonic.words().map(str::to_string).collect();
        let result = Self::from_seed(path, &seed, words);
        seed.zeroize();
        result
    }

    /// Restore from a 64-byte `seed || public key` secret.
    ///
    /// The public half must match the key derived from the seed half.
    pub fn from_secret_key(secret_key: &[u8], phrase: Vec<String>) -> Result<Self, KeyError> {
        let bytes: Zeroizing<[u8; SECRET_KEY_LENGTH]> =
            Zeroizing::new(secret_key.try_into().map_err(|_| {
                KeyError::InvalidSecretKey(format!(
                    "expected {SECRET_KEY_LENGTH} bytes, got {}",
                    secret_key.len()
                ))
            })?);
        let signing_key = SigningKey::from_keypair_bytes(&bytes)
            .map_err(|e| KeyError::InvalidSecretKey(e.to_string()))?;
        Ok(Self::from_signing_key(&signing_key, phrase))
    }

    fn from_signing_key(signing_key: &SigningKey, phrase: Vec<String>) -> Self {
        Self {
            phrase: Zeroizing::new(phrase),
            public_key: PublicKey::new(signing_key.verifying_key().to_bytes()),
            secret_key: Zeroizing::new(signing_key.to_keypair_bytes()),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    pub fn secret_key(&self) -> &[u8; SECRET_KEY_LENGTH] {
        &self.secret_key
    }

    pub fn phrase(&self) -> &[String] {
        &self.phrase
    }

    /// Detached Ed25519 signature over `message`.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&self.secret_key[..32]);
        let signing_key = SigningKey::from_bytes(&seed);
        seed.zeroize();
        signing_key.sign(message).to_bytes()
    }
}

impl PartialEq for DerivableKeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.public_key == other.public_key && self.secret_key == other.secret_key
    }
}

impl Eq for DerivableKeyPair {}

impl std::fmt::Debug for DerivableKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivableKeyPair")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::{DerivationType, SAFECOIN_COIN_TYPE, SOLANA_COIN_TYPE};

    // BIP-39 test vector: "abandon" x11 + "about"
    const TEST_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn solana_path() -> DerivablePath {
        DerivablePath::new(DerivationType::Bip44Change, SOLANA_COIN_TYPE, 0, None)
    }

    #[test]
    fn mnemonic_derives_known_solana_address() {
        let pair = DerivableKeyPair::from_mnemonic(TEST_MNEMONIC, "", &solana_path()).unwrap();
        assert_eq!(
            pair.public_key().to_string(),
            "HAgk14JpMQLgt6rVgv7cBQFJWFto5Dqxi472uT3DKpqk"
        );
        assert_eq!(
            hex::encode(&pair.secret_key()[..32]),
            "37df573b3ac4ad5b522e064e25b63ea16bcbe79d449e81a0268d1047948bb445"
        );
        assert_eq!(pair.phrase().len(), 12);
    }

    #[test]
    fn default_path_derives_safecoin_address() {
        let path = DerivablePath::default_for(SAFECOIN_COIN_TYPE);
        let pair = DerivableKeyPair::from_mnemonic(TEST_MNEMONIC, "", &path).unwrap();
        assert_eq!(
            pair.public_key().to_string(),
            "5V3BMYoen668gxmBHBZPkD4czoAFzhrZ8bX2cJfpRPPL"
        );
    }

    #[test]
    fn bip44_and_deprecated_paths() {
        let bip44 = DerivablePath::new(DerivationType::Bip44, SOLANA_COIN_TYPE, 0, None);
        let pair = DerivableKeyPair::from_mnemonic(TEST_MNEMONIC, "", &bip44).unwrap();
        assert_eq!(
            pair.public_key().to_string(),
            "GjJyeC1r2RgkuoCWMyPYkCWSGSGLcz266EaAkLA27AhL"
        );

        let deprecated = DerivablePath::new(DerivationType::Deprecated, SOLANA_COIN_TYPE, 0, None);
        let pair = DerivableKeyPair::from_mnemonic(TEST_MNEMONIC, "", &deprecated).unwrap();
        assert_eq!(
            pair.public_key().to_string(),
            "DaYoLHpp7RRyAqn1HBPZYZpsKVEAmCDWemW18GABpT5"
        );
    }

    #[test]
    fn invalid_mnemonic_fails() {
        let err = DerivableKeyPair::from_mnemonic("abandon abandon", "", &solana_path()).unwrap_err();
        assert!(matches!(err, KeyError::InvalidMnemonic(_)));
    }

    #[test]
    fn secret_key_layout_is_seed_then_public_key() {
        let pair = DerivableKeyPair::from_mnemonic(TEST_MNEMONIC, "", &solana_path()).unwrap();
        assert_eq!(&pair.secret_key()[32..], pair.public_key().as_bytes());
    }

    #[test]
    fn restore_from_secret_key() {
        let pair = DerivableKeyPair::from_mnemonic(TEST_MNEMONIC, "", &solana_path()).unwrap();
        let restored =
            DerivableKeyPair::from_secret_key(pair.secret_key(), pair.phrase().to_vec()).unwrap();
        assert_eq!(restored, pair);
    }

    #[test]
    fn restore_rejects_wrong_length() {
        let err = DerivableKeyPair::from_secret_key(&[0u8; 32], vec![]).unwrap_err();
        assert_eq!(
            err,
            KeyError::InvalidSecretKey("expected 64 bytes, got 32".into())
        );
    }

    #[test]
    fn restore_rejects_mismatched_public_half() {
        let pair = DerivableKeyPair::from_mnemonic(TEST_MNEMONIC, "", &solana_path()).unwrap();
        let mut secret = *pair.secret_key();
        secret[63] ^= 0xff;
        assert!(DerivableKeyPair::from_secret_key(&secret, vec![]).is_err());
    }

    #[test]
    fn signature_verifies() {
        use ed25519_dalek::{Signature, VerifyingKey};

        let pair = DerivableKeyPair::from_mnemonic(TEST_MNEMONIC, "", &solana_path()).unwrap();
        let signature = Signature::from_bytes(&pair.sign(b"hello"));
        let vk = VerifyingKey::from_bytes(pair.public_key().as_bytes()).unwrap();
        assert!(vk.verify_strict(b"hello", &signature).is_ok());
    }

    #[test]
    fn debug_hides_secret() {
        let pair = DerivableKeyPair::from_mnemonic(TEST_MNEMONIC, "", &solana_path()).unwrap();
        let debug = format!("{pair:?}");
        assert!(debug.contains("HAgk14"));
        assert!(!debug.contains("abandon"));
    }
}
