//! SLIP-0010 hierarchical derivation for Ed25519.
//!
//! Ed25519 only supports hardened derivation, so every path segment is
//! derived with the hardened offset applied whether or not the segment
//! carries a `'` marker.
//!
//! ```text
//! master = HMAC-SHA512(key = "ed25519 seed", data = seed)
//! child  = HMAC-SHA512(key = parent.chain_code,
//!                      data = 0x00 || parent.key || BE32(index | 0x8000_0000))
//! key = I[0..32], chain_code = I[32..64]
//! ```

use hmac::{Hmac, Mac};
use sha2::Sha512;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::KeyError;

type HmacSha512 = Hmac<Sha512>;

const ED25519_CURVE: &[u8] = b"ed25519 seed";

/// Offset added to every segment index.
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// A private key and chain code at some node of the derivation tree.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Keys {
    pub key: [u8; 32],
    pub chain_code: [u8; 32],
}

impl std::fmt::Debug for Keys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keys").finish_non_exhaustive()
    }
}

/// Compute the master node for a seed.
pub fn master_key_from_seed(seed: &[u8]) -> Result<Keys, KeyError> {
    let mut mac = HmacSha512::new_from_slice(ED25519_CURVE)
        .map_err(|e| KeyError::SeedDerivationFailed(e.to_string()))?;
    mac.update(seed);
    Ok(split(mac))
}

/// Derive the node at `path` (grammar `m(/[0-9]+'?)+`) from `seed`.
pub fn derive_path(path: &str, seed: &[u8]) -> Result<Keys, KeyError> {
    let segments = parse_path(path)?;
    let mut node = master_key_from_seed(seed)?;
    for index in segments {
        node = child_key(&node, index)?;
    }
    Ok(node)
}

/// Ed25519 public key for a 32-byte private seed.
pub fn public_key_from_seed(private_seed: &[u8; 32]) -> [u8; 32] {
    ed25519_dalek::SigningKey::from_bytes(private_seed)
        .verifying_key()
        .to_bytes()
}

fn child_key(parent: &Keys, index: u32) -> Result<Keys, KeyError> {
    let mut mac = HmacSha512::new_from_slice(&parent.chain_code)
        .map_err(|e| KeyError::SeedDerivationFailed(e.to_string()))?;
    mac.update(&[0x00]);
    mac.update(&parent.key);
    mac.update(&(index | HARDENED_OFFSET).to_be_bytes());
    Ok(split(mac))
}

fn split(mac: HmacSha512) -> Keys {
    let mut output = mac.finalize().into_bytes();
    let mut keys = Keys {
        key: [0u8; 32],
        chain_code: [0u8; 32],
    };
    keys.key.copy_from_slice(&output[..32]);
    keys.chain_code.copy_from_slice(&output[32..]);
    output.as_mut_slice().zeroize();
    keys
}

/// Parse `m/44'/501'/0'/0'` into `[44, 501, 0, 0]`.
pub(crate) fn parse_path(path: &str) -> Result<Vec<u32>, KeyError> {
    let invalid = || KeyError::InvalidDerivationPath(path.to_string());

    let rest = path.strip_prefix('m').ok_or_else(invalid)?;
    let rest = rest.strip_prefix('/').ok_or_else(invalid)?;

    rest.split('/')
        .map(|segment| {
            let digits = segment.strip_suffix('\'').unwrap_or(segment);
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            let index: u32 = digits.parse().map_err(|_| invalid())?;
            if index >= HARDENED_OFFSET {
                return Err(invalid());
            }
            Ok(index)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // SLIP-0010 test vector 1 for ed25519.
    const VECTOR_SEED: &str = "000102030405060708090a0b0c0d0e0f";

    fn seed() -> Vec<u8> {
        hex::decode(VECTOR_SEED).unwrap()
    }

    // -- master key ---------------------------------------------------------

    #[test]
    fn master_key_matches_vector() {
        let keys = master_key_from_seed(&seed()).unwrap();
        assert_eq!(
            hex::encode(keys.key),
            "2b4be7f19ee27bbf30c667b642d5f4aa69fd169872f8fc3059c08ebae2eb19e7"
        );
        assert_eq!(
            hex::encode(keys.chain_code),
            "90046a93de5380a72b5e45010748567d5ea02bbf6522f979e05c0d8d8ca9fffb"
        );
    }

    #[test]
    fn master_public_key_matches_vector() {
        let keys = master_key_from_seed(&seed()).unwrap();
        assert_eq!(
            hex::encode(public_key_from_seed(&keys.key)),
            "a4b2856bfec510abab89753fac1ac0e1112364e7d250545963f135f2a33188ed"
        );
    }

    // -- child derivation ---------------------------------------------------

    #[test]
    fn derive_first_hardened_child() {
        let keys = derive_path("m/0'", &seed()).unwrap();
        assert_eq!(
            hex::encode(keys.key),
            "68e0fe46dfb67e368c75379acec591dad19df3cde26e63b93a8e704f1dade7a3"
        );
        assert_eq!(
            hex::encode(keys.chain_code),
            "8b59aa11380b624e81507a27fedda59fea6d0b779a778918a2fd3590e16e9c69"
        );
    }

    #[test]
    fn derive_two_levels() {
        let keys = derive_path("m/0'/1'", &seed()).unwrap();
        assert_eq!(
            hex::encode(keys.key),
            "b1d0bad404bf35da785a64ca1ac54b2617211d2777696fbffaf208f746ae84f2"
        );
        assert_eq!(
            hex::encode(keys.chain_code),
            "a320425f77d1b5c2505a6b1b27382b37368ee640e3557c315416801243552f14"
        );
    }

    #[test]
    fn unmarked_segments_are_hardened_too() {
        let marked = derive_path("m/0'/1'", &seed()).unwrap();
        let unmarked = derive_path("m/0/1", &seed()).unwrap();
        assert_eq!(marked, unmarked);
    }

    #[test]
    fn derivation_is_deterministic() {
        let a = derive_path("m/44'/501'/0'/0'", &seed()).unwrap();
        let b = derive_path("m/44'/501'/0'/0'", &seed()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_paths_give_different_keys() {
        let a = derive_path("m/44'/501'/0'/0'", &seed()).unwrap();
        let b = derive_path("m/44'/501'/1'/0'", &seed()).unwrap();
        assert_ne!(a.key, b.key);
    }

    // -- path grammar -------------------------------------------------------

    #[test]
    fn parse_valid_paths() {
        assert_eq!(parse_path("m/44'/501'/0'/0'").unwrap(), vec![44, 501, 0, 0]);
        assert_eq!(parse_path("m/501'/0'/0/0").unwrap(), vec![501, 0, 0, 0]);
        assert_eq!(parse_path("m/7").unwrap(), vec![7]);
    }

    #[test]
    fn parse_rejects_malformed_paths() {
        for path in ["", "m", "m/", "44'/501'", "m//1", "m/1''", "m/1h", "m/a'", "m/1/", "n/1"] {
            assert!(
                matches!(parse_path(path), Err(KeyError::InvalidDerivationPath(_))),
                "{path} should be rejected"
            );
        }
    }

    #[test]
    fn parse_rejects_index_at_hardened_offset() {
        assert!(parse_path("m/2147483648'").is_err());
        assert!(parse_path("m/2147483647'").is_ok());
    }

    #[test]
    fn debug_hides_key_material() {
        let keys = master_key_from_seed(&seed()).unwrap();
        assert!(!format!("{keys:?}").contains("2b4b"));
    }
}
