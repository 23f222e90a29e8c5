//! Program-derived addresses.
//!
//! A PDA is `SHA-256(seed_0 || .. || seed_n || program_id || "ProgramDerivedAddress")`
//! constrained to fall off the Ed25519 curve, so no private key exists for it.

use sha2::{Digest, Sha256};

use crate::error::KeyError;
use crate::public_key::{PublicKey, MAX_SEED_LENGTH};

/// Domain tag appended after the program id.
const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Hash `seeds` under `program_id`, rejecting on-curve results.
pub fn create_program_address(
    seeds: &[&[u8]],
    program_id: &PublicKey,
) -> Result<PublicKey, KeyError> {
    let mut hasher = Sha256::new();
    for seed in seeds {
        if seed.len() > MAX_SEED_LENGTH {
            return Err(KeyError::SeedTooLong(seed.len()));
        }
        hasher.update(seed);
    }
    hasher.update(program_id.as_bytes());
    hasher.update(PDA_MARKER);

    let address = PublicKey::new(hasher.finalize().into());
    if address.is_on_curve() {
        return Err(KeyError::InvalidSeed);
    }
    Ok(address)
}

/// Search bump seeds from 255 down to 0 for the first off-curve address.
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &PublicKey,
) -> Result<(PublicKey, u8), KeyError> {
    for bump in (0u8..=255).rev() {
        let bump_seed = [bump];
        let mut with_bump: Vec<&[u8]> = Vec::with_capacity(seeds.len() + 1);
        with_bump.extend_from_slice(seeds);
        with_bump.push(&bump_seed);

        match create_program_address(&with_bump, program_id) {
            Ok(address) => return Ok((address, bump)),
            Err(KeyError::InvalidSeed) => continue,
            Err(other) => return Err(other),
        }
    }
    Err(KeyError::ProgramAddressNotFound)
}

/// The canonical associated token account of `wallet` for `mint`.
///
/// Seeds are `[wallet, token_program, mint]` under the associated token
/// program. Program ids are passed in because they differ per chain.
pub fn associated_token_address(
    wallet: &PublicKey,
    mint: &PublicKey,
    token_program: &PublicKey,
    associated_token_program: &PublicKey,
) -> Result<PublicKey, KeyError> {
    find_program_address(
        &[wallet.as_ref(), token_program.as_ref(), mint.as_ref()],
        associated_token_program,
    )
    .map(|(address, _bump)| address)
}
