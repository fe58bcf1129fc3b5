//! # Program-Derived Addresses
//!
//! Deterministic account addresses computed from seed material and the id
//! of the program that controls them. Nobody stores a "vault registry":
//! given the seeds, anyone recomputes the address.
//!
//! ## Construction
//!
//! ```text
//! address = SHA-256(seed_0 || ... || seed_n || program_id || "ProgramDerivedAddress")
//! ```
//!
//! The result must NOT be a valid compressed Ed25519 point. If it were,
//! somebody could in principle hold the matching secret key and sign for
//! the account, bypassing the program. [`find_program_address`] therefore
//! appends a one-byte "bump" seed, counting down from 255, until the hash
//! lands off the curve. Roughly half of all hashes are off-curve, so the
//! first or second bump almost always succeeds.
//!
//! The bump that succeeds first is the *canonical* one. Programs store it
//! and later re-derive with [`create_program_address`] to prove they own
//! the seeds (that's how the vault program "signs" for its custody account).

use curve25519_dalek::edwards::CompressedEdwardsY;
use thiserror::Error;

use super::hash::sha256v;
use super::keys::Pubkey;
use crate::config::{MAX_SEEDS, MAX_SEED_LEN, PDA_MARKER};

/// Errors from address derivation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PdaError {
    #[error("seed {index} is {len} bytes, over the per-seed maximum")]
    MaxSeedLengthExceeded { index: usize, len: usize },

    #[error("{count} seeds given, over the per-derivation maximum")]
    TooManySeeds { count: usize },

    /// The seeds hash to a point on the curve; not a usable derived address.
    #[error("seeds produce an on-curve address")]
    InvalidSeeds,

    /// No bump in 0..=255 produced an off-curve address.
    #[error("no canonical derived address exists for these seeds")]
    DerivationExhausted,
}

/// Returns `true` if the 32 bytes decompress to a valid Ed25519 point.
pub fn is_on_curve(bytes: &[u8; 32]) -> bool {
    CompressedEdwardsY(*bytes).decompress().is_some()
}

/// Derive the address for an exact seed list (bump included by the caller).
pub fn create_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> Result<Pubkey, PdaError> {
    if seeds.len() > MAX_SEEDS {
        return Err(PdaError::TooManySeeds { count: seeds.len() });
    }
    for (index, seed) in seeds.iter().enumerate() {
        if seed.len() > MAX_SEED_LEN {
            return Err(PdaError::MaxSeedLengthExceeded {
                index,
                len: seed.len(),
            });
        }
    }

    let mut parts: Vec<&[u8]> = Vec::with_capacity(seeds.len() + 2);
    parts.extend_from_slice(seeds);
    parts.push(program_id.as_ref());
    parts.push(PDA_MARKER);

    let hash = sha256v(&parts);
    if is_on_curve(&hash) {
        return Err(PdaError::InvalidSeeds);
    }
    Ok(Pubkey::new_from_array(hash))
}

/// Find the canonical derived address and its bump.
///
/// # Example
///
/// ```
/// use lockup_protocol::config::{LOCKUP_PROGRAM_ID, VAULT_SEED};
/// use lockup_protocol::crypto::pda::{create_program_address, find_program_address};
///
/// let (address, bump) = find_program_address(&[VAULT_SEED], &LOCKUP_PROGRAM_ID).unwrap();
/// let again = create_program_address(&[VAULT_SEED, &[bump]], &LOCKUP_PROGRAM_ID).unwrap();
/// assert_eq!(address, again);
/// ```
pub fn find_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> Result<(Pubkey, u8), PdaError> {
    // The bump occupies one seed slot.
    if seeds.len() >= MAX_SEEDS {
        return Err(PdaError::TooManySeeds {
            count: seeds.len() + 1,
        });
    }

    for bump in (0..=u8::MAX).rev() {
        let bump_seed = [bump];
        let mut with_bump: Vec<&[u8]> = Vec::with_capacity(seeds.len() + 1);
        with_bump.extend_from_slice(seeds);
        with_bump.push(&bump_seed);

        match create_program_address(&with_bump, program_id) {
            Ok(address) => return Ok((address, bump)),
            Err(PdaError::InvalidSeeds) => continue,
            Err(other) => return Err(other),
        }
    }

    Err(PdaError::DerivationExhausted)
}
