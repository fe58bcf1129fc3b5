//! # Hashing Utilities
//!
//! - **SHA-256** for address derivation. Derived addresses are recomputed
//!   client-side, so they use the most widely available hash.
//! - **BLAKE3** in `derive_key` mode for transaction ids.

use sha2::{Digest, Sha256};

/// SHA-256 over several slices fed in order, without concatenating them
/// into a temporary buffer first. Equivalent to hashing the concatenation.
///
/// ```
/// use lockup_protocol::crypto::hash::sha256v;
///
/// assert_eq!(sha256v(&[b"vau", b"lt"]), sha256v(&[b"vault"]));
/// ```
pub fn sha256v(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    output
}

/// BLAKE3 in `derive_key` mode: the same data hashed under two contexts
/// never collides.
pub fn domain_separated_hash(context: &str, data: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    hasher.update(data);
    *hasher.finalize().as_bytes()
}
