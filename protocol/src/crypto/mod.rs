//! # Cryptographic Primitives
//!
//! Everything identity- and address-related flows through here:
//!
//! - **Ed25519** keypairs and signatures (`keys`) authenticate every
//!   mutating transaction.
//! - **SHA-256** and **BLAKE3** (`hash`) back address derivation and
//!   transaction ids respectively.
//! - **Program-derived addresses** (`pda`) give every vault a stable,
//!   recomputable, unforgeable address.
//!
//! Everything here is a thin, type-safe wrapper around audited crates.

pub mod hash;
pub mod keys;
pub mod pda;

pub use keys::{KeyError, Keypair, Pubkey, Signature};
pub use pda::{create_program_address, find_program_address, PdaError};
