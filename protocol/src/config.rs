//! # Protocol Configuration & Constants
//!
//! Every magic number in Lockup lives here: program ids, seed tags, rent
//! parameters, error-code bases. If you're hardcoding a constant somewhere
//! else, move it here.
//!
//! Program ids and seed tags are part of the addressing contract. Every
//! vault address anyone has ever derived depends on them, so changing one
//! orphans every existing vault. Don't.

use crate::crypto::keys::Pubkey;

// ---------------------------------------------------------------------------
// Program Identifiers
// ---------------------------------------------------------------------------

/// Builds a program id from an ASCII tag, zero-padded to 32 bytes.
///
/// Program ids are plain 32-byte identities. They never sign anything
/// themselves, so there is no need for them to be valid curve points.
const fn program_id(tag: &[u8]) -> Pubkey {
    let mut bytes = [0u8; 32];
    let mut i = 0;
    while i < tag.len() && i < 32 {
        bytes[i] = tag[i];
        i += 1;
    }
    Pubkey::new_from_array(bytes)
}

/// Owner of plain native-currency accounts.
pub const SYSTEM_PROGRAM_ID: Pubkey = program_id(b"lockup:system");

/// Owner of mint and token accounts.
pub const TOKEN_PROGRAM_ID: Pubkey = program_id(b"lockup:token");

/// Namespace for associated token account derivation.
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Pubkey = program_id(b"lockup:associated-token");

/// The timelock vault program. Owns every `VaultAccount` and signs for the
/// shared custodial token account.
pub const LOCKUP_PROGRAM_ID: Pubkey = program_id(b"lockup:timelock-vault");

// ---------------------------------------------------------------------------
// Address Derivation
// ---------------------------------------------------------------------------

/// Domain tag for both vault addresses. `[VAULT_SEED]` alone derives the
/// shared custodial token account; `[VAULT_SEED, authority]` derives the
/// per-authority control account.
pub const VAULT_SEED: &[u8] = b"vault";

/// Suffix mixed into every derived-address hash so that derived addresses
/// live in their own hash domain.
pub const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Maximum number of seeds (including the bump) per derivation.
pub const MAX_SEEDS: usize = 16;

/// Maximum length of a single seed in bytes.
pub const MAX_SEED_LEN: usize = 32;

// ---------------------------------------------------------------------------
// Native Currency & Rent
// ---------------------------------------------------------------------------

/// Smallest native units per whole native coin.
pub const LAMPORTS_PER_NATIVE: u64 = 1_000_000_000;

/// Bytes charged on top of the data length for every stored account.
pub const ACCOUNT_STORAGE_OVERHEAD: u64 = 128;

/// Yearly rent per stored byte, in lamports.
pub const LAMPORTS_PER_BYTE_YEAR: u64 = 3_480;

/// An account holding this many years of rent is exempt forever.
pub const RENT_EXEMPTION_YEARS: u64 = 2;

/// Lamports an account of `data_len` bytes must hold when it is created.
pub fn rent_exempt_minimum(data_len: usize) -> u64 {
    (ACCOUNT_STORAGE_OVERHEAD + data_len as u64) * LAMPORTS_PER_BYTE_YEAR * RENT_EXEMPTION_YEARS
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// Default decimals for newly created mints.
pub const DEFAULT_MINT_DECIMALS: u8 = 9;

// ---------------------------------------------------------------------------
// Error Codes
// ---------------------------------------------------------------------------

/// First custom error code of the lockup program. `StillLocked` sits at
/// `base + 3 = 0x193`, which existing clients match on.
pub const LOCKUP_ERROR_BASE: u32 = 0x190;

/// First custom error code of the token program.
pub const TOKEN_ERROR_BASE: u32 = 0x100;

/// First custom error code of the system program.
pub const SYSTEM_ERROR_BASE: u32 = 0x80;

/// Returns a friendly name for a known program id, mainly for logs.
pub fn program_name(id: &Pubkey) -> Option<&'static str> {
    match *id {
        SYSTEM_PROGRAM_ID => Some("system"),
        TOKEN_PROGRAM_ID => Some("token"),
        ASSOCIATED_TOKEN_PROGRAM_ID => Some("associated-token"),
        LOCKUP_PROGRAM_ID => Some("lockup"),
        _ => None,
    }
}
