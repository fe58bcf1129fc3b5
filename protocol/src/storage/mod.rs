//! # Storage Module
//!
//! Persistent account storage for the Lockup ledger.
//!
//! ## Architecture
//!
//! ```text
//! account.rs — Account record + typed program state (discriminator || bincode)
//! db.rs      — sled persistence: accounts, processed transactions
//! ```
//!
//! ## Design Decisions
//!
//! 1. **Flat account map.** Every piece of state (native balances, mints,
//!    token accounts, vaults) is an [`Account`] keyed by its 32-byte
//!    address. No secondary indices; derived addresses make them unnecessary.
//!
//! 2. **Programs own their bytes.** An account's `data` is opaque to the
//!    store. The owning program (de)serializes it through [`ProgramState`].
//!
//! 3. **Bincode on disk.** Compact and deterministic. JSON is for the CLI.

pub mod account;
pub mod db;

pub use account::{Account, ProgramState};
pub use db::{DbError, DbResult, LedgerDB};
