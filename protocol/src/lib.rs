// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Lockup Protocol — Core Library
//!
//! A time-locked token escrow and the small ledger it runs on. An authority
//! deposits tokens with a lock duration; the tokens can't move until the
//! lock expires; then the authority takes all of them back.
//!
//! Nothing about a vault needs a registry. Its address, and the address of
//! the custodial account holding the tokens, are pure functions of a seed
//! tag, the authority key and the program id.
//!
//! ## Architecture
//!
//! Leaf modules first:
//!
//! - **config** — Program ids, seeds, rent, error-code bases.
//! - **crypto** — Ed25519 keys, hashing, program-derived addresses.
//! - **clock** — Where "now" comes from. Injected, never read directly.
//! - **storage** — Accounts in sled, typed state behind a discriminator.
//! - **system** — Native lamports and account creation with rent.
//! - **token** — Mints, token accounts, transfers.
//! - **vault** — The lockup program: initialize, deposit, withdraw.
//! - **runtime** — Signed transactions applied atomically, or not at all.
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use lockup_protocol::clock::ManualClock;
//! use lockup_protocol::crypto::keys::Keypair;
//! use lockup_protocol::runtime::{Message, Runtime, Transaction};
//! use lockup_protocol::storage::LedgerDB;
//! use lockup_protocol::vault::LockupInstruction;
//!
//! let clock = Arc::new(ManualClock::new(1_700_000_000));
//! let runtime = Runtime::new(LedgerDB::open_temporary().unwrap(), clock);
//! let authority = Keypair::generate();
//!
//! // No vault yet: the lockup program reports NotFound (0x194).
//! let message = Message::new(
//!     vec![authority.pubkey()],
//!     vec![LockupInstruction::Withdraw { authority: authority.pubkey() }.into()],
//! );
//! let err = runtime.process(&Transaction::new(message, &[&authority])).unwrap_err();
//! assert_eq!(err.custom_code(), Some(0x194));
//! ```
//!
//! ## Design Philosophy
//!
//! 1. If it touches tokens, it has tests. Plural.
//! 2. Every failure has a stable numeric code.
//! 3. A transaction that fails leaves no trace.

pub mod clock;
pub mod config;
pub mod crypto;
pub mod runtime;
pub mod storage;
pub mod system;
pub mod token;
pub mod vault;
