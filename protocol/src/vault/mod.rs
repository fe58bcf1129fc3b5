//! # Vault Module — Time-Locked Token Escrow
//!
//! An authority deposits tokens together with a lock duration. Until the
//! lock expires nobody can move them, not even the authority; afterwards
//! the authority withdraws the whole amount back to their own associated
//! token account.
//!
//! ## Architecture
//!
//! ```text
//! state.rs  — VaultAccount record + VaultStore (derived addressing, create/read/update)
//! engine.rs — LockupProgram: initialize, deposit, withdraw
//! error.rs  — LockupError with stable numeric codes
//! ```
//!
//! ## Addressing
//!
//! | Account            | Seeds                  | Owner                          |
//! |--------------------|------------------------|--------------------------------|
//! | `VaultAccount`     | `[b"vault", authority]`| lockup program                 |
//! | custodial tokens   | `[b"vault"]`           | token program, authority = itself |
//!
//! The custodial account is shared by every vault of the program. Who owns
//! what inside it is tracked only by each `VaultAccount.locked_amount`, so
//! the pool holds a single mint: whichever mint the first `initialize`
//! named.
//!
//! ## Things that surprise people
//!
//! 1. **Deposits overwrite.** A second deposit sets `locked_amount` to the
//!    new amount and restarts the timer. Tokens from the first deposit stay
//!    in custody but are no longer attributed to anyone. This is logged as
//!    a warning every time it happens.
//!
//! 2. **The unlock check is inclusive.** `now == unlock_time` is unlocked.

pub mod engine;
pub mod error;
pub mod state;

pub use engine::LockupProgram;
pub use error::{ErrorClass, LockupError};
pub use state::{VaultAccount, VaultStore};

use serde::{Deserialize, Serialize};

use crate::crypto::keys::Pubkey;

/// Instructions understood by the lockup program.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockupInstruction {
    /// Create the authority's vault for `mint`.
    Initialize { authority: Pubkey, mint: Pubkey },
    /// Lock `amount` base units for `duration` seconds.
    Deposit {
        authority: Pubkey,
        amount: u64,
        duration: u64,
    },
    /// Take back everything locked, once the lock has expired.
    Withdraw { authority: Pubkey },
}
