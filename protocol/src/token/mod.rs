//! # Token Program
//!
//! Fungible tokens on the ledger: mints, token accounts, minting and
//! transfers. The vault program depends on this module only through the
//! [`TokenTransfer`] trait, which is the seam for swapping in a different
//! token implementation (or a mock).
//!
//! ```text
//! state.rs   — Mint, TokenAccount, associated token addresses
//! program.rs — TokenProgram: instruction processing + TokenTransfer impl
//! ```

pub mod program;
pub mod state;

pub use program::{TokenError, TokenInstruction, TokenProgram};
pub use state::{associated_token_address, Mint, TokenAccount};

use crate::crypto::keys::Pubkey;
use crate::runtime::context::InvokeContext;

/// The token capabilities the vault program needs.
///
/// Every call runs inside the caller's [`InvokeContext`], so its effects
/// commit or roll back together with the caller's own writes.
pub trait TokenTransfer {
    /// Move `amount` from `source` to `destination`. `authority` must own
    /// `source` and be a signer of the current invocation.
    fn transfer(
        &self,
        ctx: &mut InvokeContext<'_>,
        source: &Pubkey,
        destination: &Pubkey,
        authority: &Pubkey,
        amount: u64,
    ) -> Result<(), TokenError>;

    /// Create an empty token account for `mint` at `address`, owned by
    /// `owner`, paid for by `payer`.
    fn open_account(
        &self,
        ctx: &mut InvokeContext<'_>,
        payer: &Pubkey,
        address: &Pubkey,
        mint: &Pubkey,
        owner: &Pubkey,
    ) -> Result<(), TokenError>;

    /// Read a token account, `None` if nothing lives at `address`.
    fn account(
        &self,
        ctx: &mut InvokeContext<'_>,
        address: &Pubkey,
    ) -> Result<Option<TokenAccount>, TokenError>;

    /// Read a mint, `None` if nothing lives at `address`.
    fn mint(&self, ctx: &mut InvokeContext<'_>, address: &Pubkey) -> Result<Option<Mint>, TokenError>;

    /// Balance of an existing token account.
    fn balance(&self, ctx: &mut InvokeContext<'_>, address: &Pubkey) -> Result<u64, TokenError> {
        self.account(ctx, address)?
            .map(|account| account.amount)
            .ok_or(TokenError::AccountNotFound(*address))
    }
}
