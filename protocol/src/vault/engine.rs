//! # Escrow Engine
//!
//! The three vault operations and nothing else. Per authority a vault moves
//! through:
//!
//! ```text
//! Uninitialized --initialize--> Idle(amount = 0)
//! Idle          --deposit-----> Locked(amount > 0, unlock_time = now + duration)
//! Locked        --deposit-----> Locked(amount overwritten, timer restarted)
//! Locked        --withdraw----> Idle          (only once now >= unlock_time)
//! ```
//!
//! All token movement goes through the [`TokenTransfer`] seam and all time
//! through the injected [`Clock`]; the engine itself holds no state between
//! calls. Every check runs before the first write, and the runtime throws
//! away the whole working set if anything fails, so a rejected call leaves
//! no trace.

use std::sync::Arc;

use super::error::LockupError;
use super::state::{VaultAccount, VaultStore};
use super::LockupInstruction;
use crate::clock::Clock;
use crate::config::{LOCKUP_PROGRAM_ID, VAULT_SEED};
use crate::crypto::keys::Pubkey;
use crate::runtime::context::InvokeContext;
use crate::token::{associated_token_address, TokenProgram, TokenTransfer};

/// The timelock vault program.
pub struct LockupProgram<T: TokenTransfer = TokenProgram> {
    store: VaultStore,
    token: T,
    clock: Arc<dyn Clock>,
}

impl LockupProgram<TokenProgram> {
    /// The program at [`LOCKUP_PROGRAM_ID`] backed by the ledger's token
    /// program.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_token(LOCKUP_PROGRAM_ID, TokenProgram, clock)
    }
}

impl<T: TokenTransfer> LockupProgram<T> {
    pub fn with_token(program_id: Pubkey, token: T, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: VaultStore::new(program_id),
            token,
            clock,
        }
    }

    pub fn program_id(&self) -> &Pubkey {
        self.store.program_id()
    }

    pub fn store(&self) -> &VaultStore {
        &self.store
    }

    /// Execute one lockup instruction.
    pub fn process(
        &self,
        ctx: &mut InvokeContext<'_>,
        instruction: &LockupInstruction,
    ) -> Result<(), LockupError> {
        match instruction {
            LockupInstruction::Initialize { authority, mint } => {
                self.initialize(ctx, authority, mint).map(|_| ())
            }
            LockupInstruction::Deposit {
                authority,
                amount,
                duration,
            } => self.deposit(ctx, authority, *amount, *duration).map(|_| ()),
            LockupInstruction::Withdraw { authority } => self.withdraw(ctx, authority).map(|_| ()),
        }
    }

    // -----------------------------------------------------------------------
    // initialize
    // -----------------------------------------------------------------------

    /// Create the vault of `authority` for `mint`, and the shared custodial
    /// token account if this is the first vault ever.
    ///
    /// # Errors
    ///
    /// - [`LockupError::Unauthorized`] if `authority` did not sign.
    /// - [`LockupError::NotFound`] if `mint` is not a mint.
    /// - [`LockupError::AlreadyInitialized`] on a second call.
    /// - [`LockupError::MintMismatch`] if custody already holds another mint.
    pub fn initialize(
        &self,
        ctx: &mut InvokeContext<'_>,
        authority: &Pubkey,
        mint: &Pubkey,
    ) -> Result<VaultAccount, LockupError> {
        require_signer(ctx, authority)?;
        if self.token.mint(ctx, mint)?.is_none() {
            return Err(LockupError::NotFound {
                what: "mint",
                key: *mint,
            });
        }

        let vault = self.store.create(ctx, authority, authority, mint)?;
        self.ensure_custody(ctx, authority, mint)?;

        ctx.log(format!("initialize vault authority={authority} mint={mint}"));
        tracing::debug!(%authority, %mint, "vault initialized");
        Ok(vault)
    }

    /// Open the custodial token account on first use, or check that the
    /// existing one holds `mint`.
    ///
    /// The account is its own owner: only a caller that can re-derive it
    /// from `[b"vault", bump]` under this program id can move funds out.
    fn ensure_custody(
        &self,
        ctx: &mut InvokeContext<'_>,
        payer: &Pubkey,
        mint: &Pubkey,
    ) -> Result<Pubkey, LockupError> {
        let (custody, _) = self.store.custody_address()?;
        match self.token.account(ctx, &custody)? {
            Some(existing) if existing.mint != *mint => Err(LockupError::MintMismatch {
                expected: existing.mint,
                found: *mint,
            }),
            Some(_) => Ok(custody),
            None => {
                self.token.open_account(ctx, payer, &custody, mint, &custody)?;
                ctx.log(format!("open custody account {custody}"));
                Ok(custody)
            }
        }
    }

    // -----------------------------------------------------------------------
    // deposit
    // -----------------------------------------------------------------------

    /// Move `amount` from the authority's associated token account into
    /// custody and lock it for `duration` seconds from now.
    ///
    /// A deposit replaces the previous lock outright: `locked_amount`
    /// becomes `amount` and the timer restarts, even if tokens from an
    /// earlier deposit are still held.
    pub fn deposit(
        &self,
        ctx: &mut InvokeContext<'_>,
        authority: &Pubkey,
        amount: u64,
        duration: u64,
    ) -> Result<VaultAccount, LockupError> {
        require_signer(ctx, authority)?;
        if amount == 0 {
            return Err(LockupError::InvalidAmount);
        }
        let mut vault = self.store.read(ctx, authority)?;

        let source = associated_token_address(authority, &vault.mint)?;
        let available = self
            .token
            .account(ctx, &source)?
            .map(|account| account.amount)
            .unwrap_or(0);
        if available < amount {
            return Err(LockupError::InsufficientBalance {
                requested: amount,
                available,
            });
        }

        let now = self.clock.unix_timestamp();
        let unlock_time = now.checked_add(duration).ok_or(LockupError::Overflow {
            start: now,
            duration,
        })?;

        if vault.locked_amount > 0 {
            tracing::warn!(
                %authority,
                previous = vault.locked_amount,
                new = amount,
                "deposit overwrites an existing lock"
            );
            ctx.log(format!(
                "overwriting lock of {} (unlock at {})",
                vault.locked_amount, vault.unlock_time
            ));
        }

        let (custody, _) = self.store.custody_address()?;
        self.token.transfer(ctx, &source, &custody, authority, amount)?;

        vault.locked_amount = amount;
        vault.start_time = now;
        vault.unlock_time = unlock_time;
        self.store.update(ctx, &vault)?;

        ctx.log(format!("current time: {now}"));
        ctx.log(format!("deposit {amount} locked until {unlock_time}"));
        tracing::debug!(%authority, amount, unlock_time, "deposit locked");
        Ok(vault)
    }

    // -----------------------------------------------------------------------
    // withdraw
    // -----------------------------------------------------------------------

    /// Return the full locked amount to the authority's associated token
    /// account. Allowed once `now >= unlock_time`.
    ///
    /// Returns the amount withdrawn.
    pub fn withdraw(&self, ctx: &mut InvokeContext<'_>, authority: &Pubkey) -> Result<u64, LockupError> {
        require_signer(ctx, authority)?;
        let mut vault = self.store.read(ctx, authority)?;

        let now = self.clock.unix_timestamp();
        if vault.is_locked_at(now) {
            return Err(LockupError::StillLocked {
                now,
                unlock_time: vault.unlock_time,
            });
        }
        if vault.locked_amount == 0 {
            return Err(LockupError::NothingLocked {
                authority: *authority,
            });
        }

        let amount = vault.locked_amount;
        let destination = associated_token_address(authority, &vault.mint)?;
        let (custody, bump) = self.store.custody_address()?;
        let program_id = *self.program_id();
        ctx.invoke_signed(&[VAULT_SEED, &[bump]], &program_id, |ctx| {
            self.token.transfer(ctx, &custody, &destination, &custody, amount)
        })??;

        vault.locked_amount = 0;
        self.store.update(ctx, &vault)?;

        ctx.log(format!("withdraw {amount} to {destination}"));
        tracing::debug!(%authority, amount, "withdraw complete");
        Ok(amount)
    }
}

fn require_signer(ctx: &InvokeContext<'_>, authority: &Pubkey) -> Result<(), LockupError> {
    if ctx.is_signer(authority) {
        Ok(())
    } else {
        Err(LockupError::Unauthorized(*authority))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
