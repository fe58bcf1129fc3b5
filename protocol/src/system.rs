//! # System Program
//!
//! Native-currency plumbing: moving lamports between accounts and creating
//! new accounts funded with their rent-exempt minimum. Every other program
//! creates accounts through [`create_account`] so that rent is charged in
//! exactly one place.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{rent_exempt_minimum, SYSTEM_ERROR_BASE, SYSTEM_PROGRAM_ID};
use crate::crypto::keys::Pubkey;
use crate::runtime::context::InvokeContext;
use crate::storage::{Account, DbError, ProgramState};

/// Instructions understood by the system program.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemInstruction {
    /// Move lamports between two native accounts. `from` must sign.
    Transfer { from: Pubkey, to: Pubkey, lamports: u64 },
}

/// Errors raised by the system program.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error("account {0} already exists")]
    AccountAlreadyExists(Pubkey),

    #[error("account {account} has {available} lamports, needs {needed}")]
    InsufficientLamports {
        account: Pubkey,
        needed: u64,
        available: u64,
    },

    #[error("missing required signature for {0}")]
    MissingSigner(Pubkey),

    #[error("account {0} is not owned by the system program")]
    InvalidOwner(Pubkey),

    #[error("lamport arithmetic overflow")]
    Overflow,

    #[error(transparent)]
    Storage(#[from] DbError),
}

impl SystemError {
    /// Stable numeric code, reported as `custom program error: 0x..`.
    pub fn code(&self) -> u32 {
        SYSTEM_ERROR_BASE
            + match self {
                SystemError::AccountAlreadyExists(_) => 0,
                SystemError::InsufficientLamports { .. } => 1,
                SystemError::MissingSigner(_) => 2,
                SystemError::InvalidOwner(_) => 3,
                SystemError::Overflow => 4,
                SystemError::Storage(_) => 0x0F,
            }
    }
}

/// Execute one system instruction.
pub fn process(ctx: &mut InvokeContext<'_>, instruction: &SystemInstruction) -> Result<(), SystemError> {
    match instruction {
        SystemInstruction::Transfer { from, to, lamports } => transfer(ctx, from, to, *lamports),
    }
}

/// Move lamports from one system-owned account to another, creating the
/// recipient if it doesn't exist yet.
pub fn transfer(
    ctx: &mut InvokeContext<'_>,
    from: &Pubkey,
    to: &Pubkey,
    lamports: u64,
) -> Result<(), SystemError> {
    if !ctx.is_signer(from) {
        return Err(SystemError::MissingSigner(*from));
    }
    debit(ctx, from, lamports)?;

    let mut recipient = ctx
        .get(to)?
        .unwrap_or_else(|| Account::new(0, SYSTEM_PROGRAM_ID));
    recipient.lamports = recipient
        .lamports
        .checked_add(lamports)
        .ok_or(SystemError::Overflow)?;
    ctx.store(*to, recipient);

    ctx.log(format!("transfer {lamports} lamports {from} -> {to}"));
    Ok(())
}

/// Create a program-owned account at `address` holding `state`, funded by
/// `payer` up to the rent-exempt minimum for its size.
///
/// The caller is responsible for proving the right to create `address`:
/// either it is a derived address of `owner`, or its key signed.
///
/// Anyone can send lamports to an address before its owner program gets
/// there. An account that is still system-owned with no data is therefore
/// taken over: its lamports count towards rent and it is assigned to
/// `owner`. Only an account some program already claimed is "existing".
///
/// Returns the lamports `payer` moved into the account.
pub fn create_account<T: ProgramState>(
    ctx: &mut InvokeContext<'_>,
    payer: &Pubkey,
    address: &Pubkey,
    owner: &Pubkey,
    state: &T,
) -> Result<u64, SystemError> {
    if !ctx.is_signer(payer) {
        return Err(SystemError::MissingSigner(*payer));
    }
    let prefunded = match ctx.get(address)? {
        None => 0,
        Some(account) if is_unclaimed(&account) => account.lamports,
        Some(_) => return Err(SystemError::AccountAlreadyExists(*address)),
    };

    let rent = rent_exempt_minimum(state.packed_len()?);
    let top_up = rent.saturating_sub(prefunded);
    if top_up > 0 {
        debit(ctx, payer, top_up)?;
    }

    // Re-read: `payer` and `address` may be the same account.
    let mut account = ctx
        .get(address)?
        .unwrap_or_else(|| Account::new(0, SYSTEM_PROGRAM_ID));
    account.lamports = account
        .lamports
        .checked_add(top_up)
        .ok_or(SystemError::Overflow)?;
    account.owner = *owner;
    account.set_state(state)?;
    ctx.store(*address, account);

    ctx.log(format!("create {} account {address} ({top_up} lamports)", T::NAME));
    Ok(top_up)
}

/// A plain lamport holder: owned by the system program, no data. This is
/// what a transfer or airdrop to a fresh address leaves behind.
pub fn is_unclaimed(account: &Account) -> bool {
    account.owner == SYSTEM_PROGRAM_ID && account.data.is_empty()
}

fn debit(ctx: &mut InvokeContext<'_>, from: &Pubkey, lamports: u64) -> Result<(), SystemError> {
    let Some(mut account) = ctx.get(from)? else {
        return Err(SystemError::InsufficientLamports {
            account: *from,
            needed: lamports,
            available: 0,
        });
    };
    if account.owner != SYSTEM_PROGRAM_ID {
        return Err(SystemError::InvalidOwner(*from));
    }
    if account.lamports < lamports {
        return Err(SystemError::InsufficientLamports {
            account: *from,
            needed: lamports,
            available: account.lamports,
        });
    }
    account.lamports -= lamports;
    ctx.store(*from, account);
    Ok(())
}
