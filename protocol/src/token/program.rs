//! Token instruction processing.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::state::{associated_token_address, Mint, TokenAccount};
use super::TokenTransfer;
use crate::config::{TOKEN_ERROR_BASE, TOKEN_PROGRAM_ID};
use crate::crypto::keys::Pubkey;
use crate::crypto::pda::PdaError;
use crate::runtime::context::InvokeContext;
use crate::storage::DbError;
use crate::system::{self, SystemError};

/// Instructions understood by the token program.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenInstruction {
    /// Create a mint at `mint`. The mint key must sign.
    InitializeMint {
        payer: Pubkey,
        mint: Pubkey,
        mint_authority: Pubkey,
        decimals: u8,
    },
    /// Create the associated token account of `owner` for `mint`.
    CreateAssociatedAccount {
        payer: Pubkey,
        owner: Pubkey,
        mint: Pubkey,
    },
    /// Mint new supply into `destination`. The mint authority must sign.
    MintTo {
        mint: Pubkey,
        destination: Pubkey,
        authority: Pubkey,
        amount: u64,
    },
    /// Move tokens. `authority` must own `source` and sign.
    Transfer {
        source: Pubkey,
        destination: Pubkey,
        authority: Pubkey,
        amount: u64,
    },
}

/// Errors raised by the token program.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token account {0} not found")]
    AccountNotFound(Pubkey),

    #[error("mint {0} not found")]
    MintNotFound(Pubkey),

    #[error("account {0} is not a token program account of the expected kind")]
    InvalidAccount(Pubkey),

    #[error("mint mismatch: expected {expected}, found {found}")]
    MintMismatch { expected: Pubkey, found: Pubkey },

    #[error("{authority} is not the owner of the source account (owner is {owner})")]
    OwnerMismatch { owner: Pubkey, authority: Pubkey },

    #[error("missing required signature for {0}")]
    MissingSigner(Pubkey),

    #[error("insufficient funds: needed {needed}, available {available}")]
    InsufficientFunds { needed: u64, available: u64 },

    #[error("token arithmetic overflow")]
    Overflow,

    #[error(transparent)]
    System(#[from] SystemError),

    #[error("address derivation failed: {0}")]
    Derivation(#[from] PdaError),

    #[error(transparent)]
    Storage(#[from] DbError),
}

impl TokenError {
    /// Stable numeric code. System failures keep the system program's code.
    pub fn code(&self) -> u32 {
        let offset = match self {
            TokenError::AccountNotFound(_) => 0,
            TokenError::MintNotFound(_) => 1,
            TokenError::InvalidAccount(_) => 2,
            TokenError::MintMismatch { .. } => 3,
            TokenError::OwnerMismatch { .. } => 4,
            TokenError::MissingSigner(_) => 5,
            TokenError::InsufficientFunds { .. } => 6,
            TokenError::Overflow => 7,
            TokenError::Derivation(_) => 8,
            TokenError::Storage(_) => 0x0F,
            TokenError::System(inner) => return inner.code(),
        };
        TOKEN_ERROR_BASE + offset
    }
}

/// The ledger's token program.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenProgram;

impl TokenProgram {
    /// Execute one token instruction.
    pub fn process(
        &self,
        ctx: &mut InvokeContext<'_>,
        instruction: &TokenInstruction,
    ) -> Result<(), TokenError> {
        match instruction {
            TokenInstruction::InitializeMint {
                payer,
                mint,
                mint_authority,
                decimals,
            } => self.initialize_mint(ctx, payer, mint, mint_authority, *decimals),
            TokenInstruction::CreateAssociatedAccount { payer, owner, mint } => self
                .create_associated_account(ctx, payer, owner, mint)
                .map(|_| ()),
            TokenInstruction::MintTo {
                mint,
                destination,
                authority,
                amount,
            } => self.mint_to(ctx, mint, destination, authority, *amount),
            TokenInstruction::Transfer {
                source,
                destination,
                authority,
                amount,
            } => self.transfer(ctx, source, destination, authority, *amount),
        }
    }

    pub fn initialize_mint(
        &self,
        ctx: &mut InvokeContext<'_>,
        payer: &Pubkey,
        mint: &Pubkey,
        mint_authority: &Pubkey,
        decimals: u8,
    ) -> Result<(), TokenError> {
        // A mint lives at a plain keypair address: holding that key is the
        // proof of the right to create it.
        if !ctx.is_signer(mint) {
            return Err(TokenError::MissingSigner(*mint));
        }
        let state = Mint {
            mint_authority: *mint_authority,
            supply: 0,
            decimals,
        };
        system::create_account(ctx, payer, mint, &TOKEN_PROGRAM_ID, &state)?;
        ctx.log(format!("initialize mint {mint} (decimals={decimals})"));
        Ok(())
    }

    /// Create `owner`'s associated account for `mint` and return its address.
    pub fn create_associated_account(
        &self,
        ctx: &mut InvokeContext<'_>,
        payer: &Pubkey,
        owner: &Pubkey,
        mint: &Pubkey,
    ) -> Result<Pubkey, TokenError> {
        let address = associated_token_address(owner, mint)?;
        self.open_account(ctx, payer, &address, mint, owner)?;
        Ok(address)
    }

    pub fn mint_to(
        &self,
        ctx: &mut InvokeContext<'_>,
        mint: &Pubkey,
        destination: &Pubkey,
        authority: &Pubkey,
        amount: u64,
    ) -> Result<(), TokenError> {
        let mut mint_state = load_mint(ctx, mint)?.ok_or(TokenError::MintNotFound(*mint))?;
        if mint_state.mint_authority != *authority {
            return Err(TokenError::OwnerMismatch {
                owner: mint_state.mint_authority,
                authority: *authority,
            });
        }
        if !ctx.is_signer(authority) {
            return Err(TokenError::MissingSigner(*authority));
        }

        let mut target =
            load_token_account(ctx, destination)?.ok_or(TokenError::AccountNotFound(*destination))?;
        if target.mint != *mint {
            return Err(TokenError::MintMismatch {
                expected: *mint,
                found: target.mint,
            });
        }

        mint_state.supply = mint_state
            .supply
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        target.amount = target.amount.checked_add(amount).ok_or(TokenError::Overflow)?;

        save(ctx, mint, &mint_state)?;
        save(ctx, destination, &target)?;
        ctx.log(format!("mint {amount} to {destination}"));
        Ok(())
    }
}

impl TokenTransfer for TokenProgram {
    fn transfer(
        &self,
        ctx: &mut InvokeContext<'_>,
        source: &Pubkey,
        destination: &Pubkey,
        authority: &Pubkey,
        amount: u64,
    ) -> Result<(), TokenError> {
        let mut from = load_token_account(ctx, source)?.ok_or(TokenError::AccountNotFound(*source))?;
        if from.owner != *authority {
            return Err(TokenError::OwnerMismatch {
                owner: from.owner,
                authority: *authority,
            });
        }
        if !ctx.is_signer(authority) {
            return Err(TokenError::MissingSigner(*authority));
        }
        if from.amount < amount {
            return Err(TokenError::InsufficientFunds {
                needed: amount,
                available: from.amount,
            });
        }

        let mut to =
            load_token_account(ctx, destination)?.ok_or(TokenError::AccountNotFound(*destination))?;
        if to.mint != from.mint {
            return Err(TokenError::MintMismatch {
                expected: from.mint,
                found: to.mint,
            });
        }
        if source == destination {
            return Ok(());
        }

        from.amount -= amount;
        to.amount = to.amount.checked_add(amount).ok_or(TokenError::Overflow)?;
        save(ctx, source, &from)?;
        save(ctx, destination, &to)?;

        ctx.log(format!("transfer {amount} {source} -> {destination}"));
        Ok(())
    }

    fn open_account(
        &self,
        ctx: &mut InvokeContext<'_>,
        payer: &Pubkey,
        address: &Pubkey,
        mint: &Pubkey,
        owner: &Pubkey,
    ) -> Result<(), TokenError> {
        if load_mint(ctx, mint)?.is_none() {
            return Err(TokenError::MintNotFound(*mint));
        }
        let state = TokenAccount {
            mint: *mint,
            owner: *owner,
            amount: 0,
        };
        system::create_account(ctx, payer, address, &TOKEN_PROGRAM_ID, &state)?;
        Ok(())
    }

    fn account(
        &self,
        ctx: &mut InvokeContext<'_>,
        address: &Pubkey,
    ) -> Result<Option<TokenAccount>, TokenError> {
        load_token_account(ctx, address)
    }

    fn mint(&self, ctx: &mut InvokeContext<'_>, address: &Pubkey) -> Result<Option<Mint>, TokenError> {
        load_mint(ctx, address)
    }
}

fn load_token_account(
    ctx: &mut InvokeContext<'_>,
    address: &Pubkey,
) -> Result<Option<TokenAccount>, TokenError> {
    match ctx.get(address)? {
        None => Ok(None),
        Some(account) if system::is_unclaimed(&account) => Ok(None),
        Some(account) if account.owner == TOKEN_PROGRAM_ID && account.holds::<TokenAccount>() => {
            Ok(Some(account.state()?))
        }
        Some(_) => Err(TokenError::InvalidAccount(*address)),
    }
}

fn load_mint(ctx: &mut InvokeContext<'_>, address: &Pubkey) -> Result<Option<Mint>, TokenError> {
    match ctx.get(address)? {
        None => Ok(None),
        Some(account) if system::is_unclaimed(&account) => Ok(None),
        Some(account) if account.owner == TOKEN_PROGRAM_ID && account.holds::<Mint>() => {
            Ok(Some(account.state()?))
        }
        Some(_) => Err(TokenError::InvalidAccount(*address)),
    }
}

fn save<T: crate::storage::ProgramState>(
    ctx: &mut InvokeContext<'_>,
    address: &Pubkey,
    state: &T,
) -> Result<(), TokenError> {
    let mut account = ctx.get(address)?.ok_or(TokenError::AccountNotFound(*address))?;
    account.set_state(state)?;
    ctx.store(*address, account);
    Ok(())
}
