//! Token program state.

use serde::{Deserialize, Serialize};

use crate::config::{ASSOCIATED_TOKEN_PROGRAM_ID, TOKEN_PROGRAM_ID};
use crate::crypto::keys::Pubkey;
use crate::crypto::pda::{find_program_address, PdaError};
use crate::storage::account::DISCRIMINATOR_LEN;
use crate::storage::ProgramState;

/// A token type. All amounts are `u64` base units; `decimals` is display
/// metadata only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mint {
    /// The only key allowed to mint new supply.
    pub mint_authority: Pubkey,
    /// Total base units in existence.
    pub supply: u64,
    pub decimals: u8,
}

impl ProgramState for Mint {
    const DISCRIMINATOR: [u8; DISCRIMINATOR_LEN] = *b"tok:mint";
    const NAME: &'static str = "Mint";
}

/// A balance of one mint held by one owner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAccount {
    pub mint: Pubkey,
    /// The key that may transfer out of this account. For the vault's
    /// custodial account this is the account's own derived address.
    pub owner: Pubkey,
    pub amount: u64,
}

impl ProgramState for TokenAccount {
    const DISCRIMINATOR: [u8; DISCRIMINATOR_LEN] = *b"tok:acct";
    const NAME: &'static str = "TokenAccount";
}

/// The canonical token account of `owner` for `mint`.
///
/// Derived from `[owner, token_program_id, mint]` under the associated
/// token program, so wallets never need to remember where they keep a
/// given token.
pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey) -> Result<Pubkey, PdaError> {
    find_program_address(
        &[owner.as_ref(), TOKEN_PROGRAM_ID.as_ref(), mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
    .map(|(address, _)| address)
}
