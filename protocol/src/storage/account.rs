//! Account records and typed program state.
//!
//! Program state is stored as an 8-byte discriminator followed by the
//! bincode encoding of the state struct. The discriminator stops a program
//! from misreading, say, a token account as a vault just because the bytes
//! happen to decode.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::db::DbError;
use crate::crypto::keys::Pubkey;

/// Length of the type tag at the front of every program-owned account.
pub const DISCRIMINATOR_LEN: usize = 8;

/// A single ledger account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Native balance in lamports.
    pub lamports: u64,
    /// The program allowed to modify `data` (and debit `lamports`).
    pub owner: Pubkey,
    /// Program-specific state, see [`ProgramState`].
    pub data: Vec<u8>,
}

impl Account {
    /// A data-less account owned by `owner`.
    pub fn new(lamports: u64, owner: Pubkey) -> Self {
        Self {
            lamports,
            owner,
            data: Vec::new(),
        }
    }

    /// Decode the account's data as `T`.
    pub fn state<T: ProgramState>(&self) -> Result<T, DbError> {
        T::unpack(&self.data)
    }

    /// Replace the account's data with the encoding of `state`.
    pub fn set_state<T: ProgramState>(&mut self, state: &T) -> Result<(), DbError> {
        self.data = state.pack()?;
        Ok(())
    }

    /// Whether the data carries `T`'s discriminator.
    pub fn holds<T: ProgramState>(&self) -> bool {
        self.data.len() >= DISCRIMINATOR_LEN && self.data[..DISCRIMINATOR_LEN] == T::DISCRIMINATOR
    }
}

/// State a program keeps inside an [`Account`].
pub trait ProgramState: Serialize + DeserializeOwned {
    /// Type tag written in front of the encoded state.
    const DISCRIMINATOR: [u8; DISCRIMINATOR_LEN];

    /// Human-readable name, for error messages.
    const NAME: &'static str;

    fn pack(&self) -> Result<Vec<u8>, DbError> {
        let mut out = Self::DISCRIMINATOR.to_vec();
        bincode::serialize_into(&mut out, self).map_err(|e| DbError::Serialization(e.to_string()))?;
        Ok(out)
    }

    fn unpack(data: &[u8]) -> Result<Self, DbError> {
        if data.len() < DISCRIMINATOR_LEN || data[..DISCRIMINATOR_LEN] != Self::DISCRIMINATOR {
            return Err(DbError::UnexpectedAccountType {
                expected: Self::NAME,
            });
        }
        bincode::deserialize(&data[DISCRIMINATOR_LEN..])
            .map_err(|e| DbError::Serialization(e.to_string()))
    }

    /// Encoded size including the discriminator. Drives rent.
    fn packed_len(&self) -> Result<usize, DbError> {
        let body = bincode::serialized_size(self).map_err(|e| DbError::Serialization(e.to_string()))?;
        Ok(DISCRIMINATOR_LEN + body as usize)
    }
}
