//! # LedgerDB — Persistent Storage Engine
//!
//! The persistence layer for the Lockup ledger, built on sled's embedded
//! key-value store.
//!
//! ## Tree Layout
//!
//! | Tree           | Key                  | Value                        |
//! |----------------|----------------------|------------------------------|
//! | `accounts`     | address (32B)        | `bincode(Account)`           |
//! | `transactions` | tx id (hex, UTF-8)   | `bincode(TransactionRecord)` |
//!
//! ## Atomicity
//!
//! A processed transaction writes every account it modified *and* its own
//! record in one multi-tree sled transaction. Either the whole state
//! transition lands or none of it does, and a transaction id is never
//! marked processed without its effects (or vice versa).

use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, Transactional, Tree};
use std::path::Path;

use super::account::Account;
use crate::crypto::keys::Pubkey;
use crate::runtime::transaction::TransactionRecord;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("account data is not a {expected}")]
    UnexpectedAccountType { expected: &'static str },

    #[error("storage transaction aborted: {0}")]
    Aborted(String),
}

pub type DbResult<T> = Result<T, DbError>;

fn encode<T: serde::Serialize>(value: &T) -> DbResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| DbError::Serialization(e.to_string()))
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> DbResult<T> {
    bincode::deserialize(bytes).map_err(|e| DbError::Serialization(e.to_string()))
}

// ---------------------------------------------------------------------------
// LedgerDB
// ---------------------------------------------------------------------------

/// Persistent account store.
///
/// Cheap to clone: sled handles are reference-counted, and all clones see
/// the same data. sled supports lock-free concurrent reads; write
/// *ordering* between transactions is the runtime's job, not this type's.
#[derive(Debug, Clone)]
pub struct LedgerDB {
    db: Db,
    accounts: Tree,
    transactions: Tree,
}

impl LedgerDB {
    /// Open or create a database at the given directory.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// A throwaway database, removed when the last handle is dropped.
    pub fn open_temporary() -> DbResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> DbResult<Self> {
        let accounts = db.open_tree("accounts")?;
        let transactions = db.open_tree("transactions")?;
        Ok(Self {
            db,
            accounts,
            transactions,
        })
    }

    // -- Account operations -------------------------------------------------

    /// Fetch an account. `None` if the address has never been written.
    pub fn get_account(&self, address: &Pubkey) -> DbResult<Option<Account>> {
        match self.accounts.get(address.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Write a single account outside of any transaction.
    ///
    /// Only the faucet and test fixtures use this. Program effects always
    /// go through [`LedgerDB::commit`].
    pub fn put_account(&self, address: &Pubkey, account: &Account) -> DbResult<()> {
        self.accounts.insert(address.as_bytes(), encode(account)?)?;
        Ok(())
    }

    // -- Transaction operations ---------------------------------------------

    /// Atomically persist a transaction's account writes and its record.
    pub fn commit(&self, writes: &[(Pubkey, Account)], record: &TransactionRecord) -> DbResult<()> {
        // Encode up front: the closure below may run more than once.
        let encoded: Vec<([u8; 32], Vec<u8>)> = writes
            .iter()
            .map(|(address, account)| Ok((address.to_bytes(), encode(account)?)))
            .collect::<DbResult<_>>()?;
        let record_bytes = encode(record)?;

        (&self.accounts, &self.transactions)
            .transaction(|(accounts, transactions)| {
                for (address, bytes) in &encoded {
                    accounts.insert(&address[..], bytes.as_slice())?;
                }
                transactions.insert(record.id.as_bytes(), record_bytes.as_slice())?;
                Ok::<(), ConflictableTransactionError<()>>(())
            })
            .map_err(|e| match e {
                TransactionError::Storage(err) => DbError::Sled(err),
                TransactionError::Abort(()) => DbError::Aborted(record.id.clone()),
            })?;

        self.db.flush()?;
        Ok(())
    }

    /// Whether a transaction id has already been committed.
    pub fn has_transaction(&self, id: &str) -> DbResult<bool> {
        Ok(self.transactions.contains_key(id.as_bytes())?)
    }

    /// Block until all pending writes are durable.
    pub fn flush(&self) -> DbResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
