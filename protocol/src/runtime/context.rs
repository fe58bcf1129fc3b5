//! The working set of a single transaction.
//!
//! Programs never touch [`LedgerDB`] directly. They read and write through
//! an [`InvokeContext`], which loads accounts lazily, keeps every write in
//! memory and only hands the modified set back to the runtime once all
//! instructions have succeeded. Dropping a context discards its writes.

use std::collections::{BTreeMap, BTreeSet};

use crate::crypto::keys::Pubkey;
use crate::crypto::pda::{create_program_address, PdaError};
use crate::storage::{Account, DbResult, LedgerDB};

pub struct InvokeContext<'a> {
    db: &'a LedgerDB,
    /// Everything read or written so far. `None` caches a known-missing
    /// address so repeated lookups don't go back to sled.
    cache: BTreeMap<Pubkey, Option<Account>>,
    modified: BTreeSet<Pubkey>,
    signers: BTreeSet<Pubkey>,
    logs: Vec<String>,
}

impl<'a> InvokeContext<'a> {
    /// A fresh context whose signer set is `signers`.
    pub fn new(db: &'a LedgerDB, signers: impl IntoIterator<Item = Pubkey>) -> Self {
        Self {
            db,
            cache: BTreeMap::new(),
            modified: BTreeSet::new(),
            signers: signers.into_iter().collect(),
            logs: Vec::new(),
        }
    }

    pub fn is_signer(&self, key: &Pubkey) -> bool {
        self.signers.contains(key)
    }

    /// Current view of an account, including this transaction's own writes.
    pub fn get(&mut self, address: &Pubkey) -> DbResult<Option<Account>> {
        if let Some(cached) = self.cache.get(address) {
            return Ok(cached.clone());
        }
        let loaded = self.db.get_account(address)?;
        self.cache.insert(*address, loaded.clone());
        Ok(loaded)
    }

    /// Stage a write. Nothing reaches storage until the runtime commits.
    pub fn store(&mut self, address: Pubkey, account: Account) {
        self.cache.insert(address, Some(account));
        self.modified.insert(address);
    }

    /// Append a program log line.
    pub fn log(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::debug!(target: "lockup::program", "{line}");
        self.logs.push(line);
    }

    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    /// Run `f` with the address derived from `seeds` under `program_id`
    /// counted as a signer.
    ///
    /// This is how a program authorizes moves out of accounts owned by its
    /// own derived addresses. The extra signer is removed again when `f`
    /// returns, so it never leaks into later instructions.
    pub fn invoke_signed<R>(
        &mut self,
        seeds: &[&[u8]],
        program_id: &Pubkey,
        f: impl FnOnce(&mut Self) -> R,
    ) -> Result<R, PdaError> {
        let signer = create_program_address(seeds, program_id)?;
        let added = self.signers.insert(signer);
        let result = f(self);
        if added {
            self.signers.remove(&signer);
        }
        Ok(result)
    }

    /// Consume the context, yielding the modified accounts in address order
    /// and the collected logs.
    pub fn into_parts(mut self) -> (Vec<(Pubkey, Account)>, Vec<String>) {
        let writes = self
            .modified
            .iter()
            .filter_map(|address| {
                self.cache
                    .remove(address)
                    .flatten()
                    .map(|account| (*address, account))
            })
            .collect();
        (writes, self.logs)
    }

    /// Write staged accounts straight to storage, skipping the runtime.
    #[cfg(test)]
    pub(crate) fn commit_for_test(self) {
        let db = self.db;
        let (writes, _) = self.into_parts();
        for (address, account) in writes {
            db.put_account(&address, &account).unwrap();
        }
    }
}
