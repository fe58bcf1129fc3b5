//! Vault records and where they live.
//!
//! Nothing here keeps an index of vaults. A vault's address is recomputed
//! from `[b"vault", authority]` every time it is needed, and the shared
//! custodial token account from `[b"vault"]` alone.

use serde::{Deserialize, Serialize};

use super::error::LockupError;
use crate::config::VAULT_SEED;
use crate::crypto::keys::Pubkey;
use crate::crypto::pda::find_program_address;
use crate::runtime::context::InvokeContext;
use crate::storage::account::DISCRIMINATOR_LEN;
use crate::storage::{Account, LedgerDB, ProgramState};
use crate::system;

/// Per-authority lock bookkeeping. The tokens themselves sit in the shared
/// custodial account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultAccount {
    /// The only key allowed to deposit into or withdraw from this vault.
    pub authority: Pubkey,
    /// Token type accepted by the vault. Fixed at initialization.
    pub mint: Pubkey,
    /// Base units currently locked. Zero when idle.
    pub locked_amount: u64,
    /// Unix time of the last deposit, zero before the first one.
    pub start_time: u64,
    /// Withdrawal is allowed once `now >= unlock_time`.
    pub unlock_time: u64,
    /// Canonical bump of this record's derived address.
    pub bump: u8,
}

impl ProgramState for VaultAccount {
    const DISCRIMINATOR: [u8; DISCRIMINATOR_LEN] = *b"lk:vault";
    const NAME: &'static str = "VaultAccount";
}

impl VaultAccount {
    pub fn is_locked_at(&self, now: u64) -> bool {
        now < self.unlock_time
    }
}

/// Derives, creates, loads and rewrites [`VaultAccount`] records for one
/// program id.
#[derive(Debug, Clone, Copy)]
pub struct VaultStore {
    program_id: Pubkey,
}

impl VaultStore {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    /// The vault address of `authority` and its canonical bump.
    pub fn address(&self, authority: &Pubkey) -> Result<(Pubkey, u8), LockupError> {
        Ok(find_program_address(
            &[VAULT_SEED, authority.as_ref()],
            &self.program_id,
        )?)
    }

    /// The shared custodial token account and its canonical bump.
    pub fn custody_address(&self) -> Result<(Pubkey, u8), LockupError> {
        Ok(find_program_address(&[VAULT_SEED], &self.program_id)?)
    }

    /// Create an empty vault for `authority`, paid for by `payer`.
    ///
    /// Lamports sent to the vault address beforehand do not count as a
    /// vault: only an account of this program holding a [`VaultAccount`]
    /// makes this fail with `AlreadyInitialized`.
    pub fn create(
        &self,
        ctx: &mut InvokeContext<'_>,
        payer: &Pubkey,
        authority: &Pubkey,
        mint: &Pubkey,
    ) -> Result<VaultAccount, LockupError> {
        let (address, bump) = self.address(authority)?;
        if ctx.get(&address)?.is_some_and(|account| self.is_vault(&account)) {
            return Err(LockupError::AlreadyInitialized {
                authority: *authority,
            });
        }

        let vault = VaultAccount {
            authority: *authority,
            mint: *mint,
            locked_amount: 0,
            start_time: 0,
            unlock_time: 0,
            bump,
        };
        system::create_account(ctx, payer, &address, &self.program_id, &vault)?;
        Ok(vault)
    }

    /// Load the vault of `authority`.
    pub fn read(
        &self,
        ctx: &mut InvokeContext<'_>,
        authority: &Pubkey,
    ) -> Result<VaultAccount, LockupError> {
        let (address, _) = self.address(authority)?;
        let not_found = LockupError::NotFound {
            what: "vault",
            key: *authority,
        };
        match ctx.get(&address)? {
            Some(account) if self.is_vault(&account) => Ok(account.state()?),
            _ => Err(not_found),
        }
    }

    /// Overwrite the record at `vault.authority`'s address.
    pub fn update(
        &self,
        ctx: &mut InvokeContext<'_>,
        vault: &VaultAccount,
    ) -> Result<(), LockupError> {
        let (address, _) = self.address(&vault.authority)?;
        let mut account = ctx
            .get(&address)?
            .filter(|account| self.is_vault(account))
            .ok_or(LockupError::NotFound {
                what: "vault",
                key: vault.authority,
            })?;
        account.set_state(vault)?;
        ctx.store(address, account);
        Ok(())
    }

    /// Read a vault straight from committed storage, outside any
    /// transaction. `None` if the authority has no vault.
    pub fn load(&self, db: &LedgerDB, authority: &Pubkey) -> Result<Option<VaultAccount>, LockupError> {
        let (address, _) = self.address(authority)?;
        match db.get_account(&address)? {
            Some(account) if self.is_vault(&account) => Ok(Some(account.state()?)),
            _ => Ok(None),
        }
    }

    fn is_vault(&self, account: &Account) -> bool {
        account.owner == self.program_id && account.holds::<VaultAccount>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LOCKUP_PROGRAM_ID, SYSTEM_PROGRAM_ID, TOKEN_PROGRAM_ID};
    use crate::crypto::keys::Keypair;

    fn funded(db: &LedgerDB) -> Pubkey {
        let key = Keypair::generate().pubkey();
        db.put_account(&key, &Account::new(1_000_000_000, SYSTEM_PROGRAM_ID))
            .unwrap();
        key
    }

    #[test]
    fn vault_and_custody_addresses_differ() {
        let store = VaultStore::new(LOCKUP_PROGRAM_ID);
        let authority = Keypair::from_seed(&[9u8; 32]).pubkey();
        let (vault, _) = store.address(&authority).unwrap();
        let (custody, _) = store.custody_address().unwrap();
        assert_ne!(vault, custody);
    }

    #[test]
    fn addresses_depend_on_program_id() {
        let authority = Keypair::from_seed(&[9u8; 32]).pubkey();
        let a = VaultStore::new(LOCKUP_PROGRAM_ID).address(&authority).unwrap();
        let b = VaultStore::new(TOKEN_PROGRAM_ID).address(&authority).unwrap();
        assert_ne!(a.0, b.0);
    }

    #[test]
    fn create_then_read() {
        let db = LedgerDB::open_temporary().unwrap();
        let authority = funded(&db);
        let mint = Keypair::generate().pubkey();
        let store = VaultStore::new(LOCKUP_PROGRAM_ID);
        let mut ctx = InvokeContext::new(&db, [authority]);

        let created = store.create(&mut ctx, &authority, &authority, &mint).unwrap();
        let read = store.read(&mut ctx, &authority).unwrap();
        assert_eq!(created, read);
        assert_eq!(read.locked_amount, 0);
        assert_eq!(read.bump, store.address(&authority).unwrap().1);
    }

    #[test]
    fn create_twice_is_already_initialized() {
        let db = LedgerDB::open_temporary().unwrap();
        let authority = funded(&db);
        let mint = Keypair::generate().pubkey();
        let store = VaultStore::new(LOCKUP_PROGRAM_ID);
        let mut ctx = InvokeContext::new(&db, [authority]);

        store.create(&mut ctx, &authority, &authority, &mint).unwrap();
        let err = store.create(&mut ctx, &authority, &authority, &mint).unwrap_err();
        assert!(matches!(err, LockupError::AlreadyInitialized { .. }));
    }

    #[test]
    fn read_missing_is_not_found() {
        let db = LedgerDB::open_temporary().unwrap();
        let store = VaultStore::new(LOCKUP_PROGRAM_ID);
        let mut ctx = InvokeContext::new(&db, []);
        let err = store.read(&mut ctx, &Pubkey::default()).unwrap_err();
        assert!(matches!(err, LockupError::NotFound { what: "vault", .. }));
        assert!(store.load(&db, &Pubkey::default()).unwrap().is_none());
    }

    #[test]
    fn foreign_owned_account_is_not_a_vault() {
        let db = LedgerDB::open_temporary().unwrap();
        let store = VaultStore::new(LOCKUP_PROGRAM_ID);
        let authority = Keypair::generate().pubkey();
        let (address, _) = store.address(&authority).unwrap();
        db.put_account(&address, &Account::new(5, SYSTEM_PROGRAM_ID)).unwrap();

        let mut ctx = InvokeContext::new(&db, []);
        assert!(matches!(
            store.read(&mut ctx, &authority),
            Err(LockupError::NotFound { .. })
        ));
    }

    #[test]
    fn lamports_at_vault_address_do_not_block_create() {
        let db = LedgerDB::open_temporary().unwrap();
        let authority = funded(&db);
        let store = VaultStore::new(LOCKUP_PROGRAM_ID);
        let (address, _) = store.address(&authority).unwrap();
        db.put_account(&address, &Account::new(1, SYSTEM_PROGRAM_ID)).unwrap();
        assert!(store.load(&db, &authority).unwrap().is_none());

        let mut ctx = InvokeContext::new(&db, [authority]);
        let created = store.create(&mut ctx, &authority, &authority, &Pubkey::default()).unwrap();
        assert_eq!(store.read(&mut ctx, &authority).unwrap(), created);

        let account = ctx.get(&address).unwrap().unwrap();
        assert_eq!(account.owner, LOCKUP_PROGRAM_ID);
        assert_eq!(
            account.lamports,
            crate::config::rent_exempt_minimum(account.data.len())
        );
    }

    #[test]
    fn update_overwrites_record() {
        let db = LedgerDB::open_temporary().unwrap();
        let authority = funded(&db);
        let store = VaultStore::new(LOCKUP_PROGRAM_ID);
        let mut ctx = InvokeContext::new(&db, [authority]);
        let mut vault = store
            .create(&mut ctx, &authority, &authority, &Pubkey::default())
            .unwrap();

        vault.locked_amount = 42;
        vault.unlock_time = 100;
        store.update(&mut ctx, &vault).unwrap();
        ctx.commit_for_test();

        let stored = store.load(&db, &authority).unwrap().unwrap();
        assert_eq!(stored.locked_amount, 42);
        assert!(stored.is_locked_at(99));
        assert!(!stored.is_locked_at(100));
    }
}
