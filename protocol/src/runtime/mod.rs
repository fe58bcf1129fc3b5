//! # Runtime — Transaction Processing
//!
//! Turns signed [`Transaction`]s into committed state. The pipeline, in
//! order of increasing cost:
//!
//! 1. **Shape** — at least one instruction, one signature per signer.
//! 2. **Signatures** — every signer's Ed25519 signature over the message.
//! 3. **Write lock** — one writer at a time from here until commit.
//! 4. **Replay** — a transaction id that was already committed is rejected.
//! 5. **Execute** — each instruction runs against the same
//!    [`InvokeContext`], routed to its program.
//! 6. **Commit** — modified accounts and the [`TransactionRecord`] are
//!    written in one sled transaction.
//!
//! If any instruction fails the context is dropped and storage is exactly
//! as it was. The error carries the program logs; the last line is always
//! `Program <id> failed: custom program error: 0x…`.
//!
//! ```text
//! context.rs     — InvokeContext: per-transaction working set + signer set
//! transaction.rs — Instruction, Message, Transaction, TransactionRecord
//! ```

pub mod context;
pub mod transaction;

pub use context::InvokeContext;
pub use transaction::{Instruction, Message, Transaction, TransactionRecord};

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::clock::Clock;
use crate::config::{program_name, TOKEN_PROGRAM_ID};
use crate::crypto::keys::Pubkey;
use crate::storage::{Account, DbError, LedgerDB};
use crate::system::{self, SystemError};
use crate::token::{TokenAccount, TokenError, TokenProgram};
use crate::vault::{LockupError, LockupProgram, VaultAccount};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// The failure of a single instruction, tagged by the program that raised it.
#[derive(Debug, Error)]
pub enum InstructionError {
    #[error(transparent)]
    System(#[from] SystemError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Lockup(#[from] LockupError),
}

impl InstructionError {
    /// The program's stable numeric error code.
    pub fn code(&self) -> u32 {
        match self {
            InstructionError::System(e) => e.code(),
            InstructionError::Token(e) => e.code(),
            InstructionError::Lockup(e) => e.code(),
        }
    }
}

/// Why a transaction was not applied.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("transaction has no instructions")]
    EmptyTransaction,

    #[error("expected {expected} signatures, got {got}")]
    MissingSignature { expected: usize, got: usize },

    #[error("signature verification failed for {0}")]
    InvalidSignature(Pubkey),

    #[error("transaction {0} has already been processed")]
    AlreadyProcessed(String),

    #[error("instruction {index} failed: custom program error: {code:#x}: {error}")]
    InstructionFailed {
        index: usize,
        code: u32,
        error: InstructionError,
        logs: Vec<String>,
    },

    #[error("lamport balance overflow for {0}")]
    Overflow(Pubkey),

    #[error(transparent)]
    Storage(#[from] DbError),
}

impl RuntimeError {
    /// Program logs of a failed instruction. Empty for failures that
    /// happened before execution.
    pub fn logs(&self) -> &[String] {
        match self {
            RuntimeError::InstructionFailed { logs, .. } => logs,
            _ => &[],
        }
    }

    /// The program error code, if an instruction failed.
    pub fn custom_code(&self) -> Option<u32> {
        match self {
            RuntimeError::InstructionFailed { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// The lockup error, if the lockup program is what failed.
    pub fn lockup_error(&self) -> Option<&LockupError> {
        match self {
            RuntimeError::InstructionFailed {
                error: InstructionError::Lockup(e),
                ..
            } => Some(e),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Runtime
// ---------------------------------------------------------------------------

/// The ledger: storage, the three programs and the clock they share.
///
/// `Runtime` is `Sync`; share it behind an `Arc` and call
/// [`Runtime::process`] from as many threads as you like. Writers are
/// serialized internally, readers are not blocked.
pub struct Runtime {
    db: LedgerDB,
    clock: Arc<dyn Clock>,
    token: TokenProgram,
    lockup: LockupProgram,
    write_lock: Mutex<()>,
}

impl Runtime {
    pub fn new(db: LedgerDB, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            lockup: LockupProgram::new(Arc::clone(&clock)),
            clock,
            token: TokenProgram,
            write_lock: Mutex::new(()),
        }
    }

    pub fn db(&self) -> &LedgerDB {
        &self.db
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn lockup(&self) -> &LockupProgram {
        &self.lockup
    }

    /// Verify, execute and atomically commit one transaction.
    pub fn process(&self, tx: &Transaction) -> Result<TransactionRecord, RuntimeError> {
        let message = &tx.message;
        if message.instructions.is_empty() {
            return Err(RuntimeError::EmptyTransaction);
        }
        if tx.signatures.len() != message.signers.len() {
            return Err(RuntimeError::MissingSignature {
                expected: message.signers.len(),
                got: tx.signatures.len(),
            });
        }
        let bytes = message.signable_bytes();
        for (signer, signature) in message.signers.iter().zip(&tx.signatures) {
            if !signer.verify(&bytes, signature) {
                return Err(RuntimeError::InvalidSignature(*signer));
            }
        }

        let id = message.id();
        let _guard = self.write_lock.lock();
        if self.db.has_transaction(&id)? {
            return Err(RuntimeError::AlreadyProcessed(id));
        }

        let mut ctx = InvokeContext::new(&self.db, message.signers.iter().copied());
        for (index, instruction) in message.instructions.iter().enumerate() {
            let program_id = instruction.program_id();
            ctx.log(format!("Program {program_id} invoke [1]"));

            if let Err(error) = self.execute(&mut ctx, instruction) {
                let code = error.code();
                ctx.log(format!("Program {program_id} failed: custom program error: {code:#x}"));
                let (_, logs) = ctx.into_parts();
                tracing::warn!(
                    tx = %id,
                    index,
                    program = program_name(&program_id).unwrap_or("unknown"),
                    code = %format!("{code:#x}"),
                    %error,
                    "instruction failed, transaction rolled back"
                );
                return Err(RuntimeError::InstructionFailed {
                    index,
                    code,
                    error,
                    logs,
                });
            }
            ctx.log(format!("Program {program_id} success"));
        }

        let (writes, logs) = ctx.into_parts();
        let record = TransactionRecord {
            id,
            signers: message.signers.clone(),
            instruction_count: message.instructions.len(),
            processed_at: self.clock.unix_timestamp(),
            logs,
        };
        self.db.commit(&writes, &record)?;

        tracing::debug!(
            tx = %record.id,
            accounts = writes.len(),
            instructions = record.instruction_count,
            "transaction committed"
        );
        Ok(record)
    }

    fn execute(
        &self,
        ctx: &mut InvokeContext<'_>,
        instruction: &Instruction,
    ) -> Result<(), InstructionError> {
        match instruction {
            Instruction::System(ix) => system::process(ctx, ix)?,
            Instruction::Token(ix) => self.token.process(ctx, ix)?,
            Instruction::Lockup(ix) => self.lockup.process(ctx, ix)?,
        }
        Ok(())
    }

    /// Faucet: credit `lamports` to `to`, creating a system account if
    /// needed. Returns the new balance. Not a transaction; there is no
    /// signer and no record.
    pub fn airdrop(&self, to: &Pubkey, lamports: u64) -> Result<u64, RuntimeError> {
        let _guard = self.write_lock.lock();
        let mut account = self
            .db
            .get_account(to)?
            .unwrap_or_else(|| Account::new(0, crate::config::SYSTEM_PROGRAM_ID));
        account.lamports = account
            .lamports
            .checked_add(lamports)
            .ok_or(RuntimeError::Overflow(*to))?;
        self.db.put_account(to, &account)?;
        self.db.flush()?;

        tracing::info!(%to, lamports, balance = account.lamports, "airdrop");
        Ok(account.lamports)
    }

    // -- Reads ----------------------------------------------------------------

    pub fn account(&self, address: &Pubkey) -> Result<Option<Account>, RuntimeError> {
        Ok(self.db.get_account(address)?)
    }

    /// Native balance, zero for an address that was never written.
    pub fn lamports(&self, address: &Pubkey) -> Result<u64, RuntimeError> {
        Ok(self.account(address)?.map(|a| a.lamports).unwrap_or(0))
    }

    /// The token account at `address`, `None` if there is none.
    pub fn token_account(&self, address: &Pubkey) -> Result<Option<TokenAccount>, RuntimeError> {
        match self.account(address)? {
            Some(account) if account.owner == TOKEN_PROGRAM_ID && account.holds::<TokenAccount>() => {
                Ok(Some(account.state()?))
            }
            _ => Ok(None),
        }
    }

    /// Token balance at `address`, zero if no token account lives there.
    pub fn token_balance(&self, address: &Pubkey) -> Result<u64, RuntimeError> {
        Ok(self.token_account(address)?.map(|t| t.amount).unwrap_or(0))
    }

    pub fn vault(&self, authority: &Pubkey) -> Result<Option<VaultAccount>, LockupError> {
        self.lockup.store().load(&self.db, authority)
    }

    /// Address of the shared custodial token account.
    pub fn custody(&self) -> Result<Pubkey, LockupError> {
        Ok(self.lockup.store().custody_address()?.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::{LAMPORTS_PER_NATIVE, SYSTEM_PROGRAM_ID};
    use crate::crypto::keys::Keypair;
    use crate::system::SystemInstruction;
    use crate::vault::LockupInstruction;

    fn runtime() -> Runtime {
        Runtime::new(
            LedgerDB::open_temporary().unwrap(),
            Arc::new(ManualClock::new(1_700_000_000)),
        )
    }

    fn transfer(from: &Keypair, to: Pubkey, lamports: u64) -> Transaction {
        let message = Message::new(
            vec![from.pubkey()],
            vec![SystemInstruction::Transfer {
                from: from.pubkey(),
                to,
                lamports,
            }
            .into()],
        );
        Transaction::new(message, &[from])
    }

    #[test]
    fn airdrop_creates_and_tops_up() {
        let rt = runtime();
        let key = Keypair::generate().pubkey();
        assert_eq!(rt.airdrop(&key, 5).unwrap(), 5);
        assert_eq!(rt.airdrop(&key, 7).unwrap(), 12);
        assert_eq!(rt.account(&key).unwrap().unwrap().owner, SYSTEM_PROGRAM_ID);
    }

    #[test]
    fn airdrop_overflow_rejected() {
        let rt = runtime();
        let key = Keypair::generate().pubkey();
        rt.airdrop(&key, u64::MAX).unwrap();
        assert!(matches!(rt.airdrop(&key, 1), Err(RuntimeError::Overflow(_))));
    }

    #[test]
    fn system_transfer_commits() {
        let rt = runtime();
        let alice = Keypair::generate();
        let bob = Keypair::generate().pubkey();
        rt.airdrop(&alice.pubkey(), LAMPORTS_PER_NATIVE).unwrap();

        let record = rt.process(&transfer(&alice, bob, 1_000)).unwrap();
        assert_eq!(rt.lamports(&bob).unwrap(), 1_000);
        assert_eq!(rt.lamports(&alice.pubkey()).unwrap(), LAMPORTS_PER_NATIVE - 1_000);
        assert!(rt.db().has_transaction(&record.id).unwrap());
        assert!(record.logs.last().unwrap().ends_with("success"));
    }

    #[test]
    fn empty_transaction_rejected() {
        let rt = runtime();
        let kp = Keypair::generate();
        let tx = Transaction::new(Message::new(vec![kp.pubkey()], vec![]), &[&kp]);
        assert!(matches!(rt.process(&tx), Err(RuntimeError::EmptyTransaction)));
    }

    #[test]
    fn tampered_message_fails_signature_check() {
        let rt = runtime();
        let alice = Keypair::generate();
        rt.airdrop(&alice.pubkey(), 10_000).unwrap();
        let mut tx = transfer(&alice, Pubkey::default(), 1);
        tx.message.nonce = tx.message.nonce.wrapping_add(1);

        assert!(matches!(
            rt.process(&tx),
            Err(RuntimeError::InvalidSignature(k)) if k == alice.pubkey()
        ));
    }

    #[test]
    fn missing_signature_rejected() {
        let rt = runtime();
        let alice = Keypair::generate();
        let bob = Keypair::generate();
        let message = Message::new(
            vec![alice.pubkey(), bob.pubkey()],
            vec![LockupInstruction::Withdraw {
                authority: alice.pubkey(),
            }
            .into()],
        );
        let tx = Transaction::new(message, &[&alice]);
        assert!(matches!(
            rt.process(&tx),
            Err(RuntimeError::MissingSignature { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn duplicate_transaction_rejected() {
        let rt = runtime();
        let alice = Keypair::generate();
        rt.airdrop(&alice.pubkey(), 10_000).unwrap();
        let tx = transfer(&alice, Pubkey::default(), 1);

        rt.process(&tx).unwrap();
        assert!(matches!(rt.process(&tx), Err(RuntimeError::AlreadyProcessed(_))));
        assert_eq!(rt.lamports(&alice.pubkey()).unwrap(), 9_999);
    }

    #[test]
    fn failed_instruction_rolls_back_earlier_ones() {
        let rt = runtime();
        let alice = Keypair::generate();
        let bob = Keypair::generate().pubkey();
        rt.airdrop(&alice.pubkey(), 100).unwrap();

        let message = Message::new(
            vec![alice.pubkey()],
            vec![
                SystemInstruction::Transfer {
                    from: alice.pubkey(),
                    to: bob,
                    lamports: 60,
                }
                .into(),
                SystemInstruction::Transfer {
                    from: alice.pubkey(),
                    to: bob,
                    lamports: 60,
                }
                .into(),
            ],
        );
        let tx = Transaction::new(message, &[&alice]);
        let err = rt.process(&tx).unwrap_err();

        assert!(matches!(err, RuntimeError::InstructionFailed { index: 1, .. }));
        assert_eq!(err.custom_code(), Some(0x81));
        assert!(err
            .logs()
            .last()
            .unwrap()
            .contains("custom program error: 0x81"));
        assert_eq!(rt.lamports(&alice.pubkey()).unwrap(), 100);
        assert_eq!(rt.lamports(&bob).unwrap(), 0);
        assert!(!rt.db().has_transaction(&tx.id()).unwrap());
    }

    #[test]
    fn lockup_error_is_exposed() {
        let rt = runtime();
        let alice = Keypair::generate();
        let message = Message::new(
            vec![alice.pubkey()],
            vec![LockupInstruction::Withdraw {
                authority: alice.pubkey(),
            }
            .into()],
        );
        let err = rt.process(&Transaction::new(message, &[&alice])).unwrap_err();
        assert!(matches!(
            err.lockup_error(),
            Some(LockupError::NotFound { what: "vault", .. })
        ));
        assert_eq!(err.custom_code(), Some(0x194));
    }
}
