//! End-to-end integration tests for the Lockup protocol.
//!
//! These tests drive the whole stack the way a client would: fund a key
//! from the faucet, create a mint and token accounts, then initialize,
//! deposit into and withdraw from a vault, all as signed transactions
//! through the runtime. Time moves only when a test moves the clock.
//!
//! Each test stands alone with its own temporary database. No shared
//! state, no test ordering dependencies.

use std::sync::Arc;
use std::thread;

use lockup_protocol::clock::ManualClock;
use lockup_protocol::config::{LAMPORTS_PER_NATIVE, LOCKUP_PROGRAM_ID, VAULT_SEED};
use lockup_protocol::crypto::keys::{Keypair, Pubkey};
use lockup_protocol::crypto::pda::find_program_address;
use lockup_protocol::runtime::{Instruction, Message, Runtime, RuntimeError, Transaction};
use lockup_protocol::storage::LedgerDB;
use lockup_protocol::system::SystemInstruction;
use lockup_protocol::token::{associated_token_address, TokenInstruction};
use lockup_protocol::vault::{ErrorClass, LockupError, LockupInstruction};

const START: u64 = 1_700_000_000;
const TOKENS: u64 = 100 * LAMPORTS_PER_NATIVE;

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

struct Harness {
    runtime: Arc<Runtime>,
    clock: Arc<ManualClock>,
    mint: Keypair,
    mint_authority: Keypair,
}

impl Harness {
    fn new() -> Self {
        Self::with_db(LedgerDB::open_temporary().expect("temp db"))
    }

    /// A runtime over `db` with a fresh mint whose authority is funded.
    fn with_db(db: LedgerDB) -> Self {
        let clock = Arc::new(ManualClock::new(START));
        let runtime = Arc::new(Runtime::new(db, clock.clone()));
        let mint = Keypair::generate();
        let mint_authority = Keypair::generate();
        runtime
            .airdrop(&mint_authority.pubkey(), 10 * LAMPORTS_PER_NATIVE)
            .expect("airdrop");

        let harness = Self {
            runtime,
            clock,
            mint,
            mint_authority,
        };
        harness
            .send(
                &[&harness.mint_authority, &harness.mint],
                vec![TokenInstruction::InitializeMint {
                    payer: harness.mint_authority.pubkey(),
                    mint: harness.mint.pubkey(),
                    mint_authority: harness.mint_authority.pubkey(),
                    decimals: 9,
                }
                .into()],
            )
            .expect("create mint");
        harness
    }

    fn send(
        &self,
        signers: &[&Keypair],
        instructions: Vec<Instruction>,
    ) -> Result<(), RuntimeError> {
        let message = Message::new(signers.iter().map(|kp| kp.pubkey()).collect(), instructions);
        self.runtime
            .process(&Transaction::new(message, signers))
            .map(|_| ())
    }

    /// A user with 10 native units and `tokens` in their associated account.
    fn funded_user(&self, tokens: u64) -> Keypair {
        let user = Keypair::generate();
        let owner = user.pubkey();
        self.runtime
            .airdrop(&owner, 10 * LAMPORTS_PER_NATIVE)
            .expect("airdrop");
        self.send(
            &[&user, &self.mint_authority],
            vec![
                TokenInstruction::CreateAssociatedAccount {
                    payer: owner,
                    owner,
                    mint: self.mint.pubkey(),
                }
                .into(),
                TokenInstruction::MintTo {
                    mint: self.mint.pubkey(),
                    destination: self.ata(&owner),
                    authority: self.mint_authority.pubkey(),
                    amount: tokens,
                }
                .into(),
            ],
        )
        .expect("fund user");
        user
    }

    fn ata(&self, owner: &Pubkey) -> Pubkey {
        associated_token_address(owner, &self.mint.pubkey()).expect("ata")
    }

    fn initialize(&self, user: &Keypair) -> Result<(), RuntimeError> {
        self.send(
            &[user],
            vec![LockupInstruction::Initialize {
                authority: user.pubkey(),
                mint: self.mint.pubkey(),
            }
            .into()],
        )
    }

    fn deposit(&self, user: &Keypair, amount: u64, duration: u64) -> Result<(), RuntimeError> {
        self.send(
            &[user],
            vec![LockupInstruction::Deposit {
                authority: user.pubkey(),
                amount,
                duration,
            }
            .into()],
        )
    }

    fn withdraw(&self, user: &Keypair) -> Result<(), RuntimeError> {
        self.send(
            &[user],
            vec![LockupInstruction::Withdraw {
                authority: user.pubkey(),
            }
            .into()],
        )
    }

    fn balance(&self, owner: &Pubkey) -> u64 {
        self.runtime.token_balance(&self.ata(owner)).expect("balance")
    }

    fn custody_balance(&self) -> u64 {
        let custody = self.runtime.custody().expect("custody");
        self.runtime.token_balance(&custody).expect("balance")
    }

    fn locked(&self, owner: &Pubkey) -> u64 {
        self.runtime
            .vault(owner)
            .expect("vault read")
            .expect("vault exists")
            .locked_amount
    }
}

fn lockup_error(err: &RuntimeError) -> &LockupError {
    err.lockup_error().expect("lockup program error")
}

// ---------------------------------------------------------------------------
// Reference scenario
// ---------------------------------------------------------------------------

#[test]
fn full_lock_cycle() {
    let h = Harness::new();
    let user = h.funded_user(TOKENS);
    let owner = user.pubkey();

    h.initialize(&user).expect("initialize");
    h.deposit(&user, 3 * LAMPORTS_PER_NATIVE, 60).expect("deposit");
    assert_eq!(h.custody_balance(), 3 * LAMPORTS_PER_NATIVE);
    assert_eq!(h.balance(&owner), TOKENS - 3 * LAMPORTS_PER_NATIVE);

    let vault = h.runtime.vault(&owner).unwrap().unwrap();
    assert_eq!(vault.locked_amount, 3 * LAMPORTS_PER_NATIVE);
    assert_eq!(vault.unlock_time, START + 60);

    // Too early.
    let err = h.withdraw(&user).unwrap_err();
    assert_eq!(err.custom_code(), Some(0x193));
    assert!(err
        .logs()
        .last()
        .expect("logs")
        .contains("custom program error: 0x193"));
    assert_eq!(lockup_error(&err).class(), ErrorClass::Retryable);
    assert_eq!(h.locked(&owner), 3 * LAMPORTS_PER_NATIVE);

    h.clock.advance(60);
    h.withdraw(&user).expect("withdraw after unlock");

    assert_eq!(h.balance(&owner), TOKENS);
    assert_eq!(h.custody_balance(), 0);
    assert_eq!(h.locked(&owner), 0);
}

#[test]
fn derived_addresses_are_reproducible_by_anyone() {
    let h = Harness::new();
    let user = h.funded_user(10);
    h.initialize(&user).unwrap();

    let (expected_vault, _) =
        find_program_address(&[VAULT_SEED, user.pubkey().as_ref()], &LOCKUP_PROGRAM_ID).unwrap();
    let (expected_custody, _) = find_program_address(&[VAULT_SEED], &LOCKUP_PROGRAM_ID).unwrap();

    let vault_account = h.runtime.account(&expected_vault).unwrap().expect("vault account");
    assert_eq!(vault_account.owner, LOCKUP_PROGRAM_ID);
    assert_eq!(h.runtime.custody().unwrap(), expected_custody);
    assert!(h.runtime.token_account(&expected_custody).unwrap().is_some());
}

// ---------------------------------------------------------------------------
// Failure modes
// ---------------------------------------------------------------------------

#[test]
fn initialize_twice_is_rejected() {
    let h = Harness::new();
    let user = h.funded_user(10);
    h.initialize(&user).unwrap();

    let err = h.initialize(&user).unwrap_err();
    assert!(matches!(lockup_error(&err), LockupError::AlreadyInitialized { .. }));
    assert_eq!(err.custom_code(), Some(0x190));
}

/// A stranger sends lamports to `to` before its owner program claims it.
fn prefund(h: &Harness, to: Pubkey) {
    let stranger = Keypair::generate();
    h.runtime
        .airdrop(&stranger.pubkey(), LAMPORTS_PER_NATIVE)
        .expect("airdrop");
    h.send(
        &[&stranger],
        vec![SystemInstruction::Transfer {
            from: stranger.pubkey(),
            to,
            lamports: 1,
        }
        .into()],
    )
    .expect("transfer");
}

#[test]
fn lamports_sent_to_a_vault_address_do_not_block_initialize() {
    let h = Harness::new();
    let user = h.funded_user(TOKENS);
    let (vault, _) = find_program_address(&[VAULT_SEED, user.pubkey().as_ref()], &LOCKUP_PROGRAM_ID)
        .expect("derive");
    prefund(&h, vault);
    assert!(h.runtime.vault(&user.pubkey()).unwrap().is_none());

    h.initialize(&user).expect("initialize over prefunded vault address");
    let account = h.runtime.account(&vault).unwrap().unwrap();
    assert_eq!(account.owner, LOCKUP_PROGRAM_ID);

    h.deposit(&user, 10, 60).expect("deposit");
    h.clock.advance(60);
    h.withdraw(&user).expect("withdraw");
    assert_eq!(h.balance(&user.pubkey()), TOKENS);

    let err = h.initialize(&user).unwrap_err();
    assert!(matches!(lockup_error(&err), LockupError::AlreadyInitialized { .. }));
}

#[test]
fn lamports_sent_to_custody_do_not_block_initialize() {
    let h = Harness::new();
    let custody = h.runtime.custody().unwrap();
    prefund(&h, custody);

    let alice = h.funded_user(TOKENS);
    let bob = h.funded_user(TOKENS);
    h.initialize(&alice).expect("first initialize opens custody");
    h.initialize(&bob).expect("second initialize reuses custody");
    assert!(h.runtime.token_account(&custody).unwrap().is_some());

    h.deposit(&alice, 7, 10).expect("deposit");
    assert_eq!(h.custody_balance(), 7);
}

#[test]
fn other_signer_cannot_touch_a_vault() {
    let h = Harness::new();
    let owner = h.funded_user(10);
    let mallory = h.funded_user(10);
    h.initialize(&owner).unwrap();
    h.deposit(&owner, 5, 0).unwrap();

    // Mallory signs, but names the owner as authority.
    let err = h
        .send(
            &[&mallory],
            vec![LockupInstruction::Withdraw {
                authority: owner.pubkey(),
            }
            .into()],
        )
        .unwrap_err();
    assert!(matches!(lockup_error(&err), LockupError::Unauthorized(k) if *k == owner.pubkey()));
    assert_eq!(h.locked(&owner.pubkey()), 5);
    assert_eq!(h.balance(&mallory.pubkey()), 10);
}

#[test]
fn deposit_beyond_balance_is_rejected() {
    let h = Harness::new();
    let user = h.funded_user(10);
    h.initialize(&user).unwrap();

    let err = h.deposit(&user, 11, 60).unwrap_err();
    assert!(matches!(
        lockup_error(&err),
        LockupError::InsufficientBalance {
            requested: 11,
            available: 10
        }
    ));
    assert_eq!(h.locked(&user.pubkey()), 0);
    assert_eq!(h.custody_balance(), 0);
}

#[test]
fn deposit_without_vault_is_not_found() {
    let h = Harness::new();
    let user = h.funded_user(10);
    let err = h.deposit(&user, 1, 60).unwrap_err();
    assert!(matches!(lockup_error(&err), LockupError::NotFound { .. }));
}

#[test]
fn failure_in_later_instruction_rolls_back_everything() {
    let h = Harness::new();
    let user = h.funded_user(10);
    let owner = user.pubkey();
    let lamports_before = h.runtime.lamports(&owner).unwrap();

    // Initialize + deposit succeed, then the withdraw fails: nothing lands.
    let err = h
        .send(
            &[&user],
            vec![
                LockupInstruction::Initialize {
                    authority: owner,
                    mint: h.mint.pubkey(),
                }
                .into(),
                LockupInstruction::Deposit {
                    authority: owner,
                    amount: 4,
                    duration: 30,
                }
                .into(),
                LockupInstruction::Withdraw { authority: owner }.into(),
            ],
        )
        .unwrap_err();

    assert!(matches!(err, RuntimeError::InstructionFailed { index: 2, .. }));
    assert!(h.runtime.vault(&owner).unwrap().is_none());
    assert_eq!(h.balance(&owner), 10);
    assert_eq!(h.runtime.lamports(&owner).unwrap(), lamports_before);
    assert!(h
        .runtime
        .token_account(&h.runtime.custody().unwrap())
        .unwrap()
        .is_none());
}

#[test]
fn replayed_transaction_is_rejected() {
    let h = Harness::new();
    let user = h.funded_user(10);
    h.initialize(&user).unwrap();

    let message = Message::new(
        vec![user.pubkey()],
        vec![LockupInstruction::Deposit {
            authority: user.pubkey(),
            amount: 2,
            duration: 0,
        }
        .into()],
    );
    let tx = Transaction::new(message, &[&user]);
    h.runtime.process(&tx).unwrap();

    assert!(matches!(
        h.runtime.process(&tx),
        Err(RuntimeError::AlreadyProcessed(_))
    ));
    assert_eq!(h.balance(&user.pubkey()), 8);
}

#[test]
fn forged_signature_is_rejected() {
    let h = Harness::new();
    let user = h.funded_user(10);
    let forger = Keypair::generate();
    h.initialize(&user).unwrap();

    let message = Message::new(
        vec![user.pubkey()],
        vec![LockupInstruction::Withdraw {
            authority: user.pubkey(),
        }
        .into()],
    );
    let mut tx = Transaction::new(message.clone(), &[&user]);
    tx.signatures = vec![forger.sign(&message.signable_bytes())];

    assert!(matches!(
        h.runtime.process(&tx),
        Err(RuntimeError::InvalidSignature(k)) if k == user.pubkey()
    ));
}

// ---------------------------------------------------------------------------
// Lock semantics
// ---------------------------------------------------------------------------

#[test]
fn second_deposit_overwrites_the_lock() {
    let h = Harness::new();
    let user = h.funded_user(100);
    let owner = user.pubkey();
    h.initialize(&user).unwrap();

    h.deposit(&user, 30, 1_000).unwrap();
    h.clock.advance(10);
    h.deposit(&user, 20, 5).unwrap();

    let vault = h.runtime.vault(&owner).unwrap().unwrap();
    assert_eq!(vault.locked_amount, 20);
    assert_eq!(vault.start_time, START + 10);
    assert_eq!(vault.unlock_time, START + 15);
    assert_eq!(h.custody_balance(), 50);

    // Only the overwritten amount comes back.
    h.clock.advance(5);
    h.withdraw(&user).unwrap();
    assert_eq!(h.balance(&owner), 70);
    assert_eq!(h.custody_balance(), 30);
}

#[test]
fn vault_can_be_reused_after_withdraw() {
    let h = Harness::new();
    let user = h.funded_user(10);
    h.initialize(&user).unwrap();

    h.deposit(&user, 4, 10).unwrap();
    h.clock.advance(10);
    h.withdraw(&user).unwrap();

    h.deposit(&user, 6, 20).unwrap();
    assert_eq!(h.locked(&user.pubkey()), 6);
    h.clock.advance(19);
    assert_eq!(h.withdraw(&user).unwrap_err().custom_code(), Some(0x193));
    h.clock.advance(1);
    h.withdraw(&user).unwrap();
    assert_eq!(h.balance(&user.pubkey()), 10);
}

#[test]
fn second_withdraw_finds_nothing_locked() {
    let h = Harness::new();
    let user = h.funded_user(10);
    h.initialize(&user).unwrap();
    h.deposit(&user, 4, 0).unwrap();
    h.withdraw(&user).unwrap();

    let err = h.withdraw(&user).unwrap_err();
    assert!(matches!(lockup_error(&err), LockupError::NothingLocked { .. }));
    assert_eq!(h.balance(&user.pubkey()), 10);
}

#[test]
fn authorities_share_custody_but_not_locks() {
    let h = Harness::new();
    let alice = h.funded_user(50);
    let bob = h.funded_user(50);
    h.initialize(&alice).unwrap();
    h.initialize(&bob).unwrap();

    h.deposit(&alice, 10, 100).unwrap();
    h.deposit(&bob, 20, 10).unwrap();
    assert_eq!(h.custody_balance(), 30);

    h.clock.advance(10);
    h.withdraw(&bob).unwrap();
    assert_eq!(h.withdraw(&alice).unwrap_err().custom_code(), Some(0x193));

    assert_eq!(h.balance(&bob.pubkey()), 50);
    assert_eq!(h.locked(&alice.pubkey()), 10);
    assert_eq!(h.custody_balance(), 10);
}

// ---------------------------------------------------------------------------
// Concurrency & persistence
// ---------------------------------------------------------------------------

#[test]
fn concurrent_deposits_from_many_authorities() {
    let h = Harness::new();
    let users: Vec<Keypair> = (0..8).map(|_| h.funded_user(100)).collect();
    for user in &users {
        h.initialize(user).unwrap();
    }

    let handles: Vec<_> = users
        .iter()
        .cloned()
        .enumerate()
        .map(|(i, user)| {
            let runtime = Arc::clone(&h.runtime);
            thread::spawn(move || {
                let amount = (i as u64) + 1;
                let message = Message::new(
                    vec![user.pubkey()],
                    vec![LockupInstruction::Deposit {
                        authority: user.pubkey(),
                        amount,
                        duration: 60,
                    }
                    .into()],
                );
                runtime
                    .process(&Transaction::new(message, &[&user]))
                    .expect("deposit")
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("depositor thread should not panic");
    }

    // 1 + 2 + ... + 8
    assert_eq!(h.custody_balance(), 36);
    for (i, user) in users.iter().enumerate() {
        assert_eq!(h.locked(&user.pubkey()), (i as u64) + 1);
    }
}

#[test]
fn lock_survives_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (owner, mint) = {
        let h = Harness::with_db(LedgerDB::open(dir.path()).expect("open"));
        let user = h.funded_user(10);
        h.initialize(&user).unwrap();
        h.deposit(&user, 7, 60).unwrap();
        (user.pubkey(), h.mint.pubkey())
    };

    let clock = Arc::new(ManualClock::new(START));
    let runtime = Runtime::new(LedgerDB::open(dir.path()).expect("reopen"), clock);
    let vault = runtime.vault(&owner).unwrap().expect("vault persisted");
    assert_eq!(vault.locked_amount, 7);
    assert_eq!(vault.unlock_time, START + 60);
    assert_eq!(vault.mint, mint);
    assert_eq!(runtime.token_balance(&runtime.custody().unwrap()).unwrap(), 7);
}
