// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Lockup CLI
//!
//! Entry point for the `lockup` binary. Parses CLI arguments, initializes
//! logging, opens the ledger in the data directory and runs one command.
//!
//! - `keygen`      — generate and store a keypair
//! - `airdrop`     — fund an address from the local faucet
//! - `create-mint` — create a token mint
//! - `mint-to`     — mint tokens to an owner's associated account
//! - `initialize`  — create an authority's vault
//! - `deposit`     — lock tokens for a duration
//! - `withdraw`    — take back locked tokens after the lock expires
//! - `show`        — print a vault
//! - `balance`     — print balances

mod cli;
mod keystore;
mod logging;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use serde_json::json;
use std::sync::Arc;

use lockup_protocol::clock::SystemClock;
use lockup_protocol::crypto::keys::Keypair;
use lockup_protocol::runtime::{Instruction, Message, Runtime, Transaction, TransactionRecord};
use lockup_protocol::storage::LedgerDB;
use lockup_protocol::token::{associated_token_address, TokenInstruction};
use lockup_protocol::vault::LockupInstruction;

use cli::{Commands, LockupCli};
use keystore::KeyStore;

fn main() -> Result<()> {
    let cli = LockupCli::parse();
    logging::init_logging(cli.log_format, cli.verbose);

    let keys = KeyStore::new(&cli.data_dir);
    let runtime = || open_runtime(&cli.data_dir);
    match cli.command {
        Commands::Keygen(args) => keygen(&keys, &args),
        Commands::Airdrop(args) => airdrop(&runtime()?, &keys, args),
        Commands::CreateMint(args) => create_mint(&runtime()?, &keys, args),
        Commands::MintTo(args) => mint_to(&runtime()?, &keys, args),
        Commands::Initialize(args) => initialize(&runtime()?, &keys, args),
        Commands::Deposit(args) => deposit(&runtime()?, &keys, args),
        Commands::Withdraw(args) => withdraw(&runtime()?, &keys, args),
        Commands::Show(args) => show(&runtime()?, &keys, args),
        Commands::Balance(args) => balance(&runtime()?, &keys, args),
    }
}

/// Opens (or creates) the ledger database under the data directory.
fn open_runtime(data_dir: &std::path::Path) -> Result<Runtime> {
    let db_path = data_dir.join("ledger");
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;
    let db = LedgerDB::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    tracing::debug!(path = %db_path.display(), "ledger opened");
    Ok(Runtime::new(db, Arc::new(SystemClock)))
}

/// Signs and submits one transaction. On failure the program logs go to
/// stderr before the error propagates.
fn submit(
    runtime: &Runtime,
    signers: &[&Keypair],
    instructions: Vec<Instruction>,
) -> Result<TransactionRecord> {
    let message = Message::new(signers.iter().map(|kp| kp.pubkey()).collect(), instructions);
    let tx = Transaction::new(message, signers);
    match runtime.process(&tx) {
        Ok(record) => {
            tracing::info!(tx = %record.id, "transaction committed");
            Ok(record)
        }
        Err(err) => {
            for line in err.logs() {
                eprintln!("  {line}");
            }
            Err(err).with_context(|| format!("transaction {} failed", tx.id()))
        }
    }
}

fn format_time(unix: u64) -> String {
    i64::try_from(unix)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| unix.to_string())
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn keygen(keys: &KeyStore, args: &cli::KeygenArgs) -> Result<()> {
    let keypair = Keypair::generate();
    let path = keys.save(&args.name, &keypair, args.force)?;
    tracing::info!(name = %args.name, path = %path.display(), "keypair generated");

    println!("Keypair generated.");
    println!("  Name       : {}", args.name);
    println!("  Key file   : {}", path.display());
    println!("  Public key : {}", keypair.pubkey());
    Ok(())
}

fn airdrop(runtime: &Runtime, keys: &KeyStore, args: cli::AirdropArgs) -> Result<()> {
    let to = keys.resolve_address(&args.to)?;
    let balance = runtime.airdrop(&to, args.lamports)?;
    println!("Airdropped {} lamports to {to}; balance {balance}.", args.lamports);
    Ok(())
}

fn create_mint(runtime: &Runtime, keys: &KeyStore, args: cli::CreateMintArgs) -> Result<()> {
    let authority = keys.load(&args.authority)?;
    if keys.path_of(&args.name).exists() {
        bail!("key {} already exists; pick another --name", args.name);
    }
    let mint = Keypair::generate();
    let record = submit(
        runtime,
        &[&authority, &mint],
        vec![TokenInstruction::InitializeMint {
            payer: authority.pubkey(),
            mint: mint.pubkey(),
            mint_authority: authority.pubkey(),
            decimals: args.decimals,
        }
        .into()],
    )?;
    // Only keep the mint key once the mint exists.
    let path = keys.save(&args.name, &mint, true)?;

    println!("Mint created.");
    println!("  Mint        : {}", mint.pubkey());
    println!("  Authority   : {}", authority.pubkey());
    println!("  Decimals    : {}", args.decimals);
    println!("  Key file    : {}", path.display());
    println!("  Transaction : {}", record.id);
    Ok(())
}

fn mint_to(runtime: &Runtime, keys: &KeyStore, args: cli::MintToArgs) -> Result<()> {
    let authority = keys.load(&args.authority)?;
    let mint = keys.resolve_address(&args.mint)?;
    let owner = keys.resolve_address(&args.owner)?;
    let destination = associated_token_address(&owner, &mint)?;

    let mut instructions = Vec::new();
    if runtime.token_account(&destination)?.is_none() {
        instructions.push(
            TokenInstruction::CreateAssociatedAccount {
                payer: authority.pubkey(),
                owner,
                mint,
            }
            .into(),
        );
    }
    instructions.push(
        TokenInstruction::MintTo {
            mint,
            destination,
            authority: authority.pubkey(),
            amount: args.amount,
        }
        .into(),
    );
    let record = submit(runtime, &[&authority], instructions)?;

    println!(
        "Minted {} to {owner} ({destination}); transaction {}.",
        args.amount, record.id
    );
    Ok(())
}

fn initialize(runtime: &Runtime, keys: &KeyStore, args: cli::InitializeArgs) -> Result<()> {
    let authority = keys.load(&args.authority)?;
    let mint = keys.resolve_address(&args.mint)?;
    let record = submit(
        runtime,
        &[&authority],
        vec![LockupInstruction::Initialize {
            authority: authority.pubkey(),
            mint,
        }
        .into()],
    )?;

    let (vault, _) = runtime.lockup().store().address(&authority.pubkey())?;
    println!("Vault initialized.");
    println!("  Authority   : {}", authority.pubkey());
    println!("  Vault       : {vault}");
    println!("  Custody     : {}", runtime.custody()?);
    println!("  Transaction : {}", record.id);
    Ok(())
}

fn deposit(runtime: &Runtime, keys: &KeyStore, args: cli::DepositArgs) -> Result<()> {
    let authority = keys.load(&args.authority)?;
    let record = submit(
        runtime,
        &[&authority],
        vec![LockupInstruction::Deposit {
            authority: authority.pubkey(),
            amount: args.amount,
            duration: args.duration,
        }
        .into()],
    )?;

    let vault = runtime
        .vault(&authority.pubkey())?
        .context("vault disappeared after deposit")?;
    println!(
        "Locked {} until {}; transaction {}.",
        vault.locked_amount,
        format_time(vault.unlock_time),
        record.id
    );
    Ok(())
}

fn withdraw(runtime: &Runtime, keys: &KeyStore, args: cli::WithdrawArgs) -> Result<()> {
    let authority = keys.load(&args.authority)?;
    let before = runtime
        .vault(&authority.pubkey())?
        .map(|v| v.locked_amount)
        .unwrap_or(0);
    let record = submit(
        runtime,
        &[&authority],
        vec![LockupInstruction::Withdraw {
            authority: authority.pubkey(),
        }
        .into()],
    )?;

    println!("Withdrew {before}; transaction {}.", record.id);
    Ok(())
}

fn show(runtime: &Runtime, keys: &KeyStore, args: cli::ShowArgs) -> Result<()> {
    let authority = keys.resolve_address(&args.authority)?;
    let (address, _) = runtime.lockup().store().address(&authority)?;
    let vault = runtime
        .vault(&authority)?
        .with_context(|| format!("no vault for {authority}"))?;

    let output = json!({
        "address": address.to_string(),
        "authority": vault.authority.to_string(),
        "mint": vault.mint.to_string(),
        "locked_amount": vault.locked_amount,
        "start_time": vault.start_time,
        "unlock_time": vault.unlock_time,
        "unlock_at": format_time(vault.unlock_time),
        "locked_now": vault.is_locked_at(runtime.clock().unix_timestamp()),
        "bump": vault.bump,
        "custody": runtime.custody()?.to_string(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn balance(runtime: &Runtime, keys: &KeyStore, args: cli::BalanceArgs) -> Result<()> {
    let address = keys.resolve_address(&args.address)?;
    let mut output = json!({
        "address": address.to_string(),
        "lamports": runtime.lamports(&address)?,
    });
    if let Some(mint) = &args.mint {
        let mint = keys.resolve_address(mint)?;
        let ata = associated_token_address(&address, &mint)?;
        output["token_account"] = json!(ata.to_string());
        output["tokens"] = json!(runtime.token_balance(&ata)?);
    }
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
