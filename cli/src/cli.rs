//! # CLI Interface
//!
//! Defines the command-line argument structure for `lockup` using `clap`
//! derive. Every subcommand opens the ledger in `--data-dir`, does one
//! thing and exits.
//!
//! Wherever a command takes a `KEY`, pass either the name of a key created
//! with `lockup keygen` or a path to a hex key file. Wherever it takes an
//! `ADDRESS`, pass a base58 address or a key name.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use lockup_protocol::config::{DEFAULT_MINT_DECIMALS, LAMPORTS_PER_NATIVE};

use crate::logging::LogFormat;

/// Time-locked token vault.
///
/// Lock tokens for a fixed duration on a local ledger, then take them back
/// once the lock has expired.
#[derive(Parser, Debug)]
#[command(name = "lockup", about = "Time-locked token vault", version, propagate_version = true)]
pub struct LockupCli {
    /// Directory holding the ledger database and key files.
    ///
    /// Created on first use if it does not exist.
    #[arg(long, short = 'd', env = "LOCKUP_DATA_DIR", default_value = ".lockup", global = true)]
    pub data_dir: PathBuf,

    /// Log output format.
    #[arg(
        long,
        env = "LOCKUP_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Pretty,
        ignore_case = true,
        global = true
    )]
    pub log_format: LogFormat,

    /// Print debug diagnostics, including each instruction's program log.
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the `lockup` binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a keypair and store it under the data directory.
    Keygen(KeygenArgs),
    /// Credit native lamports to an address from the local faucet.
    Airdrop(AirdropArgs),
    /// Create a new token mint.
    CreateMint(CreateMintArgs),
    /// Mint tokens into an owner's associated token account, creating the
    /// account if needed.
    MintTo(MintToArgs),
    /// Create the vault of an authority.
    Initialize(InitializeArgs),
    /// Lock tokens in the vault for a number of seconds.
    Deposit(DepositArgs),
    /// Withdraw everything locked, once the lock has expired.
    Withdraw(WithdrawArgs),
    /// Print an authority's vault as JSON.
    Show(ShowArgs),
    /// Print native and token balances of an address as JSON.
    Balance(BalanceArgs),
}

/// Arguments for the `keygen` subcommand.
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Name of the key; stored as `<data-dir>/keys/<NAME>.key`.
    pub name: String,

    /// Overwrite an existing key of the same name.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `airdrop` subcommand.
#[derive(Args, Debug)]
pub struct AirdropArgs {
    /// Recipient ADDRESS.
    pub to: String,

    /// Amount in lamports.
    #[arg(long, default_value_t = 10 * LAMPORTS_PER_NATIVE)]
    pub lamports: u64,
}

/// Arguments for the `create-mint` subcommand.
#[derive(Args, Debug)]
pub struct CreateMintArgs {
    /// KEY that pays for the mint and becomes its mint authority.
    #[arg(long)]
    pub authority: String,

    /// Key name under which the new mint keypair is stored.
    #[arg(long, default_value = "mint")]
    pub name: String,

    /// Display decimals of the token.
    #[arg(long, default_value_t = DEFAULT_MINT_DECIMALS)]
    pub decimals: u8,
}

/// Arguments for the `mint-to` subcommand.
#[derive(Args, Debug)]
pub struct MintToArgs {
    /// Mint authority KEY. Also pays for a new token account.
    #[arg(long)]
    pub authority: String,

    /// Mint ADDRESS.
    #[arg(long)]
    pub mint: String,

    /// ADDRESS of the owner receiving the tokens.
    #[arg(long)]
    pub owner: String,

    /// Amount in base units.
    #[arg(long)]
    pub amount: u64,
}

/// Arguments for the `initialize` subcommand.
#[derive(Args, Debug)]
pub struct InitializeArgs {
    /// Vault authority KEY. Pays for the vault account.
    #[arg(long)]
    pub authority: String,

    /// Mint ADDRESS the vault accepts.
    #[arg(long)]
    pub mint: String,
}

/// Arguments for the `deposit` subcommand.
#[derive(Args, Debug)]
pub struct DepositArgs {
    /// Vault authority KEY.
    #[arg(long)]
    pub authority: String,

    /// Amount in base units. Replaces any amount already locked.
    #[arg(long)]
    pub amount: u64,

    /// Lock duration in seconds.
    #[arg(long)]
    pub duration: u64,
}

/// Arguments for the `withdraw` subcommand.
#[derive(Args, Debug)]
pub struct WithdrawArgs {
    /// Vault authority KEY.
    #[arg(long)]
    pub authority: String,
}

/// Arguments for the `show` subcommand.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// ADDRESS of the vault authority.
    pub authority: String,
}

/// Arguments for the `balance` subcommand.
#[derive(Args, Debug)]
pub struct BalanceArgs {
    /// ADDRESS to inspect.
    pub address: String,

    /// Also report the token balance of the associated account for this
    /// mint ADDRESS.
    #[arg(long)]
    pub mint: Option<String>,
}
