//! Diagnostics for the `lockup` binary.
//!
//! Command results go to stdout (`show` and `balance` print JSON there), so
//! every tracing event is written to stderr. `--verbose` also surfaces the
//! per-instruction program log, which the runtime emits at `debug` under
//! the `lockup::program` target.

use clap::ValueEnum;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "lockup=info,lockup_protocol=warn";

/// Filter used with `--verbose` when `RUST_LOG` is unset.
pub const VERBOSE_FILTER: &str = "lockup=debug,lockup::program=debug,lockup_protocol=debug";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Colored, one event per line.
    Pretty,
    /// One JSON object per event, for piping into `jq` or a collector.
    Json,
}

/// The filter directives to start from. `RUST_LOG` always wins.
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        VERBOSE_FILTER
    } else {
        DEFAULT_FILTER
    }
}

/// Install the global subscriber. Must run once, before the ledger opens.
pub fn init_logging(format: LogFormat, verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(verbose)
                    .without_time(),
            )
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr).with_target(true))
            .init(),
    }

    tracing::debug!(?format, verbose, "logging initialized");
}
