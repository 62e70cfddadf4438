use crate::strategy::BatchConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Replay a shared-expense journal and report who owes whom
#[derive(Parser, Debug)]
#[command(name = "split-ledger")]
#[command(about = "Replay a shared-expense journal and report balances or debts", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing journal rows
    #[arg(value_name = "INPUT", help = "Path to the journal CSV file")]
    pub input_file: PathBuf,

    /// Replay strategy
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Replay strategy: 'sync' for sequential or 'async' for per-group parallel batches"
    )]
    pub strategy: StrategyType,

    /// Report written to stdout once the journal is replayed
    #[arg(
        long = "report",
        value_name = "REPORT",
        default_value = "debts",
        help = "Report: 'balances', 'debts' (minimal settle-up plan) or 'wallets'"
    )]
    pub report: ReportKind,

    /// Number of journal rows per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of journal rows per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Worker threads for the async runtime (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Number of worker threads replaying groups concurrently (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,

    /// Log filter used when RUST_LOG is not set
    #[arg(
        long = "log-level",
        value_name = "LEVEL",
        default_value = "warn",
        help = "Log level for stderr diagnostics (overridden by RUST_LOG)"
    )]
    pub log_level: String,
}

/// Available replay strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

/// Available reports
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportKind {
    /// Net balance of every member, per group
    Balances,
    /// Minimal transfers that settle every group
    Debts,
    /// Ledger wallet balance of every user
    Wallets,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments
    ///
    /// Missing values fall back to the defaults. Zero values are rejected by
    /// `BatchConfig::new`, which logs a warning and uses the default instead.
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }
}
