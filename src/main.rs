//! Split Ledger CLI
//!
//! Command-line interface for replaying shared-expense journals from CSV files.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- journal.csv > debts.csv
//! cargo run -- --report balances journal.csv > balances.csv
//! cargo run -- --strategy sync --report wallets journal.csv > wallets.csv
//! cargo run -- --strategy async --batch-size 2000 --max-concurrent 8 journal.csv
//! RUST_LOG=split_ledger=debug cargo run -- journal.csv
//! ```
//!
//! The program replays the journal through the ledger engine using the
//! selected strategy and writes the selected report to stdout. Diagnostics
//! go to stderr.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (file not found, file not readable, report not writable)

use split_ledger::cli;
use split_ledger::strategy;
use std::process;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() {
    let args = cli::parse_args();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let strategy = {
        let config = if matches!(args.strategy, cli::StrategyType::Async) {
            Some(args.to_batch_config())
        } else {
            None
        };
        strategy::create_strategy(args.strategy, config, args.report)
    };

    let mut output = std::io::stdout();
    if let Err(e) = strategy.process(&args.input_file, &mut output) {
        error!(error = %e, "replay failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
