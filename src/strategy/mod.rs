//! Processing strategy module for journal replay
//!
//! This module defines the Strategy pattern for complete replay pipelines,
//! encompassing both CSV parsing and ledger engine processing. This allows
//! different implementations (synchronous, asynchronous batch) to be selected
//! at runtime. Every strategy finishes by rendering the same report from the
//! final ledger state, so all strategies produce identical output.

use crate::cli::{ReportKind, StrategyType};
use crate::core::{LedgerRepository, SplitEngine};
use crate::io::csv_format::{
    write_balances_csv, write_debts_csv, write_wallets_csv, BalanceRow, DebtRow, WalletRow,
};
use crate::types::{EntityKind, LedgerError, UserId};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use tracing::debug;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Complete journal replay pipeline
pub trait ProcessingStrategy: Send + Sync {
    /// Replay the journal at `input_path` and write the report to `output`
    ///
    /// # Errors
    ///
    /// Returns `IoError` when the journal cannot be opened or the report
    /// cannot be written. Individual bad rows never fail the replay.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), LedgerError>;
}

/// Build the strategy selected on the command line
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
    report: ReportKind,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(report)),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncProcessingStrategy::new(config, report))
        }
    }
}

/// Render a report from the engine's current state
pub fn write_report<S: LedgerRepository>(
    engine: &SplitEngine<S>,
    report: ReportKind,
    output: &mut dyn Write,
) -> Result<(), LedgerError> {
    let usernames: HashMap<UserId, String> = engine
        .list_users()?
        .into_iter()
        .map(|user| (user.id, user.username))
        .collect();
    let username = |id: UserId| {
        usernames
            .get(&id)
            .cloned()
            .ok_or_else(|| LedgerError::not_found(EntityKind::User, id))
    };

    let mut groups = engine.list_groups()?;
    groups.sort_by(|a, b| a.name.cmp(&b.name));

    match report {
        ReportKind::Balances => {
            let mut rows = Vec::new();
            for group in &groups {
                for (user_id, balance) in engine.get_group_balances(group.id)? {
                    rows.push(BalanceRow {
                        group: group.name.clone(),
                        user: username(user_id)?,
                        balance,
                    });
                }
            }
            debug!(rows = rows.len(), "writing balances report");
            write_balances_csv(&rows, output)
        }
        ReportKind::Debts => {
            let mut rows = Vec::new();
            for group in &groups {
                for entry in engine.get_group_debts(group.id)? {
                    rows.push(DebtRow {
                        group: group.name.clone(),
                        debtor: entry.debtor_username,
                        creditor: entry.creditor_username,
                        amount: entry.amount,
                    });
                }
            }
            debug!(rows = rows.len(), "writing debts report");
            write_debts_csv(&rows, output)
        }
        ReportKind::Wallets => {
            let rows = engine
                .list_users()?
                .into_iter()
                .map(|user| {
                    let wallet = engine.get_user_wallet(user.id)?;
                    Ok(WalletRow {
                        user: wallet.username,
                        balance: wallet.balance,
                    })
                })
                .collect::<Result<Vec<_>, LedgerError>>()?;
            debug!(rows = rows.len(), "writing wallets report");
            write_wallets_csv(&rows, output)
        }
    }
}
