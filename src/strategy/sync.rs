//! Synchronous replay strategy
//!
//! Reads the journal row by row with [`SyncReader`] and applies each command
//! in file order on the calling thread.

use crate::cli::ReportKind;
use crate::core::{InMemoryStore, SplitEngine};
use crate::io::sync_reader::SyncReader;
use crate::strategy::{write_report, ProcessingStrategy};
use crate::types::LedgerError;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Single-threaded replay in journal order
#[derive(Debug, Clone, Copy)]
pub struct SyncProcessingStrategy {
    report: ReportKind,
}

impl SyncProcessingStrategy {
    pub fn new(report: ReportKind) -> Self {
        Self { report }
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    /// Replay the journal and write the selected report
    ///
    /// Rows that fail to parse and commands the engine rejects are logged
    /// with `warn!` and skipped; they never abort the replay.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), LedgerError> {
        let engine = SplitEngine::new(Arc::new(InMemoryStore::new()));
        let reader = SyncReader::new(input_path)?;

        let mut applied = 0usize;
        let mut rejected = 0usize;
        for result in reader {
            match result {
                Ok(command) => {
                    let kind = command.kind();
                    match engine.apply(command) {
                        Ok(()) => applied += 1,
                        Err(e) => {
                            rejected += 1;
                            warn!(kind, error = %e, "journal command rejected");
                        }
                    }
                }
                Err(e) => {
                    rejected += 1;
                    warn!(error = %e, "skipping journal row");
                }
            }
        }

        info!(applied, rejected, "journal replayed");
        write_report(&engine, self.report, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "type,user,other,group,amount,split,shares,note\n";

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn dinner_journal() -> String {
        format!(
            "{}user,ann\nuser,bo\nuser,cy\n\
             group,ann,,flat,,,bo;cy,\n\
             expense,ann,,flat,90.00,equal,ann;bo;cy,Dinner\n",
            HEADER
        )
    }

    fn run(report: ReportKind, journal: &str) -> String {
        let file = create_temp_csv(journal);
        let mut output = Vec::new();
        SyncProcessingStrategy::new(report)
            .process(file.path(), &mut output)
            .unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_sync_strategy_debts_report() {
        let output = run(ReportKind::Debts, &dinner_journal());

        assert_eq!(
            output,
            "group,debtor,creditor,amount\nflat,bo,ann,30.00\nflat,cy,ann,30.00\n"
        );
    }

    #[test]
    fn test_sync_strategy_balances_report() {
        let output = run(ReportKind::Balances, &dinner_journal());

        assert_eq!(
            output,
            "group,user,balance\nflat,ann,60.00\nflat,bo,-30.00\nflat,cy,-30.00\n"
        );
    }

    #[test]
    fn test_sync_strategy_skips_bad_rows() {
        let journal = format!(
            "{}bogus,ann\nsettle,bo,ann,flat,10.00\nsettle,bo,bo,flat,5.00\n",
            dinner_journal()
        );

        let output = run(ReportKind::Debts, &journal);

        assert_eq!(
            output,
            "group,debtor,creditor,amount\nflat,bo,ann,20.00\nflat,cy,ann,30.00\n"
        );
    }

    #[test]
    fn test_sync_strategy_handles_missing_file() {
        let strategy = SyncProcessingStrategy::new(ReportKind::Debts);
        let mut output = Vec::new();

        let result = strategy.process(Path::new("nonexistent.csv"), &mut output);

        match result {
            Err(LedgerError::IoError { message }) => {
                assert!(message.contains("Failed to open file"))
            }
            other => panic!("expected IoError, got {:?}", other),
        }
    }
}
