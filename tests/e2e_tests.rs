//! End-to-end integration tests
//!
//! These tests validate the complete journal replay pipeline using predefined
//! CSV fixtures. Each test:
//! 1. Reads input.csv from a fixture directory
//! 2. Replays every row through the engine
//! 3. Renders one report
//! 4. Compares actual output with expected_<report>.csv
//!
//! Test fixtures are located in tests/fixtures/ and cover:
//! - Happy path scenarios
//! - Exact and percentage splits
//! - Several groups sharing members
//! - Half-up rounding of shares
//! - Malformed and rejected rows
//! - Friendship and membership commands
//!
//! Each fixture is run with both the synchronous and the async strategy, for
//! every report.

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use split_ledger::cli::{ReportKind, StrategyType};
    use split_ledger::strategy::{create_strategy, BatchConfig};
    use std::fs;
    use std::io::Write;
    use std::path::Path;
    use tempfile::NamedTempFile;

    fn report_name(report: ReportKind) -> &'static str {
        match report {
            ReportKind::Balances => "balances",
            ReportKind::Debts => "debts",
            ReportKind::Wallets => "wallets",
        }
    }

    /// Replay tests/fixtures/{fixture_name}/input.csv and compare the report
    fn run_test_fixture(
        fixture_name: &str,
        strategy_type: StrategyType,
        config: Option<BatchConfig>,
        report: ReportKind,
    ) {
        let fixture_dir = format!("tests/fixtures/{}", fixture_name);
        let input_path = format!("{}/input.csv", fixture_dir);
        let expected_path = format!("{}/expected_{}.csv", fixture_dir, report_name(report));

        assert!(
            Path::new(&input_path).exists(),
            "Input file not found: {}",
            input_path
        );
        assert!(
            Path::new(&expected_path).exists(),
            "Expected file not found: {}",
            expected_path
        );

        let strategy = create_strategy(strategy_type, config, report);

        let mut temp_output = NamedTempFile::new().expect("Failed to create temp file");

        strategy
            .process(Path::new(&input_path), &mut temp_output)
            .unwrap_or_else(|e| panic!("Failed to replay journal: {}", e));

        temp_output.flush().expect("Failed to flush temp file");

        let actual_output = fs::read_to_string(temp_output.path())
            .unwrap_or_else(|e| panic!("Failed to read temp output file: {}", e));

        let expected_output = fs::read_to_string(&expected_path)
            .unwrap_or_else(|e| panic!("Failed to read expected file {}: {}", expected_path, e));

        assert_eq!(
            actual_output, expected_output,
            "\n\nOutput mismatch for fixture: {} (strategy: {:?}, report: {:?})\n\nActual output:\n{}\n\nExpected output:\n{}\n",
            fixture_name, strategy_type, report, actual_output, expected_output
        );
    }

    /// Every fixture, every report, both strategies
    #[rstest]
    #[case("happy_path")]
    #[case("mixed_splits")]
    #[case("multiple_groups")]
    #[case("rounding")]
    #[case("malformed_data")]
    #[case("friends_and_members")]
    #[case("settled_group")]
    #[case("empty_journal")]
    fn test_fixtures(
        #[case] fixture: &str,
        #[values(StrategyType::Sync, StrategyType::Async)] strategy: StrategyType,
        #[values(ReportKind::Balances, ReportKind::Debts, ReportKind::Wallets)] report: ReportKind,
    ) {
        run_test_fixture(fixture, strategy, None, report);
    }

    /// Tiny batches force groups to span many batches and barriers
    #[rstest]
    #[case("multiple_groups")]
    #[case("malformed_data")]
    #[case("friends_and_members")]
    fn test_fixtures_with_small_batches(
        #[case] fixture: &str,
        #[values(1, 2, 5)] batch_size: usize,
    ) {
        run_test_fixture(
            fixture,
            StrategyType::Async,
            Some(BatchConfig::new(batch_size, 4)),
            ReportKind::Debts,
        );
    }

    #[test]
    fn test_missing_input_is_fatal() {
        for strategy_type in [StrategyType::Sync, StrategyType::Async] {
            let strategy = create_strategy(strategy_type, None, ReportKind::Debts);
            let mut output = Vec::new();

            let result = strategy.process(Path::new("tests/fixtures/missing/input.csv"), &mut output);

            assert!(result.is_err(), "{:?} should fail on a missing file", strategy_type);
            assert!(output.is_empty());
        }
    }
}
