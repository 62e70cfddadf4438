//! Asynchronous batch replay strategy
//!
//! This module provides a multi-threaded implementation of the
//! ProcessingStrategy trait. Journal rows are read in batches; within a batch
//! the commands of different groups are replayed in parallel.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncReader (batch CSV reading)
//!     ├── BatchProcessor (barrier segmentation + group partitioning)
//!     └── SplitEngine<InMemoryStore> (shared, thread-safe)
//! ```
//!
//! # Ordering
//!
//! - Batches are processed one after another
//! - Registry commands (users, friendships, group creation) act as barriers
//! - Between barriers, each group's commands run in journal order on their own task
//!
//! Every group therefore observes its commands in file order, and the final
//! state matches the synchronous strategy.

use crate::cli::ReportKind;
use crate::core::{BatchProcessor, InMemoryStore, SplitEngine};
use crate::io::async_reader::AsyncReader;
use crate::strategy::{write_report, ProcessingStrategy};
use crate::types::LedgerError;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Configuration for batch processing
#[derive(Clone, Debug)]
pub struct BatchConfig {
    /// Number of journal rows per batch
    pub batch_size: usize,
    /// Worker threads of the runtime
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig with custom values
    ///
    /// Zero values are replaced by the defaults.
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                batch_size,
                default = default.batch_size,
                "invalid batch size, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            warn!(
                max_concurrent_batches,
                default = default.max_concurrent_batches,
                "invalid worker count, using default"
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Batched replay with per-group parallelism
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    config: BatchConfig,
    report: ReportKind,
}

impl AsyncProcessingStrategy {
    pub fn new(config: BatchConfig, report: ReportKind) -> Self {
        Self { config, report }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    /// Replay the journal and write the selected report
    ///
    /// Fatal errors (file not found, runtime creation) are returned
    /// immediately. Rejected commands are logged and replay continues.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), LedgerError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .build()
            .map_err(|e| LedgerError::IoError {
                message: format!("Failed to create tokio runtime: {}", e),
            })?;

        let engine = runtime.block_on(async {
            let engine = Arc::new(SplitEngine::new(Arc::new(InMemoryStore::new())));
            let processor = BatchProcessor::new(Arc::clone(&engine));

            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| LedgerError::IoError {
                    message: format!("Failed to open file '{}': {}", input_path.display(), e),
                })?;
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            let (mut applied, mut rejected) = (0usize, 0usize);
            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                // Wait for the whole batch so groups spanning batches stay ordered
                for outcome in processor.process_batch(batch).await {
                    if outcome.result.is_ok() {
                        applied += 1;
                    } else {
                        rejected += 1;
                    }
                }
            }

            info!(applied, rejected, "journal replayed");
            Ok::<_, LedgerError>(engine)
        })?;

        write_report(&*engine, self.report, output)
    }
}
