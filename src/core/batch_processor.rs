//! Batch processing with group-based partitioning for async journal replay
//!
//! This module provides the `BatchProcessor` struct, which applies a batch of
//! journal commands concurrently while keeping the outcome identical to a
//! sequential replay.
//!
//! # Design
//!
//! A batch is cut into segments at every registry command (user
//! registration, friendship changes, group creation). Registry commands are
//! barriers: they run alone, in file order. The group-scoped commands
//! between two barriers are partitioned by group name; each group's
//! commands run sequentially in file order, and different groups run
//! concurrently on the tokio runtime.
//!
//! ```text
//! batch:  user  user  group  expense(A)  expense(B)  settle(A)  friend  member(B)
//!         ───── barriers ──  ───────── concurrent segment ──────  barrier  segment
//!                            A: expense, settle   B: expense
//! ```
//!
//! # Thread Safety
//!
//! The processor is cloneable and can be shared across async tasks. The
//! engine is held behind an `Arc` and its store synchronizes every commit.

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::engine::SplitEngine;
use crate::core::traits::LedgerRepository;
use crate::types::{JournalCommand, LedgerError};
use tracing::{error, warn};

/// Result of applying a single journal command
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// The command that was applied
    pub command: JournalCommand,

    /// Whether it succeeded
    pub result: Result<(), LedgerError>,
}

/// A run of commands that can be applied as a unit
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// A registry command applied on its own
    Barrier(JournalCommand),
    /// Group-scoped commands, partitioned by group
    Scoped(Vec<JournalCommand>),
}

/// Batch processor with group-based partitioning
pub struct BatchProcessor<S> {
    engine: Arc<SplitEngine<S>>,
}

impl<S> Clone for BatchProcessor<S> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
        }
    }
}

impl<S: LedgerRepository + 'static> BatchProcessor<S> {
    pub fn new(engine: Arc<SplitEngine<S>>) -> Self {
        Self { engine }
    }

    /// Cut a batch into barriers and concurrent segments, keeping file order
    pub fn segment(&self, batch: Vec<JournalCommand>) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut pending = Vec::new();

        for command in batch {
            if command.is_barrier() {
                if !pending.is_empty() {
                    segments.push(Segment::Scoped(std::mem::take(&mut pending)));
                }
                segments.push(Segment::Barrier(command));
            } else {
                pending.push(command);
            }
        }
        if !pending.is_empty() {
            segments.push(Segment::Scoped(pending));
        }

        segments
    }

    /// Partition group-scoped commands by group, keeping order within each group
    pub fn partition_by_group(
        &self,
        commands: Vec<JournalCommand>,
    ) -> HashMap<String, Vec<JournalCommand>> {
        let mut group_batches: HashMap<String, Vec<JournalCommand>> = HashMap::new();

        for command in commands {
            let group = command.group().unwrap_or_default().to_string();
            group_batches.entry(group).or_default().push(command);
        }

        group_batches
    }

    /// Apply one group's commands sequentially
    pub async fn process_group_commands(
        &self,
        commands: Vec<JournalCommand>,
    ) -> Vec<ProcessingResult> {
        commands
            .into_iter()
            .map(|command| self.apply_one(command))
            .collect()
    }

    /// Apply a whole batch
    ///
    /// Returns one result per command. Results of a concurrent segment are
    /// grouped by group, not interleaved in file order.
    pub async fn process_batch(&self, batch: Vec<JournalCommand>) -> Vec<ProcessingResult> {
        let mut results = Vec::new();

        for segment in self.segment(batch) {
            match segment {
                Segment::Barrier(command) => results.push(self.apply_one(command)),
                Segment::Scoped(commands) => {
                    results.extend(self.process_segment(commands).await);
                }
            }
        }

        results
    }

    async fn process_segment(&self, commands: Vec<JournalCommand>) -> Vec<ProcessingResult> {
        let group_batches = self.partition_by_group(commands);

        // Spawn one task per group
        let mut tasks = Vec::with_capacity(group_batches.len());
        for (_group, commands) in group_batches {
            let processor = self.clone();
            let task =
                tokio::spawn(async move { processor.process_group_commands(commands).await });
            tasks.push(task);
        }

        // Wait for every group before moving past the next barrier
        let mut results = Vec::new();
        for task in tasks {
            match task.await {
                Ok(group_results) => results.extend(group_results),
                Err(e) => error!(error = %e, "group task panicked"),
            }
        }

        results
    }

    fn apply_one(&self, command: JournalCommand) -> ProcessingResult {
        let result = self.engine.apply(command.clone());
        if let Err(e) = &result {
            warn!(command = command.kind(), error = %e, "skipped journal command");
        }
        ProcessingResult { command, result }
    }
}
