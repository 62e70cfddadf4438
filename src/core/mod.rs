//! Core business logic module
//!
//! This module contains the ledger components:
//! - `traits` - Store collaborator contracts, unit of work and clock
//! - `split_calculator` - Pure expense splitting
//! - `ledger_engine` - Balanced double-entry postings
//! - `balance_aggregator` - Net balances folded from history
//! - `debt_netting` - Greedy settlement plans
//! - `engine` - Orchestration of every ledger operation
//! - `replay` - Journal command application
//! - `memory_store` - Thread-safe in-memory store
//! - `batch_processor` - Group-partitioned concurrent journal replay

pub mod balance_aggregator;
pub mod batch_processor;
pub mod debt_netting;
pub mod engine;
pub mod ledger_engine;
pub mod memory_store;
pub mod replay;
pub mod split_calculator;
pub mod traits;

pub use balance_aggregator::{BalanceAggregator, BalanceMap};
pub use batch_processor::{BatchProcessor, ProcessingResult};
pub use debt_netting::DebtNettingEngine;
pub use engine::{EngineConfig, SplitEngine};
pub use ledger_engine::{LedgerEngine, Posting};
pub use memory_store::InMemoryStore;
pub use split_calculator::SplitCalculator;
pub use traits::{
    AccountStore, Clock, ExpenseStore, FixedClock, FriendStore, GroupHistory, GroupStore,
    LedgerRepository, LedgerStore, SettlementStore, SnapshotStore, SystemClock, UnitOfWork,
    WriteBatch, WriteOp,
};
