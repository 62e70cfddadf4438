//! Split Ledger Library
//! # Overview
//!
//! This library tracks shared expenses inside groups of users, keeps a
//! double-entry ledger of who paid for whom, and reduces each group's
//! balances to a minimal set of settle-up transfers. Journals of commands can
//! be replayed from CSV with either a sync or an async strategy.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (User, Group, Expense, LedgerEntry, Settlement, etc.)
//! - [`cli`] - CLI arguments parsing
//! - [`core`] - Business logic components:
//!   - [`core::split_calculator`] - Divides an expense into per-participant obligations
//!   - [`core::ledger_engine`] - Builds balanced debit/credit pairs
//!   - [`core::balance_aggregator`] - Net balances, group balances, monthly summaries
//!   - [`core::debt_netting`] - Minimal transfer plans
//!   - [`core::engine`] - Orchestration of all user-facing operations
//!   - [`core::memory_store`] - Thread-safe in-memory persistence
//! - [`io`] - Journal CSV parsing and report output
//! - [`strategy`] - Complete replay pipelines
//!
//! # Split Policies
//!
//! - **Equal**: each participant owes the total divided evenly, rounded half-up to the cent
//! - **Exact**: explicit amounts that must add up to the total
//! - **Percentage**: percentages that must add up to 100
//!
//! # Balances
//!
//! A positive balance means the group owes the user money; a negative
//! balance means the user owes the group. Balances of a group always sum to
//! zero.

pub mod cli;
pub mod core;
pub mod io;
pub mod strategy;
pub mod types;

pub use core::{
    BalanceAggregator, DebtNettingEngine, InMemoryStore, LedgerEngine, SplitCalculator,
    SplitEngine,
};
pub use io::{write_balances_csv, write_debts_csv, write_wallets_csv};
pub use types::{
    Expense, Group, GroupId, JournalCommand, LedgerEntry, LedgerError, Money, Settlement,
    SettlementPlanEntry, Split, SplitPolicy, Transfer, User, UserId,
};
