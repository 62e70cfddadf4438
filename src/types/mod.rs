//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `money`: Decimal money alias and rounding helpers
//! - `user`: Users, groups and association records
//! - `expense`: Expenses, split rules and obligations
//! - `ledger`: Double-entry ledger entries and summaries
//! - `settlement`: Settlements and settlement plans
//! - `journal`: Replayable journal commands
//! - `error`: Error types for the split ledger

pub mod error;
pub mod expense;
pub mod journal;
pub mod ledger;
pub mod money;
pub mod settlement;
pub mod user;

pub use error::{EntityKind, LedgerError};
pub use expense::{Expense, ExpenseId, NewExpense, Obligation, Share, Split, SplitPolicy};
pub use journal::{JournalCommand, JournalShare};
pub use ledger::{
    EntryDirection, EntryId, EntryPair, LedgerEntry, MonthlySummary, ReferenceId, Wallet,
    YearMonth,
};
pub use money::Money;
pub use settlement::{
    NewSettlement, Settlement, SettlementId, SettlementPlanEntry, SettlementStatus, Transfer,
};
pub use user::{Friendship, Group, GroupId, Membership, NewGroup, NewUser, User, UserId};
