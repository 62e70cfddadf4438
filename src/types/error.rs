//! Error types for the split ledger
//!
//! This module defines every error the ledger core and its journal front end
//! can report. Messages carry the offending values so a rejected request can
//! be diagnosed from the message alone.
//!
//! # Error Categories
//!
//! - **Validation**: invalid splits, invalid amounts, self-references
//! - **Lookup**: missing users, groups or expenses
//! - **Conflict**: duplicate usernames, duplicate friendships
//! - **Storage**: failures reported by the store collaborator, never retried
//! - **Journal I/O**: file and CSV errors from the replay front end

use super::user::UserId;
use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

/// Kind of record a lookup or uniqueness check was about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    User,
    Group,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::User => "User",
            EntityKind::Group => "Group",
        };
        f.write_str(name)
    }
}

/// Main error type for the split ledger
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// The split of an expense is malformed
    ///
    /// Covers unknown policies, sums or percentages that do not match the
    /// total, non-positive amounts and empty or duplicated participants.
    #[error("Invalid split: {reason}")]
    InvalidSplit {
        /// What was wrong, including the offending values
        reason: String,
    },

    /// A ledger or settlement amount is not a positive number of cents
    #[error("Invalid amount {amount} for {context}")]
    InvalidAmount {
        amount: Decimal,
        /// Operation the amount was supplied to
        context: String,
    },

    /// A referenced record does not exist
    #[error("{entity} {key} not found")]
    NotFound { entity: EntityKind, key: String },

    /// A record with the same unique key already exists
    #[error("{entity} '{key}' already exists")]
    AlreadyExists { entity: EntityKind, key: String },

    /// Two users are already friends
    #[error("Users {user} and {other} are already friends")]
    DuplicateRelationship { user: UserId, other: UserId },

    /// A user tried to settle a debt with themselves
    #[error("User {user} cannot settle with themselves")]
    SelfSettlement { user: UserId },

    /// A user tried to form a relationship with themselves
    #[error("User {user} cannot {operation} themselves")]
    SelfReference { operation: String, user: UserId },

    /// The store collaborator failed
    ///
    /// Propagated unchanged; the core never retries a write.
    #[error("Storage failure: {message}")]
    StorageFailure { message: String },

    /// Checked decimal arithmetic overflowed
    #[error("Arithmetic overflow in {operation}")]
    ArithmeticOverflow { operation: String },

    /// I/O error while reading a journal or writing a report
    #[error("I/O error: {message}")]
    IoError { message: String },

    /// Journal CSV could not be parsed
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        line: Option<u64>,
        message: String,
    },
}

impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::IoError {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for LedgerError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        LedgerError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

impl LedgerError {
    /// Create an InvalidSplit error
    pub fn invalid_split(reason: impl Into<String>) -> Self {
        LedgerError::InvalidSplit {
            reason: reason.into(),
        }
    }

    /// Create an InvalidAmount error
    pub fn invalid_amount(amount: Decimal, context: &str) -> Self {
        LedgerError::InvalidAmount {
            amount,
            context: context.to_string(),
        }
    }

    /// Create a NotFound error
    pub fn not_found(entity: EntityKind, key: impl fmt::Display) -> Self {
        LedgerError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Create an AlreadyExists error
    pub fn already_exists(entity: EntityKind, key: impl fmt::Display) -> Self {
        LedgerError::AlreadyExists {
            entity,
            key: key.to_string(),
        }
    }

    /// Create a DuplicateRelationship error
    pub fn duplicate_relationship(user: UserId, other: UserId) -> Self {
        LedgerError::DuplicateRelationship { user, other }
    }

    /// Create a SelfSettlement error
    pub fn self_settlement(user: UserId) -> Self {
        LedgerError::SelfSettlement { user }
    }

    /// Create a SelfReference error
    pub fn self_reference(operation: &str, user: UserId) -> Self {
        LedgerError::SelfReference {
            operation: operation.to_string(),
            user,
        }
    }

    /// Create a StorageFailure error
    pub fn storage(message: impl Into<String>) -> Self {
        LedgerError::StorageFailure {
            message: message.into(),
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str) -> Self {
        LedgerError::ArithmeticOverflow {
            operation: operation.to_string(),
        }
    }

    /// Whether the error came from validating caller input
    ///
    /// Validation errors are raised before any write and leave the store
    /// untouched.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LedgerError::InvalidSplit { .. }
                | LedgerError::InvalidAmount { .. }
                | LedgerError::SelfSettlement { .. }
                | LedgerError::SelfReference { .. }
        )
    }
}
