//! Double-entry ledger types
//!
//! Every financial event is posted as an [`EntryPair`]: one DEBIT owned by
//! the user whose balance goes down and one CREDIT owned by the user whose
//! balance goes up, sharing a reference id and an amount.

use super::expense::ExpenseId;
use super::money::Money;
use super::user::{GroupId, UserId};
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Ledger entry identifier
pub type EntryId = Uuid;

/// Correlation key shared by the two halves of a posting
pub type ReferenceId = Uuid;

/// Side of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryDirection {
    /// Owner's balance goes down
    Debit,
    /// Owner's balance goes up
    Credit,
}

impl fmt::Display for EntryDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryDirection::Debit => f.write_str("DEBIT"),
            EntryDirection::Credit => f.write_str("CREDIT"),
        }
    }
}

/// An immutable, append-only ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub owner_user_id: UserId,
    pub direction: EntryDirection,
    pub amount: Money,
    pub counterparty_user_id: UserId,
    pub reference_id: ReferenceId,
    pub source_expense_id: Option<ExpenseId>,
    /// Group the posting belongs to, when it came from a group event
    pub group_id: Option<GroupId>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Contribution of this entry to its owner's net balance
    pub fn signed_amount(&self) -> Money {
        match self.direction {
            EntryDirection::Credit => self.amount,
            EntryDirection::Debit => -self.amount,
        }
    }
}

/// The two halves of one posting, written atomically
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPair {
    pub debit: LedgerEntry,
    pub credit: LedgerEntry,
}

impl EntryPair {
    pub fn reference_id(&self) -> ReferenceId {
        self.debit.reference_id
    }

    /// Whether both halves agree on reference, amount and direction
    pub fn is_balanced(&self) -> bool {
        self.debit.direction == EntryDirection::Debit
            && self.credit.direction == EntryDirection::Credit
            && self.debit.reference_id == self.credit.reference_id
            && self.debit.amount == self.credit.amount
    }
}

/// A calendar month, used for monthly summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Returns `None` when `month` is not in `1..=12`
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| YearMonth { year, month })
    }

    /// The month containing `at`
    pub fn of(at: DateTime<Utc>) -> Self {
        YearMonth {
            year: at.year(),
            month: at.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// First instant of the month (inclusive)
    pub fn start(&self) -> DateTime<Utc> {
        month_start(self.year, self.month)
    }

    /// First instant of the following month (exclusive)
    pub fn end(&self) -> DateTime<Utc> {
        if self.month == 12 {
            month_start(self.year + 1, 1)
        } else {
            month_start(self.year, self.month + 1)
        }
    }
}

fn month_start(year: i32, month: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = String;

    /// Parse `YYYY-MM`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| format!("Invalid year-month '{}': expected YYYY-MM", s))?;
        let year: i32 = year
            .parse()
            .map_err(|_| format!("Invalid year in '{}'", s))?;
        let month: u32 = month
            .parse()
            .map_err(|_| format!("Invalid month in '{}'", s))?;
        YearMonth::new(year, month).ok_or_else(|| format!("Month out of range in '{}'", s))
    }
}

/// Spending summary of one user for one month
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlySummary {
    pub month: YearMonth,
    /// Sum of DEBIT entries
    pub total_spent: Money,
    /// Sum of CREDIT entries
    pub total_received: Money,
    /// `total_received - total_spent`
    pub net: Money,
    pub transaction_count: usize,
}

impl Serialize for YearMonth {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A user's ledger balance with display metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Wallet {
    pub user_id: UserId,
    pub username: String,
    pub balance: Money,
    pub currency: String,
}
