//! Expense-related types for the split ledger
//!
//! An expense is an immutable record of one payment made on behalf of a
//! group. How the cost is shared is captured by a [`Split`], a closed set of
//! split rules that the split calculator handles exhaustively.

use super::error::LedgerError;
use super::money::Money;
use super::user::{GroupId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Expense identifier
pub type ExpenseId = Uuid;

/// The rule used to share an expense between participants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SplitPolicy {
    /// Every participant owes the same rounded share
    Equal,
    /// Every participant owes an explicit amount
    Exact,
    /// Every participant owes a percentage of the total
    Percentage,
}

impl fmt::Display for SplitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SplitPolicy::Equal => "EQUAL",
            SplitPolicy::Exact => "EXACT",
            SplitPolicy::Percentage => "PERCENTAGE",
        };
        f.write_str(name)
    }
}

impl FromStr for SplitPolicy {
    type Err = LedgerError;

    /// Parse a policy name, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EQUAL" => Ok(SplitPolicy::Equal),
            "EXACT" => Ok(SplitPolicy::Exact),
            "PERCENTAGE" => Ok(SplitPolicy::Percentage),
            _ => Err(LedgerError::invalid_split(format!(
                "unknown split policy '{}'",
                s
            ))),
        }
    }
}

/// One participant line of an exact or percentage split
///
/// `value` is an amount of money for [`Split::Exact`] and a percentage in
/// `(0, 100]` for [`Split::Percentage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    pub user_id: UserId,
    pub value: Decimal,
}

impl Share {
    pub fn new(user_id: UserId, value: Decimal) -> Self {
        Share { user_id, value }
    }
}

/// How an expense is shared
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Split {
    Equal { participants: Vec<UserId> },
    Exact { shares: Vec<Share> },
    Percentage { shares: Vec<Share> },
}

impl Split {
    /// Build a split from a policy and loosely-typed participant details
    ///
    /// Equal splits ignore the values; exact and percentage splits require
    /// one for every participant.
    pub fn from_details(
        policy: SplitPolicy,
        details: Vec<(UserId, Option<Decimal>)>,
    ) -> Result<Self, LedgerError> {
        match policy {
            SplitPolicy::Equal => Ok(Split::Equal {
                participants: details.into_iter().map(|(user_id, _)| user_id).collect(),
            }),
            SplitPolicy::Exact | SplitPolicy::Percentage => {
                let shares = details
                    .into_iter()
                    .map(|(user_id, value)| {
                        value.map(|value| Share::new(user_id, value)).ok_or_else(|| {
                            LedgerError::invalid_split(format!(
                                "{} split requires a value for participant {}",
                                policy, user_id
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(if policy == SplitPolicy::Exact {
                    Split::Exact { shares }
                } else {
                    Split::Percentage { shares }
                })
            }
        }
    }

    /// The policy this split follows
    pub fn policy(&self) -> SplitPolicy {
        match self {
            Split::Equal { .. } => SplitPolicy::Equal,
            Split::Exact { .. } => SplitPolicy::Exact,
            Split::Percentage { .. } => SplitPolicy::Percentage,
        }
    }

    /// Participant ids in first-seen order, without duplicates
    pub fn participant_ids(&self) -> Vec<UserId> {
        let ids: Box<dyn Iterator<Item = UserId> + '_> = match self {
            Split::Equal { participants } => Box::new(participants.iter().copied()),
            Split::Exact { shares } | Split::Percentage { shares } => {
                Box::new(shares.iter().map(|share| share.user_id))
            }
        };
        let mut seen = Vec::new();
        for id in ids {
            if !seen.contains(&id) {
                seen.push(id);
            }
        }
        seen
    }
}

/// An immutable, append-only expense record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub description: String,
    pub total_amount: Money,
    pub payer_id: UserId,
    pub group_id: GroupId,
    pub split: Split,
    pub created_at: DateTime<Utc>,
}

impl Expense {
    pub fn split_policy(&self) -> SplitPolicy {
        self.split.policy()
    }

    pub fn participant_ids(&self) -> Vec<UserId> {
        self.split.participant_ids()
    }
}

/// Request to record a new expense
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExpense {
    pub description: String,
    pub total_amount: Money,
    pub payer_id: UserId,
    pub group_id: GroupId,
    pub split: Split,
}

/// What one participant owes the payer of an expense
///
/// The payer never owes themself, so no obligation is ever emitted for the
/// payer's own share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obligation {
    pub owing_user_id: UserId,
    pub amount: Money,
}
