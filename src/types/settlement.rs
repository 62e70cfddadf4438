//! Settlement types
//!
//! A settlement records a debtor paying a creditor back. It is created once
//! and never edited; its ledger effect is the reverse posting of a debt.

use super::money::Money;
use super::user::{GroupId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Settlement identifier
pub type SettlementId = Uuid;

/// Lifecycle status of a settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SettlementStatus {
    Completed,
    Cancelled,
}

/// An immutable settlement record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: SettlementId,
    pub debtor_id: UserId,
    pub creditor_id: UserId,
    pub group_id: GroupId,
    pub amount: Money,
    pub note: Option<String>,
    pub status: SettlementStatus,
    pub settled_at: DateTime<Utc>,
}

impl Settlement {
    /// Whether the settlement moved money between `a` and `b`, either way
    pub fn is_between(&self, a: UserId, b: UserId) -> bool {
        (self.debtor_id == a && self.creditor_id == b)
            || (self.debtor_id == b && self.creditor_id == a)
    }

    pub fn involves(&self, user: UserId) -> bool {
        self.debtor_id == user || self.creditor_id == user
    }
}

/// Request to settle a debt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSettlement {
    pub debtor_id: UserId,
    pub creditor_id: UserId,
    pub group_id: GroupId,
    pub amount: Money,
    pub note: Option<String>,
}

/// One payment computed by debt netting, in user ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transfer {
    pub debtor_id: UserId,
    pub creditor_id: UserId,
    pub amount: Money,
}

/// One payment of a settlement plan, resolved to usernames for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementPlanEntry {
    pub debtor_id: UserId,
    pub debtor_username: String,
    pub creditor_id: UserId,
    pub creditor_username: String,
    pub amount: Money,
}
