//! Identity types: users, groups and their association records
//!
//! Friendship and group membership are explicit association records fetched
//! by key through the store. No type here holds a reference to another
//! entity, only its id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User identifier, assigned by the account store
pub type UserId = u64;

/// Group identifier, assigned by the group store
pub type GroupId = u64;

/// A registered user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
}

/// Registration data for a user that has no id yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
}

/// An expense-sharing group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub description: String,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

/// Creation data for a group that has no id yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGroup {
    pub name: String,
    pub description: String,
    pub created_by: UserId,
    /// Initial members; the creator is always added even if absent here
    pub member_ids: Vec<UserId>,
}

/// Association record: `user_id` belongs to `group_id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Membership {
    pub group_id: GroupId,
    pub user_id: UserId,
}

/// Association record: two users are friends
///
/// Stored in canonical order (`low < high`) so the pair `(a, b)` and
/// `(b, a)` map to the same record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Friendship {
    low: UserId,
    high: UserId,
}

impl Friendship {
    /// Build the canonical friendship record for two users
    pub fn between(a: UserId, b: UserId) -> Self {
        Friendship {
            low: a.min(b),
            high: a.max(b),
        }
    }

    /// Both sides, lower id first
    pub fn users(&self) -> (UserId, UserId) {
        (self.low, self.high)
    }

    /// Whether `user` is one side of this friendship
    pub fn involves(&self, user: UserId) -> bool {
        self.low == user || self.high == user
    }

    /// The side of the friendship that is not `user`
    pub fn other(&self, user: UserId) -> Option<UserId> {
        if self.low == user {
            Some(self.high)
        } else if self.high == user {
            Some(self.low)
        } else {
            None
        }
    }
}
