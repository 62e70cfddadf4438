//! Store collaborator contracts
//!
//! The ledger core never owns its persistence. It talks to these traits,
//! which a database-backed repository or the bundled
//! [`InMemoryStore`](crate::core::memory_store::InMemoryStore) implement.
//!
//! Single-record saves go through the per-store methods. Operations that
//! write several records (an expense with its postings, a settlement with
//! its reverse posting, a friendship) stage them in a [`WriteBatch`] and
//! hand it to [`UnitOfWork::commit`], which applies all of it or none of it.

use crate::types::{
    EntryPair, Expense, Friendship, Group, GroupId, LedgerEntry, LedgerError,
    Membership, Money, NewGroup, NewUser, Settlement, User, UserId,
};
use chrono::{DateTime, Utc};

/// Identity lookup for users
pub trait AccountStore: Send + Sync {
    /// Register a user; fails with `AlreadyExists` on a taken username or email
    fn insert_user(&self, user: NewUser, created_at: DateTime<Utc>) -> Result<User, LedgerError>;

    /// Fetch a user; fails with `NotFound`
    fn get_user(&self, id: UserId) -> Result<User, LedgerError>;

    fn find_user_by_username(&self, username: &str) -> Result<Option<User>, LedgerError>;

    /// Fetch the users that exist among `ids`, in the order given
    fn find_users_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, LedgerError>;

    fn all_users(&self) -> Result<Vec<User>, LedgerError>;
}

/// Groups and their membership association records
pub trait GroupStore: Send + Sync {
    /// Create a group and its initial memberships in one step
    ///
    /// Fails with `AlreadyExists` when the name is taken.
    fn insert_group(&self, group: NewGroup, created_at: DateTime<Utc>)
        -> Result<Group, LedgerError>;

    /// Fetch a group; fails with `NotFound`
    fn get_group(&self, id: GroupId) -> Result<Group, LedgerError>;

    fn find_group_by_name(&self, name: &str) -> Result<Option<Group>, LedgerError>;

    /// Members of a group in the order they joined
    fn members_of(&self, group_id: GroupId) -> Result<Vec<UserId>, LedgerError>;

    fn groups_of(&self, user_id: UserId) -> Result<Vec<Group>, LedgerError>;

    fn all_groups(&self) -> Result<Vec<Group>, LedgerError>;
}

/// Friendship association records
pub trait FriendStore: Send + Sync {
    fn are_friends(&self, a: UserId, b: UserId) -> Result<bool, LedgerError>;

    fn friends_of(&self, user_id: UserId) -> Result<Vec<UserId>, LedgerError>;
}

/// Append-only expense records
pub trait ExpenseStore: Send + Sync {
    fn save_expense(&self, expense: Expense) -> Result<Expense, LedgerError>;

    /// Expenses of a group in creation order
    fn find_expenses_by_group(&self, group_id: GroupId) -> Result<Vec<Expense>, LedgerError>;
}

/// Append-only ledger entries
pub trait LedgerStore: Send + Sync {
    /// Persist both halves of a posting atomically
    fn save_entry_pair(&self, pair: EntryPair) -> Result<(), LedgerError>;

    /// Entries owned by a user in posting order
    fn find_entries_by_user(&self, user_id: UserId) -> Result<Vec<LedgerEntry>, LedgerError>;

    /// Entries owned by a user with `start <= created_at < end`
    fn find_entries_by_user_and_range(
        &self,
        user_id: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>, LedgerError>;

    /// `sum(CREDIT) - sum(DEBIT)` over a user's entries
    fn sum_balance(&self, user_id: UserId) -> Result<Money, LedgerError>;
}

/// Append-only settlement records
pub trait SettlementStore: Send + Sync {
    fn save_settlement(&self, settlement: Settlement) -> Result<Settlement, LedgerError>;

    /// Settlements where the user is debtor or creditor, newest first
    fn find_settlements_by_user(&self, user_id: UserId) -> Result<Vec<Settlement>, LedgerError>;

    /// Settlements between two users in either direction, newest first
    fn find_settlements_between(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Vec<Settlement>, LedgerError>;

    /// Settlements of a group in creation order
    fn find_settlements_by_group(&self, group_id: GroupId)
        -> Result<Vec<Settlement>, LedgerError>;
}

/// Everything recorded for one group as of a single read
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupHistory {
    /// Members in the order they joined
    pub members: Vec<UserId>,
    /// Expenses in creation order
    pub expenses: Vec<Expense>,
    /// Settlements in creation order
    pub settlements: Vec<Settlement>,
    /// Both halves of every posting tagged with the group
    pub entries: Vec<LedgerEntry>,
}

/// Reads spanning several record kinds
pub trait SnapshotStore: Send + Sync {
    /// A group's members and history taken from one consistent view
    ///
    /// No write committed during the call is partially visible. Fails with
    /// `NotFound` when the group does not exist.
    fn group_history(&self, group_id: GroupId) -> Result<GroupHistory, LedgerError>;
}

/// One staged write of a [`WriteBatch`]
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    SaveExpense(Expense),
    SaveSettlement(Settlement),
    SaveEntryPair(EntryPair),
    /// Idempotent: an existing membership is left as is
    AddMembership(Membership),
    /// Unique: fails with `DuplicateRelationship` if the friendship exists
    AddFriendship(Friendship),
    /// Removing a friendship that does not exist is a no-op
    RemoveFriendship(Friendship),
}

/// Records staged for one atomic commit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_expense(&mut self, expense: Expense) -> &mut Self {
        self.ops.push(WriteOp::SaveExpense(expense));
        self
    }

    pub fn save_settlement(&mut self, settlement: Settlement) -> &mut Self {
        self.ops.push(WriteOp::SaveSettlement(settlement));
        self
    }

    pub fn save_entry_pair(&mut self, pair: EntryPair) -> &mut Self {
        self.ops.push(WriteOp::SaveEntryPair(pair));
        self
    }

    pub fn add_membership(&mut self, membership: Membership) -> &mut Self {
        self.ops.push(WriteOp::AddMembership(membership));
        self
    }

    pub fn add_friendship(&mut self, friendship: Friendship) -> &mut Self {
        self.ops.push(WriteOp::AddFriendship(friendship));
        self
    }

    pub fn remove_friendship(&mut self, friendship: Friendship) -> &mut Self {
        self.ops.push(WriteOp::RemoveFriendship(friendship));
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Atomic multi-record writes
pub trait UnitOfWork: Send + Sync {
    /// Apply every staged write, or none of them
    ///
    /// Readers never observe a partially applied batch. A failed commit
    /// leaves the store exactly as it was.
    fn commit(&self, batch: WriteBatch) -> Result<(), LedgerError>;
}

/// Everything the engine needs from its store
pub trait LedgerRepository:
    AccountStore
    + GroupStore
    + FriendStore
    + ExpenseStore
    + LedgerStore
    + SettlementStore
    + SnapshotStore
    + UnitOfWork
{
}

impl<T> LedgerRepository for T where
    T: AccountStore
        + GroupStore
        + FriendStore
        + ExpenseStore
        + LedgerStore
        + SettlementStore
        + SnapshotStore
        + UnitOfWork
{
}

/// Source of timestamps for new records
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant, for replays and tests
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
