//! Thread-safe in-memory store
//!
//! `InMemoryStore` implements every store collaborator trait so the engine
//! can run without a database: journal replays, tests and benchmarks all
//! use it.
//!
//! # Concurrency
//!
//! The user registry lives in `DashMap`s, so registrations and lookups of
//! different users proceed without a global lock. Username and email
//! uniqueness are claimed through the map's entry API, which gives the
//! same first-writer-wins outcome as a unique constraint.
//!
//! Everything else (groups, associations, expenses, settlements, entries)
//! lives in one table set behind a `RwLock`. A [`WriteBatch`] is validated
//! and applied under a single write guard, so readers see either none of
//! a batch or all of it.

use crate::core::traits::{
    AccountStore, ExpenseStore, FriendStore, GroupHistory, GroupStore, LedgerStore,
    SettlementStore, SnapshotStore, UnitOfWork, WriteBatch, WriteOp,
};
use crate::types::{
    EntityKind, EntryPair, Expense, Friendship, Group, GroupId, LedgerEntry,
    LedgerError, Membership, Money, NewGroup, NewUser, Settlement, User, UserId,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Tables {
    groups: BTreeMap<GroupId, Group>,
    group_names: HashMap<String, GroupId>,
    memberships: Vec<Membership>,
    friendships: BTreeSet<Friendship>,
    expenses: Vec<Expense>,
    settlements: Vec<Settlement>,
    entries: Vec<LedgerEntry>,
}

impl Tables {
    fn has_membership(&self, membership: &Membership) -> bool {
        self.memberships.contains(membership)
    }
}

/// In-memory implementation of every store trait
#[derive(Debug)]
pub struct InMemoryStore {
    users: DashMap<UserId, User>,
    usernames: DashMap<String, UserId>,
    emails: DashMap<String, UserId>,
    next_user_id: AtomicU64,
    next_group_id: AtomicU64,
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            usernames: DashMap::new(),
            emails: DashMap::new(),
            next_user_id: AtomicU64::new(1),
            next_group_id: AtomicU64::new(1),
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Number of ledger entries posted so far
    pub fn entry_count(&self) -> Result<usize, LedgerError> {
        Ok(self.read()?.entries.len())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, LedgerError> {
        self.tables
            .read()
            .map_err(|_| LedgerError::storage("ledger tables read lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, LedgerError> {
        self.tables
            .write()
            .map_err(|_| LedgerError::storage("ledger tables write lock poisoned"))
    }

    /// Claim a unique key for `id`; true if the key was free
    fn claim(index: &DashMap<String, UserId>, key: &str, id: UserId) -> bool {
        *index.entry(key.to_string()).or_insert(id) == id
    }

    /// Check a batch against the current tables without changing them
    fn validate(tables: &Tables, ops: &[WriteOp]) -> Result<(), LedgerError> {
        let mut added = BTreeSet::new();
        let mut removed = BTreeSet::new();

        for op in ops {
            match op {
                WriteOp::SaveEntryPair(pair) => {
                    if !pair.is_balanced() {
                        return Err(LedgerError::storage(format!(
                            "refusing unbalanced entry pair {}",
                            pair.reference_id()
                        )));
                    }
                }
                WriteOp::AddMembership(membership) => {
                    if !tables.groups.contains_key(&membership.group_id) {
                        return Err(LedgerError::not_found(
                            EntityKind::Group,
                            membership.group_id,
                        ));
                    }
                }
                WriteOp::AddFriendship(friendship) => {
                    let exists = added.contains(friendship)
                        || (tables.friendships.contains(friendship)
                            && !removed.contains(friendship));
                    if exists {
                        let (user, other) = friendship.users();
                        return Err(LedgerError::duplicate_relationship(user, other));
                    }
                    removed.remove(friendship);
                    added.insert(*friendship);
                }
                WriteOp::RemoveFriendship(friendship) => {
                    added.remove(friendship);
                    removed.insert(*friendship);
                }
                WriteOp::SaveExpense(_) | WriteOp::SaveSettlement(_) => {}
            }
        }

        Ok(())
    }

    fn apply(tables: &mut Tables, ops: Vec<WriteOp>) {
        for op in ops {
            match op {
                WriteOp::SaveExpense(expense) => tables.expenses.push(expense),
                WriteOp::SaveSettlement(settlement) => tables.settlements.push(settlement),
                WriteOp::SaveEntryPair(EntryPair { debit, credit }) => {
                    tables.entries.push(debit);
                    tables.entries.push(credit);
                }
                WriteOp::AddMembership(membership) => {
                    if !tables.has_membership(&membership) {
                        tables.memberships.push(membership);
                    }
                }
                WriteOp::AddFriendship(friendship) => {
                    tables.friendships.insert(friendship);
                }
                WriteOp::RemoveFriendship(friendship) => {
                    tables.friendships.remove(&friendship);
                }
            }
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountStore for InMemoryStore {
    fn insert_user(&self, user: NewUser, created_at: DateTime<Utc>) -> Result<User, LedgerError> {
        let id = self.next_user_id.fetch_add(1, Ordering::SeqCst);

        if !Self::claim(&self.usernames, &user.username, id) {
            return Err(LedgerError::already_exists(EntityKind::User, &user.username));
        }
        if !Self::claim(&self.emails, &user.email, id) {
            self.usernames.remove(&user.username);
            return Err(LedgerError::already_exists(EntityKind::User, &user.email));
        }

        let user = User {
            id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            created_at,
        };
        self.users.insert(id, user.clone());
        Ok(user)
    }

    fn get_user(&self, id: UserId) -> Result<User, LedgerError> {
        self.users
            .get(&id)
            .map(|user| user.clone())
            .ok_or_else(|| LedgerError::not_found(EntityKind::User, id))
    }

    fn find_user_by_username(&self, username: &str) -> Result<Option<User>, LedgerError> {
        let id = match self.usernames.get(username) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.users.get(&id).map(|user| user.clone()))
    }

    fn find_users_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, LedgerError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.users.get(id).map(|user| user.clone()))
            .collect())
    }

    fn all_users(&self) -> Result<Vec<User>, LedgerError> {
        let mut users: Vec<User> = self.users.iter().map(|user| user.clone()).collect();
        users.sort_by_key(|user| user.id);
        Ok(users)
    }
}

impl GroupStore for InMemoryStore {
    fn insert_group(&self, group: NewGroup, created_at: DateTime<Utc>) -> Result<Group, LedgerError> {
        let mut tables = self.write()?;

        if tables.group_names.contains_key(&group.name) {
            return Err(LedgerError::already_exists(EntityKind::Group, &group.name));
        }

        let id = self.next_group_id.fetch_add(1, Ordering::SeqCst);
        let record = Group {
            id,
            name: group.name,
            description: group.description,
            created_by: group.created_by,
            created_at,
        };

        tables.group_names.insert(record.name.clone(), id);
        tables.groups.insert(id, record.clone());
        for user_id in std::iter::once(group.created_by).chain(group.member_ids) {
            let membership = Membership {
                group_id: id,
                user_id,
            };
            if !tables.has_membership(&membership) {
                tables.memberships.push(membership);
            }
        }

        Ok(record)
    }

    fn get_group(&self, id: GroupId) -> Result<Group, LedgerError> {
        self.read()?
            .groups
            .get(&id)
            .cloned()
            .ok_or_else(|| LedgerError::not_found(EntityKind::Group, id))
    }

    fn find_group_by_name(&self, name: &str) -> Result<Option<Group>, LedgerError> {
        let tables = self.read()?;
        Ok(tables
            .group_names
            .get(name)
            .and_then(|id| tables.groups.get(id))
            .cloned())
    }

    fn members_of(&self, group_id: GroupId) -> Result<Vec<UserId>, LedgerError> {
        Ok(self
            .read()?
            .memberships
            .iter()
            .filter(|membership| membership.group_id == group_id)
            .map(|membership| membership.user_id)
            .collect())
    }

    fn groups_of(&self, user_id: UserId) -> Result<Vec<Group>, LedgerError> {
        let tables = self.read()?;
        Ok(tables
            .memberships
            .iter()
            .filter(|membership| membership.user_id == user_id)
            .filter_map(|membership| tables.groups.get(&membership.group_id))
            .cloned()
            .collect())
    }

    fn all_groups(&self) -> Result<Vec<Group>, LedgerError> {
        Ok(self.read()?.groups.values().cloned().collect())
    }
}

impl FriendStore for InMemoryStore {
    fn are_friends(&self, a: UserId, b: UserId) -> Result<bool, LedgerError> {
        Ok(self.read()?.friendships.contains(&Friendship::between(a, b)))
    }

    fn friends_of(&self, user_id: UserId) -> Result<Vec<UserId>, LedgerError> {
        Ok(self
            .read()?
            .friendships
            .iter()
            .filter_map(|friendship| friendship.other(user_id))
            .collect())
    }
}

impl ExpenseStore for InMemoryStore {
    fn save_expense(&self, expense: Expense) -> Result<Expense, LedgerError> {
        let mut batch = WriteBatch::new();
        batch.save_expense(expense.clone());
        self.commit(batch)?;
        Ok(expense)
    }

    fn find_expenses_by_group(&self, group_id: GroupId) -> Result<Vec<Expense>, LedgerError> {
        Ok(self
            .read()?
            .expenses
            .iter()
            .filter(|expense| expense.group_id == group_id)
            .cloned()
            .collect())
    }
}

impl LedgerStore for InMemoryStore {
    fn save_entry_pair(&self, pair: EntryPair) -> Result<(), LedgerError> {
        let mut batch = WriteBatch::new();
        batch.save_entry_pair(pair);
        self.commit(batch)
    }

    fn find_entries_by_user(&self, user_id: UserId) -> Result<Vec<LedgerEntry>, LedgerError> {
        Ok(self
            .read()?
            .entries
            .iter()
            .filter(|entry| entry.owner_user_id == user_id)
            .cloned()
            .collect())
    }

    fn find_entries_by_user_and_range(
        &self,
        user_id: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        Ok(self
            .read()?
            .entries
            .iter()
            .filter(|entry| {
                entry.owner_user_id == user_id && entry.created_at >= start && entry.created_at < end
            })
            .cloned()
            .collect())
    }

    fn sum_balance(&self, user_id: UserId) -> Result<Money, LedgerError> {
        self.read()?
            .entries
            .iter()
            .filter(|entry| entry.owner_user_id == user_id)
            .try_fold(Decimal::ZERO, |sum, entry| {
                sum.checked_add(entry.signed_amount())
                    .ok_or_else(|| LedgerError::arithmetic_overflow("sum balance"))
            })
    }
}

impl SettlementStore for InMemoryStore {
    fn save_settlement(&self, settlement: Settlement) -> Result<Settlement, LedgerError> {
        let mut batch = WriteBatch::new();
        batch.save_settlement(settlement.clone());
        self.commit(batch)?;
        Ok(settlement)
    }

    fn find_settlements_by_user(&self, user_id: UserId) -> Result<Vec<Settlement>, LedgerError> {
        let tables = self.read()?;
        Ok(newest_first(
            tables.settlements.iter().filter(|s| s.involves(user_id)),
        ))
    }

    fn find_settlements_between(&self, a: UserId, b: UserId) -> Result<Vec<Settlement>, LedgerError> {
        let tables = self.read()?;
        Ok(newest_first(
            tables.settlements.iter().filter(|s| s.is_between(a, b)),
        ))
    }

    fn find_settlements_by_group(&self, group_id: GroupId) -> Result<Vec<Settlement>, LedgerError> {
        Ok(self
            .read()?
            .settlements
            .iter()
            .filter(|settlement| settlement.group_id == group_id)
            .cloned()
            .collect())
    }
}

impl SnapshotStore for InMemoryStore {
    fn group_history(&self, group_id: GroupId) -> Result<GroupHistory, LedgerError> {
        let tables = self.read()?;

        if !tables.groups.contains_key(&group_id) {
            return Err(LedgerError::not_found(EntityKind::Group, group_id));
        }

        Ok(GroupHistory {
            members: tables
                .memberships
                .iter()
                .filter(|membership| membership.group_id == group_id)
                .map(|membership| membership.user_id)
                .collect(),
            expenses: tables
                .expenses
                .iter()
                .filter(|expense| expense.group_id == group_id)
                .cloned()
                .collect(),
            settlements: tables
                .settlements
                .iter()
                .filter(|settlement| settlement.group_id == group_id)
                .cloned()
                .collect(),
            entries: tables
                .entries
                .iter()
                .filter(|entry| entry.group_id == Some(group_id))
                .cloned()
                .collect(),
        })
    }
}

impl UnitOfWork for InMemoryStore {
    fn commit(&self, batch: WriteBatch) -> Result<(), LedgerError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut tables = self.write()?;
        Self::validate(&tables, batch.ops())?;
        Self::apply(&mut tables, batch.into_ops());
        Ok(())
    }
}

/// Later insertions win ties on timestamp
fn newest_first<'a>(settlements: impl DoubleEndedIterator<Item = &'a Settlement>) -> Vec<Settlement> {
    let mut found: Vec<Settlement> = settlements.rev().cloned().collect();
    found.sort_by(|a, b| b.settled_at.cmp(&a.settled_at));
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ledger_engine::{LedgerEngine, Posting};
    use crate::types::SettlementStatus;
    use chrono::{Duration, TimeZone};
    use rstest::{fixture, rstest};
    use std::str::FromStr;
    use uuid::Uuid;

    fn d(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 8, 30, 0).unwrap()
    }

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            email: format!("{}@example.com", name),
            full_name: name.to_uppercase(),
        }
    }

    #[fixture]
    fn store() -> InMemoryStore {
        let store = InMemoryStore::new();
        for name in ["alice", "bob", "carol"] {
            store.insert_user(new_user(name), t0()).unwrap();
        }
        store
    }

    fn pair(from: UserId, to: UserId, amount: &str) -> EntryPair {
        LedgerEngine::default()
            .prepare(Posting {
                from_user_id: from,
                to_user_id: to,
                amount: d(amount),
                description: "test".to_string(),
                source_expense_id: None,
                group_id: None,
            })
            .unwrap()
    }

    fn settlement(debtor: UserId, creditor: UserId, at: DateTime<Utc>) -> Settlement {
        Settlement {
            id: Uuid::new_v4(),
            debtor_id: debtor,
            creditor_id: creditor,
            group_id: 1,
            amount: d("5.00"),
            note: None,
            status: SettlementStatus::Completed,
            settled_at: at,
        }
    }

    #[rstest]
    fn test_users_get_sequential_ids(store: InMemoryStore) {
        let users = store.all_users().unwrap();

        assert_eq!(users.iter().map(|u| u.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(store.find_user_by_username("bob").unwrap().unwrap().id, 2);
        assert_eq!(store.find_user_by_username("dave").unwrap(), None);
    }

    #[rstest]
    fn test_duplicate_username_rejected(store: InMemoryStore) {
        let mut duplicate = new_user("alice");
        duplicate.email = "other@example.com".to_string();

        let result = store.insert_user(duplicate, t0());

        assert_eq!(result, Err(LedgerError::already_exists(EntityKind::User, "alice")));
        assert_eq!(store.all_users().unwrap().len(), 3);
    }

    #[rstest]
    fn test_duplicate_email_releases_username(store: InMemoryStore) {
        let mut duplicate = new_user("dave");
        duplicate.email = "alice@example.com".to_string();

        assert!(store.insert_user(duplicate, t0()).is_err());
        assert!(store.insert_user(new_user("dave"), t0()).is_ok());
    }

    #[rstest]
    fn test_get_missing_user(store: InMemoryStore) {
        assert_eq!(
            store.get_user(42),
            Err(LedgerError::not_found(EntityKind::User, 42))
        );
        assert_eq!(store.find_users_by_ids(&[3, 42, 1]).unwrap().len(), 2);
    }

    #[rstest]
    fn test_group_creation_adds_creator(store: InMemoryStore) {
        let group = store
            .insert_group(
                NewGroup {
                    name: "flat".into(),
                    description: "rent".into(),
                    created_by: 2,
                    member_ids: vec![1, 2, 1],
                },
                t0(),
            )
            .unwrap();

        assert_eq!(store.members_of(group.id).unwrap(), vec![2, 1]);
        assert_eq!(store.groups_of(1).unwrap(), vec![group.clone()]);
        assert_eq!(store.find_group_by_name("flat").unwrap(), Some(group));
        assert!(store.groups_of(3).unwrap().is_empty());
    }

    #[rstest]
    fn test_group_name_is_unique(store: InMemoryStore) {
        let new_group = || NewGroup {
            name: "flat".into(),
            description: String::new(),
            created_by: 1,
            member_ids: vec![],
        };
        store.insert_group(new_group(), t0()).unwrap();

        assert_eq!(
            store.insert_group(new_group(), t0()),
            Err(LedgerError::already_exists(EntityKind::Group, "flat"))
        );
    }

    #[rstest]
    fn test_friendship_lifecycle(store: InMemoryStore) {
        let mut add = WriteBatch::new();
        add.add_friendship(Friendship::between(1, 2));
        store.commit(add.clone()).unwrap();

        assert!(store.are_friends(2, 1).unwrap());
        assert_eq!(store.friends_of(1).unwrap(), vec![2]);
        assert_eq!(
            store.commit(add.clone()),
            Err(LedgerError::duplicate_relationship(1, 2))
        );

        let mut remove = WriteBatch::new();
        remove.remove_friendship(Friendship::between(2, 1));
        store.commit(remove.clone()).unwrap();
        store.commit(remove).unwrap();

        assert!(!store.are_friends(1, 2).unwrap());
        store.commit(add).unwrap();
    }

    #[rstest]
    fn test_failed_batch_writes_nothing(store: InMemoryStore) {
        let mut batch = WriteBatch::new();
        batch
            .save_entry_pair(pair(2, 1, "10.00"))
            .add_friendship(Friendship::between(1, 3))
            .add_friendship(Friendship::between(3, 1));

        let result = store.commit(batch);

        assert!(matches!(result, Err(LedgerError::DuplicateRelationship { .. })));
        assert_eq!(store.entry_count().unwrap(), 0);
        assert!(!store.are_friends(1, 3).unwrap());
    }

    #[rstest]
    fn test_unbalanced_pair_rejected(store: InMemoryStore) {
        let mut tampered = pair(2, 1, "10.00");
        tampered.credit.amount = d("9.99");

        let result = store.save_entry_pair(tampered);

        assert!(matches!(result, Err(LedgerError::StorageFailure { .. })));
        assert_eq!(store.entry_count().unwrap(), 0);
    }

    #[rstest]
    fn test_membership_requires_group(store: InMemoryStore) {
        let mut batch = WriteBatch::new();
        batch.add_membership(Membership {
            group_id: 9,
            user_id: 1,
        });

        assert_eq!(
            store.commit(batch),
            Err(LedgerError::not_found(EntityKind::Group, 9))
        );
    }

    #[rstest]
    fn test_sum_balance_and_range(store: InMemoryStore) {
        let mut early = pair(2, 1, "10.00");
        early.debit.created_at = t0();
        early.credit.created_at = t0();
        let mut late = pair(1, 2, "4.00");
        late.debit.created_at = t0() + Duration::days(1);
        late.credit.created_at = t0() + Duration::days(1);
        store.save_entry_pair(early).unwrap();
        store.save_entry_pair(late).unwrap();

        assert_eq!(store.sum_balance(1).unwrap(), d("6.00"));
        assert_eq!(store.sum_balance(2).unwrap(), d("-6.00"));
        assert_eq!(store.find_entries_by_user(1).unwrap().len(), 2);

        let in_range = store
            .find_entries_by_user_and_range(1, t0(), t0() + Duration::days(1))
            .unwrap();
        assert_eq!(in_range.len(), 1);
        assert_eq!(in_range[0].amount, d("10.00"));
    }

    #[rstest]
    fn test_settlements_newest_first(store: InMemoryStore) {
        let first = store.save_settlement(settlement(2, 1, t0())).unwrap();
        let second = store
            .save_settlement(settlement(1, 2, t0() + Duration::hours(1)))
            .unwrap();
        let unrelated = store.save_settlement(settlement(3, 1, t0())).unwrap();

        assert_eq!(
            store.find_settlements_between(1, 2).unwrap(),
            vec![second.clone(), first.clone()]
        );
        assert_eq!(
            store.find_settlements_by_user(1).unwrap(),
            vec![second, unrelated, first]
        );
        assert_eq!(store.find_settlements_by_group(1).unwrap().len(), 3);
    }

    fn group_pair(group_id: GroupId, from: UserId, to: UserId, amount: &str) -> EntryPair {
        let mut pair = pair(from, to, amount);
        pair.debit.group_id = Some(group_id);
        pair.credit.group_id = Some(group_id);
        pair
    }

    fn new_group(name: &str, created_by: UserId, member_ids: Vec<UserId>) -> NewGroup {
        NewGroup {
            name: name.to_string(),
            description: String::new(),
            created_by,
            member_ids,
        }
    }

    #[rstest]
    fn test_group_history_keeps_to_its_group(store: InMemoryStore) {
        let flat = store.insert_group(new_group("flat", 1, vec![2]), t0()).unwrap();
        let trip = store.insert_group(new_group("trip", 3, vec![1]), t0()).unwrap();
        store.save_entry_pair(group_pair(flat.id, 2, 1, "10.00")).unwrap();
        store.save_entry_pair(group_pair(trip.id, 1, 3, "4.00")).unwrap();
        store.save_settlement(settlement(2, 1, t0())).unwrap();

        let history = store.group_history(flat.id).unwrap();

        assert_eq!(history.members, vec![1, 2]);
        assert!(history.expenses.is_empty());
        assert_eq!(history.settlements.len(), 1);
        assert_eq!(history.entries.len(), 2);
        assert!(history.entries.iter().all(|e| e.group_id == Some(flat.id)));
    }

    #[rstest]
    fn test_group_history_unknown_group(store: InMemoryStore) {
        assert_eq!(
            store.group_history(42),
            Err(LedgerError::not_found(EntityKind::Group, 42))
        );
    }

    #[test]
    fn test_group_history_never_sees_half_a_batch() {
        let store = InMemoryStore::new();
        for i in 0..41 {
            store.insert_user(new_user(&format!("user-{}", i)), t0()).unwrap();
        }
        let group_id = store.insert_group(new_group("club", 1, vec![]), t0()).unwrap().id;

        std::thread::scope(|scope| {
            let writer = &store;
            scope.spawn(move || {
                for user_id in 2..=41 {
                    let mut batch = WriteBatch::new();
                    batch
                        .add_membership(Membership { group_id, user_id })
                        .save_entry_pair(group_pair(group_id, user_id, 1, "1.00"));
                    writer.commit(batch).unwrap();
                }
            });

            for _ in 0..4 {
                let reader = &store;
                scope.spawn(move || {
                    for _ in 0..200 {
                        let history = reader.group_history(group_id).unwrap();
                        assert_eq!(history.entries.len(), 2 * (history.members.len() - 1));
                        assert!(history
                            .entries
                            .iter()
                            .all(|entry| history.members.contains(&entry.owner_user_id)));
                    }
                });
            }
        });

        assert_eq!(store.group_history(group_id).unwrap().members.len(), 41);
    }

    #[test]
    fn test_concurrent_registration_assigns_unique_ids() {
        let store = InMemoryStore::new();

        std::thread::scope(|scope| {
            for worker in 0..8 {
                let store = &store;
                scope.spawn(move || {
                    for i in 0..25 {
                        store
                            .insert_user(new_user(&format!("user-{}-{}", worker, i)), t0())
                            .unwrap();
                    }
                });
            }
        });

        let users = store.all_users().unwrap();
        let ids: BTreeSet<UserId> = users.iter().map(|u| u.id).collect();
        assert_eq!(users.len(), 200);
        assert_eq!(ids.len(), 200);
    }

    #[test]
    fn test_concurrent_claims_have_one_winner() {
        let store = InMemoryStore::new();

        let outcomes: Vec<bool> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let store = &store;
                    scope.spawn(move || store.insert_user(new_user("taken"), t0()).is_ok())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
    }
}
