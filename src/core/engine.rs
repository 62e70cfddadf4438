//! Split ledger engine
//!
//! This module provides the `SplitEngine` that orchestrates every operation
//! the ledger exposes upward, by coordinating the split calculator, the
//! ledger engine, the balance aggregator and the debt netting engine over
//! a store collaborator.
//!
//! The engine enforces business rules such as:
//! - All validation runs before the first store write
//! - Every mutation commits as one atomic unit of work
//! - A payer never owes themself and a user never settles with themself

use crate::core::balance_aggregator::{BalanceAggregator, BalanceMap};
use crate::core::debt_netting::DebtNettingEngine;
use crate::core::ledger_engine::{LedgerEngine, Posting};
use crate::core::split_calculator::SplitCalculator;
use crate::core::traits::{Clock, LedgerRepository, SystemClock, WriteBatch};
use crate::types::money::{self, CENT};
use crate::types::{
    EntityKind, Expense, Friendship, Group, GroupId, LedgerEntry, LedgerError, Membership, Money,
    MonthlySummary, NewExpense, NewGroup, NewSettlement, NewUser, Obligation, Settlement,
    SettlementPlanEntry, SettlementStatus, Split, User, UserId, Wallet, YearMonth,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Currency reported on wallets
pub const DEFAULT_CURRENCY: &str = "USD";

/// Numeric policy of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Balances smaller than this are treated as settled when netting
    pub settle_threshold: Money,
    /// Allowed gap between the sum of an exact split and its total
    pub exact_tolerance: Money,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            settle_threshold: CENT,
            exact_tolerance: CENT,
        }
    }
}

/// Shared-expense ledger engine
///
/// Generic over its store so the same rules run against the bundled
/// in-memory store or any other [`LedgerRepository`]. The engine holds no
/// mutable state of its own and is `Send + Sync` whenever the store is, so
/// one instance can be shared behind an `Arc` by concurrent callers.
pub struct SplitEngine<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    calculator: SplitCalculator,
    ledger: LedgerEngine,
    aggregator: BalanceAggregator,
    netting: DebtNettingEngine,
}

impl<S: LedgerRepository> SplitEngine<S> {
    /// Create an engine with default policy and the system clock
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, Arc::new(SystemClock), EngineConfig::default())
    }

    /// Create an engine with an explicit clock and policy
    ///
    /// # Arguments
    ///
    /// * `store` - Store collaborator every operation reads and writes
    /// * `clock` - Source of timestamps for new records
    /// * `config` - Netting threshold and exact-split tolerance
    ///
    /// A non-positive `settle_threshold` is replaced by one cent; [`config`]
    /// reports the values in effect.
    ///
    /// [`config`]: SplitEngine::config
    pub fn with_config(store: Arc<S>, clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
        let calculator = SplitCalculator::with_tolerance(config.exact_tolerance);
        let netting = DebtNettingEngine::with_threshold(config.settle_threshold);
        SplitEngine {
            store,
            ledger: LedgerEngine::new(Arc::clone(&clock)),
            clock,
            config: EngineConfig {
                settle_threshold: netting.threshold(),
                exact_tolerance: config.exact_tolerance.abs(),
            },
            calculator,
            aggregator: BalanceAggregator::new(calculator),
            netting,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ----- users and groups -----

    /// Register a new user
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` if the username or email is taken.
    pub fn register_user(&self, user: NewUser) -> Result<User, LedgerError> {
        let user = self.store.insert_user(user, self.clock.now())?;
        info!(user_id = user.id, username = %user.username, "registered user");
        Ok(user)
    }

    pub fn get_user(&self, user_id: UserId) -> Result<User, LedgerError> {
        self.store.get_user(user_id)
    }

    pub fn list_users(&self) -> Result<Vec<User>, LedgerError> {
        self.store.all_users()
    }

    /// Create a group; the creator is always a member
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the creator or any initial member does not
    /// exist, and `AlreadyExists` if the group name is taken.
    pub fn create_group(&self, group: NewGroup) -> Result<Group, LedgerError> {
        self.store.get_user(group.created_by)?;
        self.ensure_users_exist(&group.member_ids)?;

        let group = self.store.insert_group(group, self.clock.now())?;
        info!(group_id = group.id, name = %group.name, created_by = group.created_by, "created group");
        Ok(group)
    }

    /// Add a user to a group; adding an existing member is a no-op
    pub fn add_member(&self, group_id: GroupId, user_id: UserId) -> Result<(), LedgerError> {
        self.store.get_group(group_id)?;
        self.store.get_user(user_id)?;

        let mut batch = WriteBatch::new();
        batch.add_membership(Membership { group_id, user_id });
        self.store.commit(batch)?;

        info!(group_id, user_id, "added group member");
        Ok(())
    }

    pub fn get_group(&self, group_id: GroupId) -> Result<Group, LedgerError> {
        self.store.get_group(group_id)
    }

    pub fn list_groups(&self) -> Result<Vec<Group>, LedgerError> {
        self.store.all_groups()
    }

    /// Groups a user belongs to
    pub fn get_user_groups(&self, user_id: UserId) -> Result<Vec<Group>, LedgerError> {
        self.store.get_user(user_id)?;
        self.store.groups_of(user_id)
    }

    /// Members of a group in the order they joined
    pub fn get_group_members(&self, group_id: GroupId) -> Result<Vec<User>, LedgerError> {
        self.store.get_group(group_id)?;
        let ids = self.store.members_of(group_id)?;
        self.store.find_users_by_ids(&ids)
    }

    // ----- friendships -----

    /// Befriend two users
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `user_id == friend_id` (`SelfReference`)
    /// - Either user does not exist (`NotFound`)
    /// - The users are already friends (`DuplicateRelationship`)
    pub fn add_friend(&self, user_id: UserId, friend_id: UserId) -> Result<(), LedgerError> {
        if user_id == friend_id {
            return Err(LedgerError::self_reference("befriend", user_id));
        }
        self.store.get_user(user_id)?;
        self.store.get_user(friend_id)?;

        let mut batch = WriteBatch::new();
        batch.add_friendship(Friendship::between(user_id, friend_id));
        self.store.commit(batch)?;

        info!(user_id, friend_id, "added friend");
        Ok(())
    }

    /// Remove a friendship; removing a missing friendship is a no-op
    pub fn remove_friend(&self, user_id: UserId, friend_id: UserId) -> Result<(), LedgerError> {
        if user_id == friend_id {
            return Err(LedgerError::self_reference("unfriend", user_id));
        }
        self.store.get_user(user_id)?;
        self.store.get_user(friend_id)?;

        let mut batch = WriteBatch::new();
        batch.remove_friendship(Friendship::between(user_id, friend_id));
        self.store.commit(batch)?;

        info!(user_id, friend_id, "removed friend");
        Ok(())
    }

    pub fn get_friends(&self, user_id: UserId) -> Result<Vec<User>, LedgerError> {
        self.store.get_user(user_id)?;
        let ids = self.store.friends_of(user_id)?;
        self.store.find_users_by_ids(&ids)
    }

    // ----- expenses -----

    /// Record an expense and post what every participant owes the payer
    ///
    /// The expense and one entry pair per obligation are committed together.
    ///
    /// # Arguments
    ///
    /// * `request` - Description, total, payer, group and split rule
    ///
    /// # Returns
    ///
    /// The stored expense record
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The payer, the group or a participant does not exist (`NotFound`)
    /// - The split is malformed (`InvalidSplit`)
    /// - The store fails to commit (`StorageFailure`)
    pub fn create_expense(&self, request: NewExpense) -> Result<Expense, LedgerError> {
        self.store.get_user(request.payer_id)?;
        self.store.get_group(request.group_id)?;
        self.ensure_users_exist(&request.split.participant_ids())?;

        let obligations =
            self.calculator
                .split(request.total_amount, request.payer_id, &request.split)?;

        let expense = Expense {
            id: Uuid::new_v4(),
            description: request.description,
            total_amount: request.total_amount,
            payer_id: request.payer_id,
            group_id: request.group_id,
            split: request.split,
            created_at: self.clock.now(),
        };

        let mut batch = WriteBatch::new();
        for obligation in &obligations {
            let pair = self.ledger.prepare(Posting {
                from_user_id: obligation.owing_user_id,
                to_user_id: expense.payer_id,
                amount: obligation.amount,
                description: posting_label(&expense, obligation),
                source_expense_id: Some(expense.id),
                group_id: Some(expense.group_id),
            })?;
            batch.save_entry_pair(pair);
        }
        batch.save_expense(expense.clone());
        self.store.commit(batch)?;

        info!(
            expense_id = %expense.id,
            group_id = expense.group_id,
            payer_id = expense.payer_id,
            policy = %expense.split_policy(),
            amount = %expense.total_amount,
            postings = obligations.len(),
            "created expense"
        );
        Ok(expense)
    }

    /// Expenses of a group in creation order
    pub fn get_group_expenses(&self, group_id: GroupId) -> Result<Vec<Expense>, LedgerError> {
        self.store.get_group(group_id)?;
        self.store.find_expenses_by_group(group_id)
    }

    // ----- settlements -----

    /// Record a debtor paying a creditor back
    ///
    /// Stores a completed settlement together with the reverse posting: the
    /// creditor owns the DEBIT and the debtor owns the CREDIT, so both net
    /// balances move toward zero.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `debtor_id == creditor_id` (`SelfSettlement`), checked before any lookup
    /// - The amount is not a positive number of cents (`InvalidAmount`)
    /// - The debtor, creditor or group does not exist (`NotFound`)
    pub fn settle_up(&self, request: NewSettlement) -> Result<Settlement, LedgerError> {
        if request.debtor_id == request.creditor_id {
            return Err(LedgerError::self_settlement(request.debtor_id));
        }
        if request.amount <= Decimal::ZERO || !money::has_money_scale(request.amount) {
            return Err(LedgerError::invalid_amount(request.amount, "settlement"));
        }
        self.store.get_user(request.debtor_id)?;
        self.store.get_user(request.creditor_id)?;
        self.store.get_group(request.group_id)?;

        let description = format!(
            "Settlement: {}",
            request.note.as_deref().unwrap_or("Payment received")
        );
        let settlement = Settlement {
            id: Uuid::new_v4(),
            debtor_id: request.debtor_id,
            creditor_id: request.creditor_id,
            group_id: request.group_id,
            amount: request.amount,
            note: request.note,
            status: SettlementStatus::Completed,
            settled_at: self.clock.now(),
        };
        let pair = self.ledger.prepare(Posting {
            from_user_id: settlement.creditor_id,
            to_user_id: settlement.debtor_id,
            amount: settlement.amount,
            description,
            source_expense_id: None,
            group_id: Some(settlement.group_id),
        })?;

        let mut batch = WriteBatch::new();
        batch.save_settlement(settlement.clone()).save_entry_pair(pair);
        self.store.commit(batch)?;

        info!(
            settlement_id = %settlement.id,
            group_id = settlement.group_id,
            debtor_id = settlement.debtor_id,
            creditor_id = settlement.creditor_id,
            amount = %settlement.amount,
            "settled up"
        );
        Ok(settlement)
    }

    /// Settlements a user took part in, newest first
    pub fn get_user_settlements(&self, user_id: UserId) -> Result<Vec<Settlement>, LedgerError> {
        self.store.get_user(user_id)?;
        self.store.find_settlements_by_user(user_id)
    }

    /// Settlements between two users in either direction, newest first
    pub fn get_settlements_between(
        &self,
        user_id: UserId,
        other_id: UserId,
    ) -> Result<Vec<Settlement>, LedgerError> {
        self.store.get_user(user_id)?;
        self.store.get_user(other_id)?;
        self.store.find_settlements_between(user_id, other_id)
    }

    /// Settlements recorded in a group, oldest first
    pub fn get_group_settlements(&self, group_id: GroupId) -> Result<Vec<Settlement>, LedgerError> {
        self.store.get_group(group_id)?;
        self.store.find_settlements_by_group(group_id)
    }

    // ----- balances and reports -----

    /// Group balances from replayed expenses and settlements
    pub fn get_group_balances(&self, group_id: GroupId) -> Result<BalanceMap, LedgerError> {
        self.aggregator.group_balances(self.store.as_ref(), group_id)
    }

    /// Group balances from posted ledger entries
    pub fn get_group_balances_from_ledger(
        &self,
        group_id: GroupId,
    ) -> Result<BalanceMap, LedgerError> {
        self.aggregator
            .group_balances_from_ledger(self.store.as_ref(), group_id)
    }

    /// The payments that would settle a group, resolved to usernames
    pub fn get_group_debts(&self, group_id: GroupId) -> Result<Vec<SettlementPlanEntry>, LedgerError> {
        let balances = self.get_group_balances(group_id)?;
        let transfers = self.netting.net_debts(&balances);

        let ids: Vec<UserId> = balances.keys().copied().collect();
        let usernames: HashMap<UserId, String> = self
            .store
            .find_users_by_ids(&ids)?
            .into_iter()
            .map(|user| (user.id, user.username))
            .collect();
        let username = |id: UserId| {
            usernames
                .get(&id)
                .cloned()
                .ok_or_else(|| LedgerError::not_found(EntityKind::User, id))
        };

        let plan = transfers
            .into_iter()
            .map(|transfer| {
                Ok(SettlementPlanEntry {
                    debtor_id: transfer.debtor_id,
                    debtor_username: username(transfer.debtor_id)?,
                    creditor_id: transfer.creditor_id,
                    creditor_username: username(transfer.creditor_id)?,
                    amount: transfer.amount,
                })
            })
            .collect::<Result<Vec<_>, LedgerError>>()?;

        debug!(group_id, payments = plan.len(), "computed group debts");
        Ok(plan)
    }

    /// Net ledger balance of a user
    pub fn get_user_balance(&self, user_id: UserId) -> Result<Money, LedgerError> {
        self.store.get_user(user_id)?;
        self.aggregator.net_balance(self.store.as_ref(), user_id, None)
    }

    /// Net ledger balance of a user as of an instant (inclusive)
    pub fn get_user_balance_as_of(
        &self,
        user_id: UserId,
        as_of: DateTime<Utc>,
    ) -> Result<Money, LedgerError> {
        self.store.get_user(user_id)?;
        self.aggregator
            .net_balance(self.store.as_ref(), user_id, Some(as_of))
    }

    /// Net ledger balance of a user over `start <= created_at < end`
    pub fn net_balance_between(
        &self,
        user_id: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Money, LedgerError> {
        self.store.get_user(user_id)?;
        self.aggregator
            .net_balance_in_range(self.store.as_ref(), user_id, start, end)
    }

    /// Ledger balance of a user with display metadata
    pub fn get_user_wallet(&self, user_id: UserId) -> Result<Wallet, LedgerError> {
        let user = self.store.get_user(user_id)?;
        let balance = self
            .aggregator
            .net_balance(self.store.as_ref(), user_id, None)?;
        Ok(Wallet {
            user_id,
            username: user.username,
            balance,
            currency: DEFAULT_CURRENCY.to_string(),
        })
    }

    /// Ledger entries owned by a user, newest first
    pub fn get_user_transactions(&self, user_id: UserId) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.store.get_user(user_id)?;
        let mut entries = self.store.find_entries_by_user(user_id)?;
        entries.reverse();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    /// Spending summary of a user for one calendar month
    pub fn get_monthly_summary(
        &self,
        user_id: UserId,
        month: YearMonth,
    ) -> Result<MonthlySummary, LedgerError> {
        self.store.get_user(user_id)?;
        let summary = self
            .aggregator
            .monthly_summary(self.store.as_ref(), user_id, month)?;
        debug!(user_id, month = %month, entries = summary.transaction_count, "computed monthly summary");
        Ok(summary)
    }

    /// Fail with `NotFound` naming the first id that does not exist
    fn ensure_users_exist(&self, ids: &[UserId]) -> Result<(), LedgerError> {
        let found = self.store.find_users_by_ids(ids)?;
        match ids
            .iter()
            .find(|id| !found.iter().any(|user| user.id == **id))
        {
            Some(missing) => Err(LedgerError::not_found(EntityKind::User, missing)),
            None => Ok(()),
        }
    }
}

impl<S> std::fmt::Debug for SplitEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SplitEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Description of the posting for one obligation of an expense
fn posting_label(expense: &Expense, obligation: &Obligation) -> String {
    match &expense.split {
        Split::Equal { .. } => format!("Split (Equal): {}", expense.description),
        Split::Exact { .. } => format!("Split (Exact): {}", expense.description),
        Split::Percentage { shares } => {
            let percent = shares
                .iter()
                .find(|share| share.user_id == obligation.owing_user_id)
                .map(|share| share.value.normalize().to_string())
                .unwrap_or_default();
            format!("Split ({}%): {}", percent, expense.description)
        }
    }
}
