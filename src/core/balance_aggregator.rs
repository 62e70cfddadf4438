//! Net balance computation
//!
//! Balances are never stored. They are folded on demand from the immutable
//! history: ledger entries, or expenses plus settlements. Positive means the
//! user is owed money, negative means the user owes money.
//!
//! # Two paths
//!
//! - **Ledger path** ([`BalanceAggregator::net_balance`],
//!   [`BalanceAggregator::group_balances_from_ledger`]): `sum(CREDIT) -
//!   sum(DEBIT)` over posted entries. This is the authoritative figure.
//! - **Replay path** ([`BalanceAggregator::group_balances`]): re-splits every
//!   group expense with the [`SplitCalculator`] and applies every completed
//!   settlement. Because it replays the same obligations the ledger posted,
//!   both paths agree for every split policy.

use crate::core::split_calculator::SplitCalculator;
use crate::core::traits::{LedgerStore, SnapshotStore};
use crate::types::money;
use crate::types::{
    EntryDirection, Expense, GroupId, LedgerEntry, LedgerError, Money, MonthlySummary, Settlement,
    SettlementStatus, UserId, YearMonth,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::debug;

/// Net position per user
pub type BalanceMap = BTreeMap<UserId, Money>;

/// Folds ledger history into net balances
#[derive(Debug, Clone, Copy, Default)]
pub struct BalanceAggregator {
    calculator: SplitCalculator,
}

impl BalanceAggregator {
    /// Create an aggregator replaying expenses with the given calculator
    pub fn new(calculator: SplitCalculator) -> Self {
        BalanceAggregator { calculator }
    }

    /// Net balance of a user, optionally as of an instant (inclusive)
    pub fn net_balance<S>(
        &self,
        store: &S,
        user_id: UserId,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<Money, LedgerError>
    where
        S: LedgerStore + ?Sized,
    {
        let balance = match as_of {
            None => store.sum_balance(user_id)?,
            Some(as_of) => {
                let entries = store.find_entries_by_user(user_id)?;
                sum_entries(entries.iter().filter(|entry| entry.created_at <= as_of))?
            }
        };
        Ok(money::round_half_up(balance))
    }

    /// Net balance of a user over entries with `start <= created_at < end`
    pub fn net_balance_in_range<S>(
        &self,
        store: &S,
        user_id: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Money, LedgerError>
    where
        S: LedgerStore + ?Sized,
    {
        let entries = store.find_entries_by_user_and_range(user_id, start, end)?;
        Ok(money::round_half_up(sum_entries(entries.iter())?))
    }

    /// Spending summary of a user for one calendar month
    pub fn monthly_summary<S>(
        &self,
        store: &S,
        user_id: UserId,
        month: YearMonth,
    ) -> Result<MonthlySummary, LedgerError>
    where
        S: LedgerStore + ?Sized,
    {
        let entries = store.find_entries_by_user_and_range(user_id, month.start(), month.end())?;

        let (spent, received) = entries.iter().try_fold(
            (Decimal::ZERO, Decimal::ZERO),
            |(spent, received), entry| -> Result<(Money, Money), LedgerError> {
                let overflow = || LedgerError::arithmetic_overflow("monthly summary");
                match entry.direction {
                    EntryDirection::Debit => Ok((
                        spent.checked_add(entry.amount).ok_or_else(overflow)?,
                        received,
                    )),
                    EntryDirection::Credit => Ok((
                        spent,
                        received.checked_add(entry.amount).ok_or_else(overflow)?,
                    )),
                }
            },
        )?;

        Ok(MonthlySummary {
            month,
            total_spent: money::round_half_up(spent),
            total_received: money::round_half_up(received),
            net: money::round_half_up(received - spent),
            transaction_count: entries.len(),
        })
    }

    /// Group balances from posted ledger entries
    ///
    /// Every current member is present, starting at zero. Members and
    /// entries come from one [`SnapshotStore::group_history`] read.
    pub fn group_balances_from_ledger<S>(
        &self,
        store: &S,
        group_id: GroupId,
    ) -> Result<BalanceMap, LedgerError>
    where
        S: SnapshotStore + ?Sized,
    {
        let history = store.group_history(group_id)?;

        let balances = fold_entries(seed(&history.members), history.entries.iter())?;
        debug!(group_id, users = balances.len(), "computed group balances from ledger");
        Ok(round_all(balances))
    }

    /// Group balances by replaying expenses and settlements
    ///
    /// Every current member is present, starting at zero. The replayed
    /// history comes from one [`SnapshotStore::group_history`] read.
    pub fn group_balances<S>(&self, store: &S, group_id: GroupId) -> Result<BalanceMap, LedgerError>
    where
        S: SnapshotStore + ?Sized,
    {
        let history = store.group_history(group_id)?;

        let balances = self.replay(&history.members, &history.expenses, &history.settlements)?;
        debug!(
            group_id,
            expenses = history.expenses.len(),
            settlements = history.settlements.len(),
            "replayed group balances"
        );
        Ok(balances)
    }

    /// Pure replay of a group's history
    ///
    /// Each expense credits its payer with what the other participants owe
    /// and debits every obligated participant. Each completed settlement
    /// moves the debtor up and the creditor down. Cancelled settlements are
    /// ignored.
    pub fn replay(
        &self,
        members: &[UserId],
        expenses: &[Expense],
        settlements: &[Settlement],
    ) -> Result<BalanceMap, LedgerError> {
        let after_expenses = expenses.iter().try_fold(seed(members), |balances, expense| {
            let obligations = self.calculator.split_expense(expense)?;
            obligations.iter().try_fold(balances, |balances, obligation| {
                let balances = apply(balances, expense.payer_id, obligation.amount)?;
                apply(balances, obligation.owing_user_id, -obligation.amount)
            })
        })?;

        let after_settlements = settlements
            .iter()
            .filter(|settlement| settlement.status == SettlementStatus::Completed)
            .try_fold(after_expenses, |balances, settlement| {
                let balances = apply(balances, settlement.debtor_id, settlement.amount)?;
                apply(balances, settlement.creditor_id, -settlement.amount)
            })?;

        Ok(round_all(after_settlements))
    }
}

fn seed(members: &[UserId]) -> BalanceMap {
    members.iter().map(|id| (*id, Decimal::ZERO)).collect()
}

fn apply(mut balances: BalanceMap, user_id: UserId, delta: Money) -> Result<BalanceMap, LedgerError> {
    let current = balances.get(&user_id).copied().unwrap_or(Decimal::ZERO);
    let updated = current
        .checked_add(delta)
        .ok_or_else(|| LedgerError::arithmetic_overflow("balance aggregation"))?;
    balances.insert(user_id, updated);
    Ok(balances)
}

fn fold_entries<'a, I>(initial: BalanceMap, entries: I) -> Result<BalanceMap, LedgerError>
where
    I: IntoIterator<Item = &'a LedgerEntry>,
{
    entries.into_iter().try_fold(initial, |balances, entry| {
        apply(balances, entry.owner_user_id, entry.signed_amount())
    })
}

fn sum_entries<'a, I>(entries: I) -> Result<Money, LedgerError>
where
    I: Iterator<Item = &'a LedgerEntry>,
{
    entries.fold(Ok(Decimal::ZERO), |sum, entry| {
        sum?.checked_add(entry.signed_amount())
            .ok_or_else(|| LedgerError::arithmetic_overflow("net balance"))
    })
}

fn round_all(balances: BalanceMap) -> BalanceMap {
    balances
        .into_iter()
        .map(|(user_id, amount)| (user_id, money::round_half_up(amount)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ledger_engine::{LedgerEngine, Posting};
    use crate::core::memory_store::InMemoryStore;
    use crate::core::traits::{
        AccountStore, FixedClock, GroupHistory, GroupStore, UnitOfWork, WriteBatch,
    };
    use crate::types::{NewGroup, NewUser, Share, Split};
    use chrono::TimeZone;
    use proptest::prelude::*;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use uuid::Uuid;

    fn d(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, day, 10, 0, 0).unwrap()
    }

    fn expense(payer: UserId, total: &str, split: Split) -> Expense {
        Expense {
            id: Uuid::new_v4(),
            description: "test".to_string(),
            total_amount: d(total),
            payer_id: payer,
            group_id: 1,
            split,
            created_at: at(1),
        }
    }

    fn settlement(debtor: UserId, creditor: UserId, amount: &str, status: SettlementStatus) -> Settlement {
        Settlement {
            id: Uuid::new_v4(),
            debtor_id: debtor,
            creditor_id: creditor,
            group_id: 1,
            amount: d(amount),
            note: None,
            status,
            settled_at: at(2),
        }
    }

    fn post(engine: &LedgerEngine, store: &InMemoryStore, from: UserId, to: UserId, amount: &str) {
        engine
            .record_double_entry(
                store,
                Posting {
                    from_user_id: from,
                    to_user_id: to,
                    amount: d(amount),
                    description: "test".to_string(),
                    source_expense_id: None,
                    group_id: Some(1),
                },
            )
            .unwrap();
    }

    #[test]
    fn test_replay_equal_expense_scenario() {
        let aggregator = BalanceAggregator::default();
        let expenses = vec![expense(
            1,
            "90.00",
            Split::Equal {
                participants: vec![1, 2, 3],
            },
        )];

        let balances = aggregator.replay(&[1, 2, 3], &expenses, &[]).unwrap();

        assert_eq!(balances[&1], d("60.00"));
        assert_eq!(balances[&2], d("-30.00"));
        assert_eq!(balances[&3], d("-30.00"));
    }

    #[test]
    fn test_replay_seeds_idle_members_at_zero() {
        let aggregator = BalanceAggregator::default();

        let balances = aggregator.replay(&[4, 5], &[], &[]).unwrap();

        assert_eq!(balances.len(), 2);
        assert_eq!(balances[&4], Decimal::ZERO);
        assert_eq!(balances[&5], Decimal::ZERO);
    }

    #[test]
    fn test_replay_applies_completed_settlements_only() {
        let aggregator = BalanceAggregator::default();
        let expenses = vec![expense(
            1,
            "90.00",
            Split::Equal {
                participants: vec![1, 2, 3],
            },
        )];
        let settlements = vec![
            settlement(2, 1, "30.00", SettlementStatus::Completed),
            settlement(3, 1, "30.00", SettlementStatus::Cancelled),
        ];

        let balances = aggregator.replay(&[1, 2, 3], &expenses, &settlements).unwrap();

        assert_eq!(balances[&1], d("30.00"));
        assert_eq!(balances[&2], Decimal::ZERO);
        assert_eq!(balances[&3], d("-30.00"));
    }

    #[test]
    fn test_replay_handles_exact_and_percentage() {
        let aggregator = BalanceAggregator::default();
        let expenses = vec![
            expense(
                1,
                "100.00",
                Split::Exact {
                    shares: vec![Share::new(2, d("70.00")), Share::new(3, d("30.00"))],
                },
            ),
            expense(
                2,
                "50.00",
                Split::Percentage {
                    shares: vec![Share::new(1, d("20")), Share::new(2, d("80"))],
                },
            ),
        ];

        let balances = aggregator.replay(&[1, 2, 3], &expenses, &[]).unwrap();

        // 1: +100 - 10, 2: -70 + 10, 3: -30
        assert_eq!(balances[&1], d("90.00"));
        assert_eq!(balances[&2], d("-60.00"));
        assert_eq!(balances[&3], d("-30.00"));
        assert_eq!(balances.values().copied().sum::<Decimal>(), Decimal::ZERO);
    }

    #[test]
    fn test_replay_never_drifts_on_thirds() {
        let aggregator = BalanceAggregator::default();
        let expenses = vec![expense(
            1,
            "100.00",
            Split::Equal {
                participants: vec![1, 2, 3],
            },
        )];

        let balances = aggregator.replay(&[1, 2, 3], &expenses, &[]).unwrap();

        assert_eq!(balances[&1], d("66.66"));
        assert_eq!(balances.values().copied().sum::<Decimal>(), Decimal::ZERO);
    }

    #[test]
    fn test_net_balance_from_store() {
        let store = InMemoryStore::new();
        let engine = LedgerEngine::default();
        let aggregator = BalanceAggregator::default();

        post(&engine, &store, 2, 1, "30.00");
        post(&engine, &store, 3, 1, "30.00");

        assert_eq!(aggregator.net_balance(&store, 1, None).unwrap(), d("60.00"));
        assert_eq!(aggregator.net_balance(&store, 2, None).unwrap(), d("-30.00"));
        assert_eq!(aggregator.net_balance(&store, 3, None).unwrap(), d("-30.00"));
        assert_eq!(aggregator.net_balance(&store, 4, None).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_net_balance_as_of_and_monthly_summary() {
        let store = InMemoryStore::new();
        let may = LedgerEngine::new(Arc::new(FixedClock(at(3))));
        let june = LedgerEngine::new(Arc::new(FixedClock(
            Utc.with_ymd_and_hms(2026, 6, 2, 9, 0, 0).unwrap(),
        )));
        let aggregator = BalanceAggregator::default();

        post(&may, &store, 2, 1, "30.00");
        post(&may, &store, 1, 2, "5.00");
        post(&june, &store, 2, 1, "10.00");

        assert_eq!(aggregator.net_balance(&store, 1, Some(at(31))).unwrap(), d("25.00"));
        assert_eq!(aggregator.net_balance(&store, 1, None).unwrap(), d("35.00"));

        let summary = aggregator
            .monthly_summary(&store, 1, YearMonth::new(2026, 5).unwrap())
            .unwrap();
        assert_eq!(summary.total_spent, d("5.00"));
        assert_eq!(summary.total_received, d("30.00"));
        assert_eq!(summary.net, d("25.00"));
        assert_eq!(summary.transaction_count, 2);

        let june_balance = aggregator
            .net_balance_in_range(
                &store,
                2,
                YearMonth::new(2026, 6).unwrap().start(),
                YearMonth::new(2026, 6).unwrap().end(),
            )
            .unwrap();
        assert_eq!(june_balance, d("-10.00"));
    }

    #[test]
    fn test_ledger_and_replay_paths_agree() {
        let store = InMemoryStore::new();
        let engine = LedgerEngine::default();
        let aggregator = BalanceAggregator::default();
        let calculator = SplitCalculator::new();

        let alice = store
            .insert_user(
                NewUser {
                    username: "alice".into(),
                    email: "alice@example.com".into(),
                    full_name: "Alice".into(),
                },
                at(1),
            )
            .unwrap();
        let bob = store
            .insert_user(
                NewUser {
                    username: "bob".into(),
                    email: "bob@example.com".into(),
                    full_name: "Bob".into(),
                },
                at(1),
            )
            .unwrap();
        let group = store
            .insert_group(
                NewGroup {
                    name: "trip".into(),
                    description: String::new(),
                    created_by: alice.id,
                    member_ids: vec![bob.id],
                },
                at(1),
            )
            .unwrap();

        let mut expense = expense(
            alice.id,
            "100.00",
            Split::Percentage {
                shares: vec![Share::new(alice.id, d("33.33")), Share::new(bob.id, d("66.67"))],
            },
        );
        expense.group_id = group.id;

        let mut batch = WriteBatch::new();
        for obligation in calculator.split_expense(&expense).unwrap() {
            batch.save_entry_pair(
                engine
                    .prepare(Posting {
                        from_user_id: obligation.owing_user_id,
                        to_user_id: expense.payer_id,
                        amount: obligation.amount,
                        description: expense.description.clone(),
                        source_expense_id: Some(expense.id),
                        group_id: Some(group.id),
                    })
                    .unwrap(),
            );
        }
        batch.save_expense(expense);
        store.commit(batch).unwrap();

        let from_ledger = aggregator.group_balances_from_ledger(&store, group.id).unwrap();
        let replayed = aggregator.group_balances(&store, group.id).unwrap();

        assert_eq!(from_ledger, replayed);
        assert_eq!(replayed[&bob.id], d("-66.67"));
    }

    #[test]
    fn test_group_balances_unknown_group() {
        let store = InMemoryStore::new();
        let aggregator = BalanceAggregator::default();

        let result = aggregator.group_balances(&store, 77);

        assert!(matches!(result, Err(LedgerError::NotFound { .. })));
    }

    /// Serves one fixed history and counts how often it was asked for
    struct FrozenHistory {
        history: GroupHistory,
        reads: AtomicUsize,
    }

    impl SnapshotStore for FrozenHistory {
        fn group_history(&self, group_id: GroupId) -> Result<GroupHistory, LedgerError> {
            assert_eq!(group_id, 1);
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.history.clone())
        }
    }

    #[test]
    fn test_group_balances_come_from_one_history_read() {
        let lunch = expense(
            1,
            "30.00",
            Split::Equal {
                participants: vec![1, 2],
            },
        );
        let ledger = LedgerEngine::new(Arc::new(FixedClock(at(1))));
        let pair = ledger
            .prepare(Posting {
                from_user_id: 2,
                to_user_id: 1,
                amount: d("15.00"),
                description: "test".to_string(),
                source_expense_id: Some(lunch.id),
                group_id: Some(1),
            })
            .unwrap();
        let store = FrozenHistory {
            history: GroupHistory {
                members: vec![1, 2, 3],
                expenses: vec![lunch],
                settlements: vec![settlement(2, 1, "5.00", SettlementStatus::Completed)],
                entries: vec![pair.debit, pair.credit],
            },
            reads: AtomicUsize::new(0),
        };
        let aggregator = BalanceAggregator::default();

        let replayed = aggregator.group_balances(&store, 1).unwrap();
        let from_ledger = aggregator.group_balances_from_ledger(&store, 1).unwrap();

        assert_eq!(store.reads.load(Ordering::SeqCst), 2);
        assert_eq!(replayed[&1], d("10.00"));
        assert_eq!(replayed[&2], d("-10.00"));
        assert_eq!(replayed[&3], Decimal::ZERO);
        assert_eq!(from_ledger[&1], d("15.00"));
        assert_eq!(from_ledger[&2], d("-15.00"));
        assert_eq!(from_ledger[&3], Decimal::ZERO);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: any sequence of postings leaves the system-wide sum of
        /// net balances at exactly zero.
        #[test]
        fn balances_always_sum_to_zero(
            postings in prop::collection::vec((0u64..6, 0u64..6, 1i64..1_000_000i64), 1..40)
        ) {
            let store = InMemoryStore::new();
            let engine = LedgerEngine::default();
            let aggregator = BalanceAggregator::default();

            for (from, to, cents) in postings {
                engine
                    .record_double_entry(
                        &store,
                        Posting {
                            from_user_id: from,
                            to_user_id: to,
                            amount: Decimal::new(cents, 2),
                            description: String::new(),
                            source_expense_id: None,
                            group_id: None,
                        },
                    )
                    .unwrap();
            }

            let total: Decimal = (0u64..6)
                .map(|user| aggregator.net_balance(&store, user, None).unwrap())
                .sum();
            prop_assert_eq!(total, Decimal::ZERO);
        }
    }
}
