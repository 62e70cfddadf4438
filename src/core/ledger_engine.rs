//! Double-entry posting
//!
//! The `LedgerEngine` turns "`from` owes `to` this amount" into an
//! [`EntryPair`]: a DEBIT owned by `from` and a CREDIT owned by `to`, with
//! the same amount and a freshly generated reference id. For every
//! reference id the debit side equals the credit side, so the sum of all
//! net balances in the system stays at zero.
//!
//! Building a pair is separated from writing it: [`LedgerEngine::prepare`]
//! is pure so multi-record operations can stage several pairs in one
//! atomic batch, while [`LedgerEngine::record_double_entry`] writes a
//! single pair through the store's atomic pair write.

use crate::core::traits::{Clock, LedgerStore, SystemClock};
use crate::types::money;
use crate::types::{
    EntryDirection, EntryPair, ExpenseId, GroupId, LedgerEntry, LedgerError, Money, UserId,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// One obligation to post: `from` owes `to` the amount
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub amount: Money,
    pub description: String,
    pub source_expense_id: Option<ExpenseId>,
    pub group_id: Option<GroupId>,
}

/// Builds and records balanced entry pairs
#[derive(Clone)]
pub struct LedgerEngine {
    clock: Arc<dyn Clock>,
}

impl LedgerEngine {
    /// Create an engine stamping entries with the given clock
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        LedgerEngine { clock }
    }

    /// Build the entry pair for a posting without writing it
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` if the amount is not a positive number of
    /// cents.
    pub fn prepare(&self, posting: Posting) -> Result<EntryPair, LedgerError> {
        if posting.amount <= Decimal::ZERO || !money::has_money_scale(posting.amount) {
            return Err(LedgerError::invalid_amount(
                posting.amount,
                "double-entry posting",
            ));
        }

        let reference_id = Uuid::new_v4();
        let created_at = self.clock.now();

        let debit = LedgerEntry {
            id: Uuid::new_v4(),
            owner_user_id: posting.from_user_id,
            direction: EntryDirection::Debit,
            amount: posting.amount,
            counterparty_user_id: posting.to_user_id,
            reference_id,
            source_expense_id: posting.source_expense_id,
            group_id: posting.group_id,
            description: posting.description.clone(),
            created_at,
        };

        let credit = LedgerEntry {
            id: Uuid::new_v4(),
            owner_user_id: posting.to_user_id,
            direction: EntryDirection::Credit,
            amount: posting.amount,
            counterparty_user_id: posting.from_user_id,
            reference_id,
            source_expense_id: posting.source_expense_id,
            group_id: posting.group_id,
            description: posting.description,
            created_at,
        };

        Ok(EntryPair { debit, credit })
    }

    /// Build and persist one entry pair
    ///
    /// The store writes both halves or neither. A store failure is returned
    /// unchanged and nothing is retried.
    pub fn record_double_entry<S>(&self, store: &S, posting: Posting) -> Result<EntryPair, LedgerError>
    where
        S: LedgerStore + ?Sized,
    {
        let pair = self.prepare(posting)?;
        store.save_entry_pair(pair.clone())?;

        info!(
            reference_id = %pair.reference_id(),
            from = pair.debit.owner_user_id,
            to = pair.credit.owner_user_id,
            amount = %pair.debit.amount,
            "recorded double entry"
        );

        Ok(pair)
    }
}

impl Default for LedgerEngine {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl std::fmt::Debug for LedgerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerEngine").finish_non_exhaustive()
    }
}
