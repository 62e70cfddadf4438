//! Expense splitting
//!
//! The `SplitCalculator` turns an expense total and its [`Split`] into the
//! list of [`Obligation`]s the participants owe the payer. It is pure: it
//! never reads or writes the store, and the same input always yields the
//! same obligations in the same order.
//!
//! # Policies
//!
//! - **Equal**: every participant owes `round_half_up(total / count)`
//! - **Exact**: every participant owes the amount they were given; the
//!   amounts must sum to the total within a one-cent tolerance
//! - **Percentage**: every participant owes `round_half_up(total * pct / 100)`;
//!   the percentages must sum to exactly 100
//!
//! The payer's own line never produces an obligation. Lines that round to
//! zero are dropped, as a zero posting carries no information.

use crate::types::money::{self, CENT, HUNDRED};
use crate::types::{Expense, LedgerError, Money, Obligation, Share, Split, UserId};
use rust_decimal::Decimal;

/// Pure expense splitter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitCalculator {
    /// Allowed gap between the sum of exact amounts and the total
    exact_tolerance: Decimal,
}

impl SplitCalculator {
    /// Create a calculator with the one-cent exact-split tolerance
    pub fn new() -> Self {
        SplitCalculator {
            exact_tolerance: CENT,
        }
    }

    /// Create a calculator with a custom exact-split tolerance
    pub fn with_tolerance(exact_tolerance: Decimal) -> Self {
        SplitCalculator {
            exact_tolerance: exact_tolerance.abs(),
        }
    }

    /// Split a stored expense
    pub fn split_expense(&self, expense: &Expense) -> Result<Vec<Obligation>, LedgerError> {
        self.split(expense.total_amount, expense.payer_id, &expense.split)
    }

    /// Compute what every participant other than the payer owes
    ///
    /// # Errors
    ///
    /// Returns `InvalidSplit` if:
    /// - The total is not a positive amount of cents
    /// - There are no participants, or a participant is listed twice
    /// - An exact amount is not positive, or the amounts miss the total by
    ///   more than the tolerance
    /// - A percentage is outside `(0, 100]`, or the percentages do not sum
    ///   to exactly 100
    pub fn split(
        &self,
        total: Money,
        payer_id: UserId,
        split: &Split,
    ) -> Result<Vec<Obligation>, LedgerError> {
        if total <= Decimal::ZERO || !money::has_money_scale(total) {
            return Err(LedgerError::invalid_split(format!(
                "total amount {} must be a positive amount of cents",
                total
            )));
        }

        let owed = match split {
            Split::Equal { participants } => self.split_equal(total, participants)?,
            Split::Exact { shares } => self.split_exact(total, shares)?,
            Split::Percentage { shares } => self.split_percentage(total, shares)?,
        };

        Ok(owed
            .into_iter()
            .filter(|obligation| {
                obligation.owing_user_id != payer_id && obligation.amount > Decimal::ZERO
            })
            .collect())
    }

    fn split_equal(
        &self,
        total: Money,
        participants: &[UserId],
    ) -> Result<Vec<Obligation>, LedgerError> {
        let mut unique: Vec<UserId> = Vec::with_capacity(participants.len());
        for id in participants {
            if !unique.contains(id) {
                unique.push(*id);
            }
        }

        if unique.is_empty() {
            return Err(LedgerError::invalid_split(
                "EQUAL split requires at least one participant",
            ));
        }

        let share = money::divide_rounded(total, Decimal::from(unique.len()))
            .ok_or_else(|| LedgerError::arithmetic_overflow("equal split"))?;

        Ok(unique
            .into_iter()
            .map(|owing_user_id| Obligation {
                owing_user_id,
                amount: share,
            })
            .collect())
    }

    fn split_exact(&self, total: Money, shares: &[Share]) -> Result<Vec<Obligation>, LedgerError> {
        check_shares("EXACT", shares)?;

        let mut sum = Decimal::ZERO;
        for share in shares {
            if share.value <= Decimal::ZERO || !money::has_money_scale(share.value) {
                return Err(LedgerError::invalid_split(format!(
                    "amount {} for participant {} must be a positive amount of cents",
                    share.value, share.user_id
                )));
            }
            sum = sum
                .checked_add(share.value)
                .ok_or_else(|| LedgerError::arithmetic_overflow("exact split sum"))?;
        }

        if (sum - total).abs() > self.exact_tolerance {
            return Err(LedgerError::invalid_split(format!(
                "split amounts sum to {} but the total is {} (tolerance {})",
                sum, total, self.exact_tolerance
            )));
        }

        Ok(shares
            .iter()
            .map(|share| Obligation {
                owing_user_id: share.user_id,
                amount: share.value,
            })
            .collect())
    }

    fn split_percentage(
        &self,
        total: Money,
        shares: &[Share],
    ) -> Result<Vec<Obligation>, LedgerError> {
        check_shares("PERCENTAGE", shares)?;

        let mut sum = Decimal::ZERO;
        for share in shares {
            if share.value <= Decimal::ZERO || share.value > HUNDRED {
                return Err(LedgerError::invalid_split(format!(
                    "percentage {} for participant {} must be in (0, 100]",
                    share.value, share.user_id
                )));
            }
            sum += share.value;
        }

        if sum != HUNDRED {
            return Err(LedgerError::invalid_split(format!(
                "percentages sum to {}, expected 100",
                sum
            )));
        }

        shares
            .iter()
            .map(|share| {
                let amount = total
                    .checked_mul(share.value)
                    .and_then(|scaled| money::divide_rounded(scaled, HUNDRED))
                    .ok_or_else(|| LedgerError::arithmetic_overflow("percentage split"))?;
                Ok(Obligation {
                    owing_user_id: share.user_id,
                    amount,
                })
            })
            .collect()
    }
}

impl Default for SplitCalculator {
    fn default() -> Self {
        Self::new()
    }
}

/// Reject empty share lists and participants listed twice
fn check_shares(policy: &str, shares: &[Share]) -> Result<(), LedgerError> {
    if shares.is_empty() {
        return Err(LedgerError::invalid_split(format!(
            "{} split requires at least one participant",
            policy
        )));
    }
    for (index, share) in shares.iter().enumerate() {
        if shares[..index].iter().any(|s| s.user_id == share.user_id) {
            return Err(LedgerError::invalid_split(format!(
                "participant {} appears more than once",
                share.user_id
            )));
        }
    }
    Ok(())
}
