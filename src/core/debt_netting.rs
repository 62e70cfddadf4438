//! Greedy debt netting
//!
//! Reduces a snapshot of net balances to a short list of point-to-point
//! payments that brings every balance to zero. Debtors and creditors are
//! walked with two independent cursors in map order; each step settles the
//! smaller of the two open amounts, so every step closes at least one side
//! and the plan never exceeds `debtors + creditors - 1` payments.

use crate::types::money::{self, CENT};
use crate::types::{Money, Transfer, UserId};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::warn;

/// An open position waiting to be matched
#[derive(Debug, Clone, Copy)]
struct Position {
    user_id: UserId,
    remaining: Money,
}

/// Computes settling payments from net balances
#[derive(Debug, Clone, Copy)]
pub struct DebtNettingEngine {
    threshold: Money,
}

impl DebtNettingEngine {
    /// Engine treating anything under one cent as settled
    pub fn new() -> Self {
        Self::with_threshold(CENT)
    }

    /// Engine with a custom settled threshold
    ///
    /// A threshold that is not positive falls back to one cent.
    pub fn with_threshold(threshold: Money) -> Self {
        if threshold <= Decimal::ZERO {
            warn!(%threshold, "Netting threshold must be positive, using {}", CENT);
            return DebtNettingEngine { threshold: CENT };
        }
        DebtNettingEngine { threshold }
    }

    pub fn threshold(&self) -> Money {
        self.threshold
    }

    /// Net a balance snapshot into payments
    ///
    /// Negative balances owe, positive balances are owed. Balances whose
    /// magnitude is under the threshold are ignored. An empty snapshot
    /// yields an empty plan.
    pub fn net_debts(&self, balances: &BTreeMap<UserId, Money>) -> Vec<Transfer> {
        let (mut debtors, mut creditors): (Vec<Position>, Vec<Position>) = balances
            .iter()
            .filter(|(_, amount)| !money::is_settled(**amount, self.threshold))
            .map(|(user_id, amount)| Position {
                user_id: *user_id,
                remaining: *amount,
            })
            .partition(|position| position.remaining < Decimal::ZERO);

        for debtor in debtors.iter_mut() {
            debtor.remaining = debtor.remaining.abs();
        }

        let mut transfers = Vec::with_capacity(debtors.len() + creditors.len());
        let (mut i, mut j) = (0, 0);

        while i < debtors.len() && j < creditors.len() {
            let amount = debtors[i].remaining.min(creditors[j].remaining);

            if amount > Decimal::ZERO {
                transfers.push(Transfer {
                    debtor_id: debtors[i].user_id,
                    creditor_id: creditors[j].user_id,
                    amount: money::round_half_up(amount),
                });
            }

            debtors[i].remaining -= amount;
            creditors[j].remaining -= amount;

            if self.is_closed(debtors[i].remaining) {
                i += 1;
            }
            if self.is_closed(creditors[j].remaining) {
                j += 1;
            }
        }

        transfers
    }

    fn is_closed(&self, remaining: Money) -> bool {
        remaining <= Decimal::ZERO || remaining < self.threshold
    }
}

impl Default for DebtNettingEngine {
    fn default() -> Self {
        Self::new()
    }
}
