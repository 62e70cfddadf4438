//! Money helpers for the split ledger
//!
//! Every amount in the system is a `rust_decimal::Decimal` carrying two
//! fractional digits. Nothing in this crate touches binary floating point.
//! Division is always followed by a half-up rounding to the cent.

use rust_decimal::{Decimal, RoundingStrategy};

/// Exact decimal amount of money (2 fractional digits)
pub type Money = Decimal;

/// Number of fractional digits carried by every amount
pub const MONEY_SCALE: u32 = 2;

/// One cent, the smallest representable amount
pub const CENT: Money = Decimal::from_parts(1, 0, 0, false, MONEY_SCALE);

/// One hundred, the percentage denominator
pub const HUNDRED: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// Round an amount to the cent, ties away from zero
///
/// This is the "half-up" rounding used for money: 0.005 becomes 0.01 and
/// -0.005 becomes -0.01.
pub fn round_half_up(value: Decimal) -> Money {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Divide and round the quotient to the cent
///
/// Returns `None` when the divisor is zero or the division overflows.
pub fn divide_rounded(value: Decimal, divisor: Decimal) -> Option<Money> {
    value.checked_div(divisor).map(round_half_up)
}

/// Whether an amount fits in two fractional digits
pub fn has_money_scale(value: Decimal) -> bool {
    value.normalize().scale() <= MONEY_SCALE
}

/// Whether a balance is small enough to count as settled
pub fn is_settled(value: Decimal, threshold: Decimal) -> bool {
    value.abs() < threshold
}

/// Format an amount for display with exactly two fractional digits
///
/// Negative zero is printed as `0.00`.
pub fn format_money(value: Decimal) -> String {
    let mut rounded = round_half_up(value);
    rounded.rescale(MONEY_SCALE);
    if rounded.is_zero() {
        rounded.set_sign_positive(true);
    }
    rounded.to_string()
}
