//! Fixed-precision monetary arithmetic.
//!
//! All amounts are [`Decimal`] with 2 fractional digits; tax percentages
//! carry up to [`RATE_SCALE`] digits. Rounding is always half-up
//! (commercial rounding). Operations that would produce a negative amount
//! fail instead of clamping.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use super::error::FacturaError;

/// Fractional digits of every monetary amount.
pub const MONEY_SCALE: u32 = 2;

/// Fractional digits accepted for quantities.
pub const QUANTITY_SCALE: u32 = 2;

/// Fractional digits accepted for tax percentages.
pub const RATE_SCALE: u32 = 4;

/// Largest amount a single monetary field may hold (13 integer digits).
pub const MAX_AMOUNT: Decimal = dec!(9999999999999.99);

/// Round to `dp` decimal places using half-up (away from zero on the midpoint).
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Round to currency precision and fix the scale at 2 so that `6.8` renders as `6.80`.
pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded = round_half_up(value, MONEY_SCALE);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// Multiply two decimals, failing on overflow instead of panicking.
pub fn checked_mul(a: Decimal, b: Decimal, what: &str) -> Result<Decimal, FacturaError> {
    a.checked_mul(b)
        .ok_or_else(|| FacturaError::Validation(format!("{what}: arithmetic overflow")))
}

/// Add two amounts, failing on overflow or when the result exceeds [`MAX_AMOUNT`].
pub fn checked_add(a: Decimal, b: Decimal, what: &str) -> Result<Decimal, FacturaError> {
    let sum = a
        .checked_add(b)
        .ok_or_else(|| FacturaError::Validation(format!("{what}: arithmetic overflow")))?;
    ensure_within_limit(sum, what)?;
    Ok(sum)
}

/// Subtract `b` from `a`; a negative result is rejected.
pub fn checked_sub(a: Decimal, b: Decimal, what: &str) -> Result<Decimal, FacturaError> {
    let diff = a
        .checked_sub(b)
        .ok_or_else(|| FacturaError::Validation(format!("{what}: arithmetic overflow")))?;
    if diff.is_sign_negative() && !diff.is_zero() {
        return Err(FacturaError::Validation(format!(
            "{what} must not be negative ({a} - {b} = {diff})"
        )));
    }
    Ok(diff)
}

/// Sum amounts exactly. Callers pass values already at currency precision.
pub fn sum<I>(values: I) -> Result<Decimal, FacturaError>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| checked_add(acc, v, "sum"))
}

/// `round(base * percentage / 100, 2)`.
pub fn apply_rate(base: Decimal, percentage: Decimal) -> Result<Decimal, FacturaError> {
    let product = checked_mul(base, percentage, "tax amount")?;
    Ok(round_money(product / dec!(100)))
}

/// Share of `part` in `whole` as a percentage rounded to 2 places; zero when `whole` is zero.
pub fn percentage_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return round_money(Decimal::ZERO);
    }
    round_money(part * dec!(100) / whole)
}

pub fn ensure_non_negative(value: Decimal, field: &str) -> Result<(), FacturaError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(FacturaError::Validation(format!(
            "{field} must not be negative, got {value}"
        )));
    }
    Ok(())
}

pub fn ensure_within_limit(value: Decimal, field: &str) -> Result<(), FacturaError> {
    if value.abs() > MAX_AMOUNT {
        return Err(FacturaError::Validation(format!(
            "{field} exceeds the maximum amount {MAX_AMOUNT}"
        )));
    }
    Ok(())
}

/// Whether `value` carries at most `dp` significant fractional digits.
pub fn has_scale_at_most(value: Decimal, dp: u32) -> bool {
    value.normalize().scale() <= dp
}
