//! Integer helpers shared by the liquidity and swap computations.
//!
//! All division floors unless the name says otherwise. Intermediate products
//! are widened to `u128` (or `U192` for the ratio check) so no input pair of
//! `u64` values can overflow before the final narrowing.

use spl_math::uint::U192;

use crate::constants::BPS_DENOMINATOR;
use crate::error::ExchangeError;

/// Largest `x` with `x * x <= v`.
pub fn integer_sqrt(v: u128) -> u128 {
    if v < 2 {
        return v;
    }
    let mut x = v;
    let mut z = (v >> 1) + 1;
    while z < x {
        x = z;
        z = ((v / z) + z) >> 1;
    }
    x
}

/// `floor(a * b / c)` narrowed back to `u64`.
pub fn mul_div_floor(a: u64, b: u64, c: u64) -> Result<u64, ExchangeError> {
    if c == 0 {
        return Err(ExchangeError::ArithmeticOverflow);
    }
    let value = u128::from(a) * u128::from(b) / u128::from(c);
    u64::try_from(value).map_err(|_| ExchangeError::ArithmeticOverflow)
}

/// Amount left after a fee of `fee_bps` is withheld, floored so the
/// withheld part rounds up.
pub fn amount_after_fee(amount: u64, fee_bps: u16) -> Result<u64, ExchangeError> {
    let keep = BPS_DENOMINATOR
        .checked_sub(u64::from(fee_bps))
        .ok_or(ExchangeError::InvalidConfig)?;
    mul_div_floor(amount, keep, BPS_DENOMINATOR)
}

/// Whether the deposit ratio `amount_a : amount_b` stays within
/// `tolerance_bps / 10_000` of the reserve ratio, relative to the larger of
/// `amount_a * reserve_b` and `amount_b * reserve_a`. Evaluated without
/// rounding.
pub fn ratio_within_tolerance(
    amount_a: u64,
    amount_b: u64,
    reserve_a: u64,
    reserve_b: u64,
    tolerance_bps: u16,
) -> Result<bool, ExchangeError> {
    if reserve_a == 0 || reserve_b == 0 {
        return Err(ExchangeError::InsufficientLiquidity);
    }
    let lhs = U192::from(amount_a) * U192::from(reserve_b);
    let rhs = U192::from(amount_b) * U192::from(reserve_a);
    let (diff, larger) = if lhs > rhs { (lhs - rhs, lhs) } else { (rhs - lhs, rhs) };

    let scaled_diff = diff
        .checked_mul(U192::from(BPS_DENOMINATOR))
        .ok_or(ExchangeError::ArithmeticOverflow)?;
    let allowed = larger
        .checked_mul(U192::from(u64::from(tolerance_bps)))
        .ok_or(ExchangeError::ArithmeticOverflow)?;
    Ok(scaled_diff <= allowed)
}
