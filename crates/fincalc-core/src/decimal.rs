//! Decimal arithmetic helpers shared by every calculator.
//!
//! All money and rate math runs on `rust_decimal::Decimal`. The helpers here
//! add the pieces the calculators need on top of it: half-up money rounding,
//! checked powers with integer and fractional exponents, and intake of
//! non-decimal numbers. Checked helpers return `None` when the result is not
//! representable; the secant solver treats that as divergence to infinity.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};
use rust_decimal_macros::dec;
use std::str::FromStr;

use crate::error::FinCalcError;
use crate::types::Money;
use crate::FinCalcResult;

/// Fractional digits kept on displayed money amounts.
pub const MONEY_DP: u32 = 2;

/// Taylor terms below this magnitude are dropped.
const EXP_TOLERANCE: Decimal = dec!(0.0000000000000000000001);
const EXP_MAX_TERMS: u32 = 60;
const LN_NEWTON_STEPS: u32 = 2;

/// Round a money amount half-up (away from zero) to cents.
pub fn round_money(amount: Money) -> Money {
    amount.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Round half-up (away from zero) to `dp` fractional digits.
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// `base^n` for a signed integer exponent by repeated squaring.
pub fn checked_powi(base: Decimal, n: i64) -> Option<Decimal> {
    if n == 0 {
        return Some(Decimal::ONE);
    }
    let mut remaining = n.unsigned_abs();
    let mut factor = base;
    let mut result = Decimal::ONE;
    while remaining > 0 {
        if remaining & 1 == 1 {
            result = result.checked_mul(factor)?;
        }
        remaining >>= 1;
        if remaining > 0 {
            factor = factor.checked_mul(factor)?;
        }
    }
    if n < 0 {
        Decimal::ONE.checked_div(result)
    } else {
        Some(result)
    }
}

/// e^x with range reduction: halve `x` until it is at most 1, sum the Taylor
/// series, then square back up.
pub fn checked_exp(x: Decimal) -> Option<Decimal> {
    if x.is_zero() {
        return Some(Decimal::ONE);
    }
    if x.is_sign_negative() {
        let positive = checked_exp(-x)?;
        return Decimal::ONE.checked_div(positive);
    }

    let mut reduced = x;
    let mut halvings = 0u32;
    while reduced > Decimal::ONE {
        reduced /= dec!(2);
        halvings += 1;
    }

    let mut sum = Decimal::ONE;
    let mut term = Decimal::ONE;
    for n in 1..=EXP_MAX_TERMS {
        term = term.checked_mul(reduced)?.checked_div(Decimal::from(n))?;
        sum = sum.checked_add(term)?;
        if term.abs() < EXP_TOLERANCE {
            break;
        }
    }

    for _ in 0..halvings {
        sum = sum.checked_mul(sum)?;
    }
    Some(sum)
}

/// Natural logarithm; `None` for non-positive input.
pub fn checked_ln(x: Decimal) -> Option<Decimal> {
    if x <= Decimal::ZERO {
        return None;
    }
    if x == Decimal::ONE {
        return Some(Decimal::ZERO);
    }
    // Polish the library estimate with Newton steps on e^y = x.
    let mut y = x.checked_ln()?;
    for _ in 0..LN_NEWTON_STEPS {
        let ey = checked_exp(y)?;
        y = y.checked_add(x.checked_div(ey)?)?.checked_sub(Decimal::ONE)?;
    }
    Some(y)
}

/// `base^exponent` for any decimal exponent.
///
/// Integral exponents go through [`checked_powi`] so that negative bases
/// work; fractional exponents require a positive base and are evaluated as
/// `exp(exponent * ln(base))`.
pub fn checked_pow(base: Decimal, exponent: Decimal) -> Option<Decimal> {
    if exponent.fract().is_zero() {
        let n = exponent.to_i64()?;
        return checked_powi(base, n);
    }
    if base.is_zero() {
        return if exponent.is_sign_positive() {
            Some(Decimal::ZERO)
        } else {
            None
        };
    }
    let ln = checked_ln(base)?;
    checked_exp(ln.checked_mul(exponent)?)
}

/// Convert an `f64` into a decimal, rejecting NaN and infinities.
pub fn from_f64(field: &str, value: f64) -> FinCalcResult<Decimal> {
    Decimal::from_f64(value).ok_or_else(|| FinCalcError::InvalidNumeric {
        field: field.into(),
        value: value.to_string(),
    })
}

/// Parse a textual number (plain or scientific notation).
pub fn parse_decimal(field: &str, raw: &str) -> FinCalcResult<Decimal> {
    let trimmed = raw.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| FinCalcError::InvalidNumeric {
            field: field.into(),
            value: raw.to_string(),
        })
}
