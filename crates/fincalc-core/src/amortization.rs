//! Loan amortization schedules over one or more rate spans.
//!
//! The schedule is built eagerly, one period at a time. Each period accrues
//! interest on the opening balance, then applies the level payment for the
//! active span (or whatever the adjustment callback returns). The level
//! payment is recomputed at the start of every span for the periods still
//! remaining on the loan. Money is rounded half-up to cents as it is booked,
//! and the last payment absorbs any rounding residue so the loan always
//! closes at exactly zero.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::debug;

use crate::decimal::{checked_powi, round_money};
use crate::error::FinCalcError;
use crate::rate::Rate;
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::FinCalcResult;

// ---------------------------------------------------------------------------
// Schedule rows
// ---------------------------------------------------------------------------

/// One booked period of the schedule.
///
/// Outflows are negative. `interest` is the (positive) charge accrued in the
/// period, so `payment == principal + additional - interest` and the closing
/// balance is `opening + interest + payment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    /// 1-based.
    pub period: u32,
    /// Periodic rate applied to the opening balance.
    pub rate: Decimal,
    pub payment: Money,
    pub interest: Money,
    pub principal: Money,
    /// Difference between the actual and the level payment. Zero unless an
    /// adjustment was supplied.
    pub additional: Money,
    pub balance: Money,
}

/// A period as computed under the level payment, before any adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TentativePeriod {
    pub period: u32,
    pub payment: Money,
    pub interest: Money,
    pub principal: Money,
    pub opening_balance: Money,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// A fully computed amortization schedule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Amortization {
    principal: Money,
    rates: Vec<Rate>,
    periods: Vec<Period>,
}

type Adjustment<'a> = &'a dyn Fn(&TentativePeriod) -> Money;

impl Amortization {
    /// Schedule paying the level payment in every period.
    pub fn new(principal: Money, rates: &[Rate]) -> FinCalcResult<Self> {
        Amortization::build(principal, rates, None)
    }

    /// Schedule whose payment in each period is chosen by `adjust`, called
    /// once per period in order with the tentative level-payment period.
    ///
    /// ```ignore
    /// // $100 extra every month
    /// Amortization::with_adjustment(principal, &rates, |p| p.payment - dec!(100))
    /// ```
    pub fn with_adjustment<F>(principal: Money, rates: &[Rate], adjust: F) -> FinCalcResult<Self>
    where
        F: Fn(&TentativePeriod) -> Money,
    {
        Amortization::build(principal, rates, Some(&adjust))
    }

    fn build(
        principal: Money,
        rates: &[Rate],
        adjustment: Option<Adjustment<'_>>,
    ) -> FinCalcResult<Self> {
        let scheduled = validate(principal, rates)?;
        let periods = compute_schedule(principal, rates, scheduled, adjustment)?;
        Ok(Amortization {
            principal,
            rates: rates.to_vec(),
            periods,
        })
    }

    pub fn principal(&self) -> Money {
        self.principal
    }

    pub fn rates(&self) -> &[Rate] {
        &self.rates
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    /// Periods actually issued. Shorter than the rate spans when extra
    /// payments retire the loan early.
    pub fn duration(&self) -> u32 {
        self.periods.len() as u32
    }

    /// Sum of the rate span durations.
    pub fn scheduled_duration(&self) -> u32 {
        self.rates.iter().filter_map(Rate::duration).sum()
    }

    /// Closing balance of the last period.
    pub fn balance(&self) -> Money {
        self.periods
            .last()
            .map(|p| p.balance)
            .unwrap_or(self.principal)
    }

    /// The single recurring payment, or `None` when payments vary.
    ///
    /// Schedules with more than one rate span always vary. The final period
    /// is ignored: it is allowed to differ by the rounding residue or an
    /// early payoff.
    pub fn payment(&self) -> Option<Money> {
        if self.rates.len() > 1 {
            return None;
        }
        let (_, regular) = self.periods.split_last()?;
        let Some(first) = regular.first() else {
            return self.periods.first().map(|p| p.payment);
        };
        regular
            .iter()
            .all(|p| p.payment == first.payment)
            .then_some(first.payment)
    }

    pub fn payments(&self) -> Vec<Money> {
        self.periods.iter().map(|p| p.payment).collect()
    }

    pub fn interest(&self) -> Vec<Money> {
        self.periods.iter().map(|p| p.interest).collect()
    }

    pub fn additional_payments(&self) -> Vec<Money> {
        self.periods.iter().map(|p| p.additional).collect()
    }

    pub fn principal_payments(&self) -> Vec<Money> {
        self.periods.iter().map(|p| p.principal).collect()
    }

    pub fn total_payments(&self) -> Money {
        self.periods.iter().map(|p| p.payment).sum()
    }

    pub fn total_interest(&self) -> Money {
        self.periods.iter().map(|p| p.interest).sum()
    }

    pub fn total_additional(&self) -> Money {
        self.periods.iter().map(|p| p.additional).sum()
    }
}

impl fmt::Display for Amortization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amortization({})", self.principal)
    }
}

/// `principal.amortize(&rates)` as shorthand for [`Amortization::new`].
pub trait Amortize {
    fn amortize(self, rates: &[Rate]) -> FinCalcResult<Amortization>;

    fn amortize_with<F>(self, rates: &[Rate], adjust: F) -> FinCalcResult<Amortization>
    where
        F: Fn(&TentativePeriod) -> Money;
}

impl Amortize for Money {
    fn amortize(self, rates: &[Rate]) -> FinCalcResult<Amortization> {
        Amortization::new(self, rates)
    }

    fn amortize_with<F>(self, rates: &[Rate], adjust: F) -> FinCalcResult<Amortization>
    where
        F: Fn(&TentativePeriod) -> Money,
    {
        Amortization::with_adjustment(self, rates, adjust)
    }
}

// ---------------------------------------------------------------------------
// Schedule computation
// ---------------------------------------------------------------------------

/// Returns the total number of scheduled periods.
fn validate(principal: Money, rates: &[Rate]) -> FinCalcResult<u32> {
    if principal < Decimal::ZERO {
        return Err(FinCalcError::invalid(
            "principal",
            "Principal must be non-negative",
        ));
    }
    if rates.is_empty() {
        return Err(FinCalcError::InsufficientData(
            "Amortization requires at least one rate".into(),
        ));
    }

    let mut scheduled: u32 = 0;
    for (i, rate) in rates.iter().enumerate() {
        let periods = rate.duration().ok_or_else(|| {
            FinCalcError::invalid(
                &format!("rates[{i}].duration"),
                "every rate in an amortization needs a duration",
            )
        })?;
        scheduled = scheduled
            .checked_add(periods)
            .ok_or_else(|| FinCalcError::invalid("rates", "total duration is too large"))?;
    }
    if scheduled == 0 {
        return Err(FinCalcError::invalid(
            "rates",
            "rate durations must cover at least one period",
        ));
    }
    Ok(scheduled)
}

/// Level payment retiring `balance` over `periods` at periodic rate `rate`:
/// `-(B * r / (1 - (1 + r)^-n))`, straight-line when `r` is zero.
pub fn level_payment(balance: Money, rate: Decimal, periods: u32) -> FinCalcResult<Money> {
    if periods == 0 {
        return Err(FinCalcError::invalid(
            "periods",
            "level payment needs at least one period",
        ));
    }
    let n = Decimal::from(periods);
    if rate.is_zero() {
        return Ok(-round_money(balance / n));
    }

    let not_representable =
        || FinCalcError::invalid("rate", format!("level payment at {rate} is not representable"));
    // (1 + r)^-n vanishes once (1 + r)^n leaves the decimal range.
    let discount = match checked_powi(Decimal::ONE + rate, i64::from(periods)) {
        Some(growth) => Decimal::ONE.checked_div(growth).ok_or_else(not_representable)?,
        None => Decimal::ZERO,
    };
    let factor = rate
        .checked_div(Decimal::ONE - discount)
        .ok_or_else(not_representable)?;
    balance
        .checked_mul(factor)
        .map(|amount| -round_money(amount))
        .ok_or_else(not_representable)
}

fn compute_schedule(
    principal: Money,
    rates: &[Rate],
    scheduled: u32,
    adjustment: Option<Adjustment<'_>>,
) -> FinCalcResult<Vec<Period>> {
    let mut periods: Vec<Period> = Vec::with_capacity(scheduled as usize);
    let mut balance = principal;
    let mut issued: u32 = 0;

    for rate in rates {
        let span = rate.duration().unwrap_or(0);
        if span == 0 {
            continue;
        }
        if balance.is_zero() {
            break;
        }
        let periodic = rate.monthly();
        let level = level_payment(balance, periodic, scheduled - issued)?;

        for _ in 0..span {
            if balance.is_zero() {
                break;
            }

            let opening = balance;
            let interest = round_money(opening * periodic);
            balance += interest;

            let mut payment = match adjustment {
                Some(adjust) => adjust(&TentativePeriod {
                    period: issued + 1,
                    payment: level,
                    interest,
                    principal: level + interest,
                    opening_balance: opening,
                }),
                None => level,
            };
            let requested = match adjustment {
                Some(_) => payment - level,
                None => Decimal::ZERO,
            };
            // Never pay past zero. The cap eats into a requested extra
            // payment first and never turns it into a refund.
            let mut additional = requested;
            if -payment > balance {
                let relief = -balance - payment;
                payment = -balance;
                if requested < Decimal::ZERO {
                    additional = (requested + relief).min(Decimal::ZERO);
                }
            }

            balance += payment;
            issued += 1;
            periods.push(Period {
                period: issued,
                rate: periodic,
                payment,
                interest,
                principal: payment - additional + interest,
                additional,
                balance,
            });
        }
    }

    let residue = balance;
    if !residue.is_zero() {
        if let Some(last) = periods.last_mut() {
            last.payment -= residue;
            last.principal -= residue;
            last.balance = Decimal::ZERO;
        }
    }

    debug!(
        principal = %principal,
        scheduled,
        issued,
        residue = %residue,
        "amortization schedule built"
    );
    Ok(periods)
}

// ---------------------------------------------------------------------------
// JSON entry point
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationInput {
    pub principal: Money,
    /// Rate spans, each with a `duration` in periods.
    pub rates: Vec<Rate>,
    /// Paid on top of the level payment every period (positive amount).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_payment: Option<Money>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationOutput {
    pub periods: Vec<Period>,
    pub duration: u32,
    pub scheduled_duration: u32,
    /// `None` when the payment changes across the schedule.
    pub payment: Option<Money>,
    pub final_payment: Option<Money>,
    pub total_payments: Money,
    pub total_interest: Money,
    pub total_principal: Money,
    pub total_additional: Money,
}

/// Build an amortization schedule wrapped in the standard output envelope.
pub fn build_amortization(
    input: &AmortizationInput,
) -> FinCalcResult<ComputationOutput<AmortizationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let schedule = match input.extra_payment {
        Some(extra) if extra < Decimal::ZERO => {
            return Err(FinCalcError::invalid(
                "extra_payment",
                "Extra payment must be non-negative",
            ));
        }
        Some(extra) if !extra.is_zero() => {
            Amortization::with_adjustment(input.principal, &input.rates, |p| p.payment - extra)?
        }
        _ => Amortization::new(input.principal, &input.rates)?,
    };

    let duration = schedule.duration();
    let scheduled_duration = schedule.scheduled_duration();
    if input.principal.is_zero() {
        warnings.push("Principal is zero; no periods were issued".into());
    } else if duration < scheduled_duration {
        warnings.push(format!(
            "Loan retired after {duration} of {scheduled_duration} scheduled periods"
        ));
    }

    let output = AmortizationOutput {
        duration,
        scheduled_duration,
        payment: schedule.payment(),
        final_payment: schedule.periods().last().map(|p| p.payment),
        total_payments: schedule.total_payments(),
        total_interest: schedule.total_interest(),
        total_principal: schedule.principal_payments().iter().sum(),
        total_additional: schedule.total_additional(),
        periods: schedule.periods,
    };

    let methodology = if input.rates.len() > 1 {
        "Adjustable-rate amortization (level payment re-set per rate span)"
    } else {
        "Fixed-rate level-payment amortization"
    };
    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(methodology, input, warnings, elapsed, output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate::RateKind;
    use rust_decimal_macros::dec;

    fn apr(value: Decimal, months: u32) -> Rate {
        Rate::new(value, RateKind::Apr).unwrap().with_duration(months)
    }

    #[test]
    fn test_level_payment_reference() {
        let payment = level_payment(dec!(200000), dec!(0.003125), 360).unwrap();
        assert_eq!(payment, dec!(-926.23));
    }

    #[test]
    fn test_level_payment_zero_rate_is_straight_line() {
        assert_eq!(level_payment(dec!(10000), Decimal::ZERO, 360).unwrap(), dec!(-27.78));
        assert!(level_payment(dec!(10000), Decimal::ZERO, 0).is_err());
    }

    #[test]
    fn test_rows_reconcile() {
        let schedule = Amortization::new(dec!(50000), &[apr(dec!(0.05), 120)]).unwrap();
        let mut opening = dec!(50000);
        for p in schedule.periods() {
            assert_eq!(p.payment, p.principal + p.additional - p.interest);
            assert_eq!(p.balance, opening + p.interest + p.payment);
            opening = p.balance;
        }
        assert_eq!(schedule.balance(), Decimal::ZERO);
        let retired: Money = schedule.principal_payments().iter().sum();
        assert_eq!(retired, dec!(-50000));
    }

    #[test]
    fn test_adjustment_sees_tentative_period() {
        let schedule = Amortization::with_adjustment(dec!(1000), &[apr(dec!(0.12), 12)], |p| {
            assert_eq!(p.principal, p.payment + p.interest);
            assert!(p.opening_balance > Decimal::ZERO);
            p.payment
        })
        .unwrap();
        assert!(schedule.additional_payments().iter().all(|a| a.is_zero()));
    }

    #[test]
    fn test_overshooting_adjustment_pays_off_exactly() {
        let schedule =
            Amortization::with_adjustment(dec!(1000), &[apr(dec!(0.12), 12)], |_| dec!(-5000))
                .unwrap();
        assert_eq!(schedule.duration(), 1);
        // 1000 + 10.00 interest
        assert_eq!(schedule.payments(), vec![dec!(-1010.00)]);
        assert_eq!(schedule.balance(), Decimal::ZERO);
    }

    #[test]
    fn test_level_payment_when_growth_overflows() {
        assert_eq!(level_payment(dec!(1000), dec!(0.25), 360).unwrap(), dec!(-250.00));
    }

    #[test]
    fn test_zero_principal_issues_no_periods() {
        let schedule = Amortization::new(Decimal::ZERO, &[apr(dec!(0.05), 12)]).unwrap();
        assert_eq!(schedule.duration(), 0);
        assert_eq!(schedule.payment(), None);
        assert_eq!(schedule.balance(), Decimal::ZERO);
    }

    #[test]
    fn test_validation() {
        let undated = Rate::new(dec!(0.05), RateKind::Apr).unwrap();
        assert!(matches!(
            Amortization::new(dec!(1000), &[undated]),
            Err(FinCalcError::InvalidInput { .. })
        ));
        assert!(matches!(
            Amortization::new(dec!(1000), &[]),
            Err(FinCalcError::InsufficientData(_))
        ));
        assert!(matches!(
            Amortization::new(dec!(-1), &[apr(dec!(0.05), 12)]),
            Err(FinCalcError::InvalidInput { .. })
        ));
        assert!(Amortization::new(dec!(1000), &[apr(dec!(0.05), 0)]).is_err());
    }

    #[test]
    fn test_display() {
        let schedule = Amortization::new(dec!(10000.00), &[apr(dec!(0.0375), 360)]).unwrap();
        assert_eq!(schedule.to_string(), "Amortization(10000.00)");
    }

    #[test]
    fn test_build_amortization_envelope() {
        let input = AmortizationInput {
            principal: dec!(200000),
            rates: vec![apr(dec!(0.0375), 360)],
            extra_payment: Some(dec!(100)),
        };
        let out = build_amortization(&input).unwrap();
        assert_eq!(out.result.duration, 301);
        assert_eq!(out.result.scheduled_duration, 360);
        assert_eq!(out.result.payment, Some(dec!(-1026.23)));
        assert_eq!(out.result.total_principal + out.result.total_additional, dec!(-200000));
        assert!(out.warnings.iter().any(|w| w.contains("301 of 360")));
    }

    #[test]
    fn test_build_amortization_rejects_negative_extra() {
        let input = AmortizationInput {
            principal: dec!(1000),
            rates: vec![apr(dec!(0.05), 12)],
            extra_payment: Some(dec!(-1)),
        };
        assert!(build_amortization(&input).is_err());
    }
}
