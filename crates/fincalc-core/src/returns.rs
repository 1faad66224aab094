//! Internal rate of return for periodic (IRR) and dated (XIRR) cash flows.
//!
//! Both run the secant solver: IRR against NPV, XIRR against XNPV anchored at
//! the first date. Seeds come from the cash flow amounts alone.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::FinCalcError;
use crate::rate::{Compounding, Rate, RateKind};
use crate::solver::{
    check_sign_change, default_first_guess, default_second_guess, without_leading, SecantConfig,
    SecantOutcome, SecantSolver,
};
use crate::time_value::{npv_checked, validate_dated, xnpv, xnpv_checked};
use crate::types::{unzip_dated, DatedAmount, Money};
use crate::FinCalcResult;

// ---------------------------------------------------------------------------
// IRR
// ---------------------------------------------------------------------------

/// Internal rate of return of evenly spaced cash flows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Irr {
    pub cashflows: Vec<Money>,
    pub result: Decimal,
    pub iterations: u32,
    pub converged: bool,
}

impl Irr {
    pub fn new(cashflows: &[Money]) -> FinCalcResult<Self> {
        Irr::with_guesses(cashflows, None, None, SecantConfig::default())
    }

    /// Solve with optional explicit first/second guesses and solver settings.
    pub fn with_guesses(
        cashflows: &[Money],
        first_guess: Option<Decimal>,
        second_guess: Option<Decimal>,
        config: SecantConfig,
    ) -> FinCalcResult<Self> {
        check_sign_change(cashflows)?;

        let r1 = match first_guess {
            Some(guess) => guess,
            None => default_first_guess(cashflows)?,
        };
        let r2 = second_guess.unwrap_or_else(|| {
            let inflows = without_leading(cashflows);
            default_second_guess(cashflows, r1, |rate| npv_checked(rate, &inflows))
        });

        let solver = SecantSolver::new(|rate| npv_checked(rate, cashflows), config);
        let outcome = solver.solve(r1, r2);
        Ok(Irr::from_outcome(cashflows, outcome))
    }

    fn from_outcome(cashflows: &[Money], outcome: SecantOutcome) -> Self {
        Irr {
            cashflows: cashflows.to_vec(),
            result: outcome.rate,
            iterations: outcome.iterations,
            converged: outcome.converged,
        }
    }
}

impl fmt::Display for Irr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IRR({})", self.result)
    }
}

// ---------------------------------------------------------------------------
// XIRR
// ---------------------------------------------------------------------------

/// Internal rate of return of irregularly dated cash flows, annualised on a
/// 365-day year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Xirr {
    pub cashflows: Vec<Money>,
    pub dates: Vec<NaiveDate>,
    pub result: Decimal,
    pub iterations: u32,
    pub converged: bool,
}

impl Xirr {
    pub fn new(cashflows: &[Money], dates: &[NaiveDate]) -> FinCalcResult<Self> {
        Xirr::with_guesses(cashflows, dates, None, None, SecantConfig::default())
    }

    pub fn with_transactions<T: DatedAmount>(transactions: &[T]) -> FinCalcResult<Self> {
        let (cashflows, dates) = unzip_dated(transactions);
        Xirr::new(&cashflows, &dates)
    }

    pub fn with_guesses(
        cashflows: &[Money],
        dates: &[NaiveDate],
        first_guess: Option<Decimal>,
        second_guess: Option<Decimal>,
        config: SecantConfig,
    ) -> FinCalcResult<Self> {
        validate_dated(cashflows, dates)?;
        check_sign_change(cashflows)?;

        let r1 = match first_guess {
            Some(guess) => guess,
            None => default_first_guess(cashflows)?,
        };
        let r2 = second_guess.unwrap_or_else(|| {
            let inflows = without_leading(cashflows);
            default_second_guess(cashflows, r1, |rate| xnpv_checked(rate, &inflows, dates))
        });

        let solver = SecantSolver::new(|rate| xnpv_checked(rate, cashflows, dates), config);
        let outcome = solver.solve(r1, r2);
        Ok(Xirr {
            cashflows: cashflows.to_vec(),
            dates: dates.to_vec(),
            result: outcome.rate,
            iterations: outcome.iterations,
            converged: outcome.converged,
        })
    }

    /// The result as an annually compounded APR.
    pub fn to_rate(&self) -> FinCalcResult<Rate> {
        Rate::with_compounding(self.result, RateKind::Apr, Compounding::Annually)
    }
}

impl fmt::Display for Xirr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "XIRR({})", self.result)
    }
}

// ---------------------------------------------------------------------------
// Sequence extensions
// ---------------------------------------------------------------------------

/// Rate-of-return helpers on a sequence of periodic amounts.
pub trait Cashflows {
    /// Internal rate of return.
    fn irr(&self) -> FinCalcResult<Decimal>;

    /// Present value with the first amount at time zero:
    /// `sum(cf[i] / (1 + rate)^i)`.
    fn npv(&self, rate: Decimal) -> FinCalcResult<Money>;
}

impl Cashflows for [Money] {
    fn irr(&self) -> FinCalcResult<Decimal> {
        Irr::new(self).map(|irr| irr.result)
    }

    fn npv(&self, rate: Decimal) -> FinCalcResult<Money> {
        let discounted = crate::time_value::npv(rate, self)?;
        Ok(discounted * (Decimal::ONE + rate))
    }
}

/// Rate-of-return helpers on a sequence of dated amounts.
pub trait TransactionFlows {
    /// XIRR as an annually compounded APR.
    fn xirr(&self) -> FinCalcResult<Rate>;

    fn xnpv(&self, rate: Decimal) -> FinCalcResult<Money>;
}

impl<T: DatedAmount> TransactionFlows for [T] {
    fn xirr(&self) -> FinCalcResult<Rate> {
        Xirr::with_transactions(self)?.to_rate()
    }

    fn xnpv(&self, rate: Decimal) -> FinCalcResult<Money> {
        if self.is_empty() {
            return Err(FinCalcError::InsufficientData(
                "XNPV requires at least one transaction".into(),
            ));
        }
        let (cashflows, dates) = unzip_dated(self);
        xnpv(rate, &cashflows, &dates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_irr_known_value() {
        let flows = vec![dec!(-4000), dec!(1200), dec!(1410), dec!(1875), dec!(1050)];
        let irr = Irr::new(&flows).unwrap();
        assert!(irr.converged);
        assert_eq!(irr.result.round_dp(3), dec!(0.143));
    }

    #[test]
    fn test_irr_is_scale_and_sign_invariant() {
        let flows = vec![dec!(-10), dec!(20), dec!(30), dec!(40)];
        let negated: Vec<Decimal> = flows.iter().map(|f| -f).collect();
        let a = Irr::new(&flows).unwrap().result;
        let b = Irr::new(&negated).unwrap().result;
        assert!((a - b).abs() < dec!(0.000001));
    }

    #[test]
    fn test_irr_explicit_guesses() {
        let flows = vec![dec!(-4000), dec!(1200), dec!(1410), dec!(1875), dec!(1050)];
        let irr =
            Irr::with_guesses(&flows, Some(dec!(0.1)), Some(dec!(0.2)), SecantConfig::default())
                .unwrap();
        assert_eq!(irr.result.round_dp(3), dec!(0.143));
    }

    #[test]
    fn test_irr_rejects_no_sign_change() {
        assert!(matches!(
            Irr::new(&[dec!(10), dec!(20), dec!(30)]),
            Err(FinCalcError::NonConvergentCashflows(_))
        ));
    }

    #[test]
    fn test_xirr_rejects_mismatched_lengths() {
        assert!(matches!(
            Xirr::new(&[dec!(-10), dec!(20)], &[date(2018, 1, 1)]),
            Err(FinCalcError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_labels() {
        let irr = Irr::new(&[dec!(-100), dec!(110)]).unwrap();
        assert_eq!(irr.to_string(), format!("IRR({})", irr.result));
        let xirr = Xirr::new(
            &[dec!(-10), dec!(20), dec!(30), dec!(40)],
            &[date(2018, 1, 1), date(2018, 6, 1), date(2018, 9, 1), date(2018, 12, 1)],
        )
        .unwrap();
        assert!(xirr.to_string().contains("XIRR"));
        assert!(xirr.to_string().contains(&xirr.result.to_string()));
    }

    #[test]
    fn test_sequence_npv_values_first_flow_at_time_zero() {
        let flows = vec![dec!(-100.0), dec!(60), dec!(60), dec!(60)];
        assert_eq!(flows.npv(dec!(0.1)).unwrap().round_dp(3), dec!(49.211));
    }
}
