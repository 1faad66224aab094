//! Two-point secant root finder shared by IRR and XIRR.
//!
//! The objective is any function of the rate that returns `None` when its
//! value is not representable. A `None` anywhere in an iteration is the
//! divergence signal: the solver stops and reports the last finite guess.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::decimal::{checked_ln, checked_pow};
use crate::error::FinCalcError;
use crate::types::Money;
use crate::FinCalcResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const DEFAULT_EPSILON: Decimal = dec!(0.0000001);
const DEFAULT_MAX_ITERATIONS: u32 = 1_000;
/// Offset used for the second guess when the closed-form seed is undefined.
const FALLBACK_GUESS_STEP: Decimal = dec!(0.01);

// ---------------------------------------------------------------------------
// Configuration / outcome
// ---------------------------------------------------------------------------

/// Stopping rules for the secant iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecantConfig {
    /// Converged once two successive guesses differ by less than this.
    pub epsilon: Decimal,
    /// Hard cap on iterations; the solver always terminates.
    pub max_iterations: u32,
}

impl Default for SecantConfig {
    fn default() -> Self {
        SecantConfig {
            epsilon: DEFAULT_EPSILON,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// Result of one solver run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecantOutcome {
    /// Last finite guess.
    pub rate: Decimal,
    pub iterations: u32,
    pub converged: bool,
    /// True when the next guess could not be represented.
    pub diverged: bool,
}

// ---------------------------------------------------------------------------
// Solver
// ---------------------------------------------------------------------------

pub struct SecantSolver<F>
where
    F: Fn(Decimal) -> Option<Decimal>,
{
    objective: F,
    config: SecantConfig,
}

impl<F> SecantSolver<F>
where
    F: Fn(Decimal) -> Option<Decimal>,
{
    pub fn new(objective: F, config: SecantConfig) -> Self {
        SecantSolver { objective, config }
    }

    pub fn config(&self) -> SecantConfig {
        self.config
    }

    /// `r1 - f(r1) * (r1 - r2) / (f(r1) - f(r2))`
    fn step(&self, r1: Decimal, r2: Decimal) -> Option<Decimal> {
        let fn1 = (self.objective)(r1)?;
        let fn2 = (self.objective)(r2)?;
        let slope = fn1.checked_sub(fn2)?;
        let delta = fn1.checked_mul(r1.checked_sub(r2)?)?.checked_div(slope)?;
        r1.checked_sub(delta)
    }

    fn converged(&self, r1: Decimal, r2: Decimal) -> bool {
        (r1 - r2).abs() < self.config.epsilon
    }

    /// Iterate from the guess pair `(r1, r2)`.
    pub fn solve(&self, r1: Decimal, r2: Decimal) -> SecantOutcome {
        let (mut r1, mut r2) = (r1, r2);
        let mut iterations = 0;
        let mut diverged = false;

        while iterations < self.config.max_iterations && !self.converged(r1, r2) {
            match self.step(r1, r2) {
                Some(next) => {
                    r2 = r1;
                    r1 = next;
                    iterations += 1;
                }
                None => {
                    diverged = true;
                    break;
                }
            }
        }

        let converged = !diverged && self.converged(r1, r2);
        if diverged {
            warn!(rate = %r1, iterations, "secant iteration diverged; keeping last finite guess");
        } else if !converged {
            warn!(
                rate = %r1,
                iterations,
                max_iterations = self.config.max_iterations,
                "secant iteration hit the iteration cap"
            );
        } else {
            debug!(rate = %r1, iterations, "secant iteration converged");
        }

        SecantOutcome {
            rate: r1,
            iterations,
            converged,
            diverged,
        }
    }
}

// ---------------------------------------------------------------------------
// Cashflow shape checks and seeds
// ---------------------------------------------------------------------------

/// Reject flows with no sign change between the leading flow and the rest.
pub fn check_sign_change(cashflows: &[Money]) -> FinCalcResult<()> {
    if cashflows.len() < 2 {
        return Err(FinCalcError::InsufficientData(
            "rate of return requires at least 2 cash flows".into(),
        ));
    }

    let leading = cashflows[0];
    let rest: Money = cashflows[1..].iter().sum();
    if leading.is_zero() {
        return Err(FinCalcError::NonConvergentCashflows(
            "the leading cash flow is zero".into(),
        ));
    }
    if rest.is_zero() || leading.is_sign_negative() == rest.is_sign_negative() {
        return Err(FinCalcError::NonConvergentCashflows(format!(
            "leading flow {leading} and remaining flows {rest} do not change sign"
        )));
    }
    Ok(())
}

/// Closed-form first guess for a single-outflow, multiple-inflow shape:
/// `(|A| / |C0|)^(2 / N) - 1`.
pub fn default_first_guess(cashflows: &[Money]) -> FinCalcResult<Decimal> {
    check_sign_change(cashflows)?;
    let ratio = inflow_ratio(cashflows);
    let exponent = dec!(2) / Decimal::from(cashflows.len());
    checked_pow(ratio, exponent)
        .map(|growth| growth - Decimal::ONE)
        .ok_or_else(|| FinCalcError::invalid("cashflows", "first guess is not representable"))
}

/// Second guess `(1 + r1)^p - 1` with `p = ln(|A|/|C0|) / ln(A / f(r1))`,
/// where `inflow_value(r1)` is the objective over the flows with the first
/// flow zeroed out.
pub fn default_second_guess<G>(cashflows: &[Money], r1: Decimal, inflow_value: G) -> Decimal
where
    G: Fn(Decimal) -> Option<Decimal>,
{
    let rest: Money = cashflows[1..].iter().sum();
    let seeded = inflow_value(r1).and_then(|value| {
        let numerator = checked_ln(inflow_ratio(cashflows))?;
        let denominator = checked_ln(rest.checked_div(value)?)?;
        if denominator.is_zero() {
            return None;
        }
        let p = numerator.checked_div(denominator)?;
        checked_pow(Decimal::ONE + r1, p).map(|growth| growth - Decimal::ONE)
    });

    match seeded {
        Some(r2) if r2 != r1 => r2,
        _ => {
            debug!(r1 = %r1, "closed-form second guess undefined; stepping from first guess");
            r1 + FALLBACK_GUESS_STEP
        }
    }
}

/// `|A| / |C0|`: remaining flows relative to the leading flow.
fn inflow_ratio(cashflows: &[Money]) -> Decimal {
    let rest: Money = cashflows[1..].iter().sum();
    rest.abs() / cashflows[0].abs()
}

/// Copy of the flows with the leading flow set to zero.
pub(crate) fn without_leading(cashflows: &[Money]) -> Vec<Money> {
    let mut inflows = cashflows.to_vec();
    if let Some(first) = inflows.first_mut() {
        *first = Decimal::ZERO;
    }
    inflows
}
