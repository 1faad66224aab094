//! Closed-form time-value-of-money calculators.
//!
//! Sign convention: positive values are cash received, negative values are
//! cash paid out. `rate` is always the rate per period.
//!
//! Every calculator is available as a plain function and as a result object
//! (`Pv`, `Fv`, ...) that keeps its inputs alongside the result and renders
//! as `PV(<result>)`, `FV(<result>)` and so on.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::decimal::{checked_ln, checked_pow};
use crate::error::FinCalcError;
use crate::types::{unzip_dated, DatedAmount, Money};
use crate::FinCalcResult;

/// Day-count basis for date-weighted discounting (leap years ignored).
pub const DAYS_PER_YEAR: Decimal = dec!(365);

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn validate_rate(rate: Decimal) -> FinCalcResult<()> {
    if rate <= dec!(-1) {
        return Err(FinCalcError::invalid(
            "rate",
            "Discount rate must be greater than -100%",
        ));
    }
    Ok(())
}

fn annuity_type(pay_at_beginning: bool) -> Decimal {
    if pay_at_beginning {
        Decimal::ONE
    } else {
        Decimal::ZERO
    }
}

/// `(1 + rate)^periods`, failing when it cannot be represented.
fn growth(rate: Decimal, periods: Decimal) -> FinCalcResult<Decimal> {
    checked_pow(Decimal::ONE + rate, periods).ok_or_else(|| {
        FinCalcError::invalid(
            "rate",
            format!("(1 + {rate})^{periods} is not representable"),
        )
    })
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Present value of a level annuity plus a terminal amount.
pub fn pv(
    rate: Decimal,
    num_periods: Decimal,
    payment: Money,
    future_value: Money,
    pay_at_beginning: bool,
) -> FinCalcResult<Money> {
    if num_periods < Decimal::ZERO {
        return Err(FinCalcError::invalid(
            "num_periods",
            "Cannot calculate present value with negative periods. Use future value instead.",
        ));
    }
    validate_rate(rate)?;

    if rate.is_zero() {
        return Ok(-(future_value + payment * num_periods));
    }

    let compound = growth(rate, num_periods)?;
    let due = Decimal::ONE + rate * annuity_type(pay_at_beginning);
    let annuity = payment * due * (Decimal::ONE - Decimal::ONE / compound) / rate;
    Ok(-(future_value / compound + annuity))
}

/// Future value of a present amount plus a level annuity.
pub fn fv(
    rate: Decimal,
    num_periods: Decimal,
    payment: Money,
    present_value: Money,
    pay_at_beginning: bool,
) -> FinCalcResult<Money> {
    if num_periods < Decimal::ZERO {
        return Err(FinCalcError::invalid(
            "num_periods",
            "Cannot calculate future value with negative periods. Use present value instead.",
        ));
    }
    validate_rate(rate)?;

    if rate.is_zero() {
        return Ok(-(present_value + payment * num_periods));
    }

    let compound = growth(rate, num_periods)?;
    let due = Decimal::ONE + rate * annuity_type(pay_at_beginning);
    Ok(-(present_value * compound + payment * due * (compound - Decimal::ONE) / rate))
}

/// Level payment that amortizes `present_value` down to `future_value`.
pub fn pmt(
    rate: Decimal,
    num_periods: Decimal,
    present_value: Money,
    future_value: Money,
    pay_at_beginning: bool,
) -> FinCalcResult<Money> {
    if num_periods <= Decimal::ZERO {
        return Err(FinCalcError::invalid(
            "num_periods",
            "Number of periods must be > 0",
        ));
    }
    validate_rate(rate)?;

    if rate.is_zero() {
        return Ok(-(present_value + future_value) / num_periods);
    }

    let compound = growth(rate, num_periods)?;
    let due = Decimal::ONE + rate * annuity_type(pay_at_beginning);
    Ok((present_value * compound + future_value) * rate / (due * (Decimal::ONE - compound)))
}

/// Number of periods needed for `payment` to move `present_value` to `future_value`.
pub fn nper(
    rate: Decimal,
    payment: Money,
    present_value: Money,
    future_value: Money,
    pay_at_beginning: bool,
) -> FinCalcResult<Decimal> {
    validate_rate(rate)?;

    if rate.is_zero() {
        if payment.is_zero() {
            return Err(FinCalcError::invalid(
                "payment",
                "Payment must be non-zero when the rate is zero",
            ));
        }
        return Ok(-(present_value + future_value) / payment);
    }

    let initial = payment * (Decimal::ONE + rate * annuity_type(pay_at_beginning));
    let denominator = initial + present_value * rate;
    if denominator.is_zero() {
        return Err(FinCalcError::invalid(
            "payment",
            "Payment only covers interest; the balance never amortizes",
        ));
    }

    let ratio = (initial - future_value * rate) / denominator;
    let numerator = checked_ln(ratio).ok_or_else(|| {
        FinCalcError::invalid(
            "payment",
            "No number of periods reaches the future value with these cash flows",
        )
    })?;
    let per_period = checked_ln(Decimal::ONE + rate)
        .ok_or_else(|| FinCalcError::invalid("rate", "ln(1 + rate) is undefined"))?;
    Ok(numerator / per_period)
}

/// Interest portion of the payment made in `period` (1-based).
pub fn ipmt(
    rate: Decimal,
    period: Decimal,
    num_periods: Decimal,
    present_value: Money,
    future_value: Money,
    pay_at_beginning: bool,
) -> FinCalcResult<Money> {
    if period < Decimal::ONE || period > num_periods || !period.fract().is_zero() {
        return Err(FinCalcError::invalid(
            "period",
            format!("Period must be a whole number between 1 and {num_periods}"),
        ));
    }

    let payment = pmt(rate, num_periods, present_value, future_value, pay_at_beginning)?;
    if rate.is_zero() || (pay_at_beginning && period == Decimal::ONE) {
        return Ok(Decimal::ZERO);
    }

    // Balance carried into the period, compounded forward period - 1 times.
    let opening = fv(
        rate,
        period - Decimal::ONE,
        payment,
        present_value,
        pay_at_beginning,
    )?;
    let interest = opening * rate;
    if pay_at_beginning {
        Ok(interest / (Decimal::ONE + rate))
    } else {
        Ok(interest)
    }
}

/// Principal portion of the payment made in `period` (1-based).
pub fn ppmt(
    rate: Decimal,
    period: Decimal,
    num_periods: Decimal,
    present_value: Money,
    future_value: Money,
    pay_at_beginning: bool,
) -> FinCalcResult<Money> {
    let payment = pmt(rate, num_periods, present_value, future_value, pay_at_beginning)?;
    let interest = ipmt(
        rate,
        period,
        num_periods,
        present_value,
        future_value,
        pay_at_beginning,
    )?;
    Ok(payment - interest)
}

/// NPV with every flow discounted one full period more than its index:
/// `sum(cf[i] / (1 + rate)^(i + 1))`. `None` when not representable.
pub(crate) fn npv_checked(rate: Decimal, cash_flows: &[Money]) -> Option<Money> {
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;
    let mut total = Decimal::ZERO;
    for cf in cash_flows {
        discount = discount.checked_mul(one_plus_r)?;
        total = total.checked_add(cf.checked_div(discount)?)?;
    }
    Some(total)
}

/// Net present value; the first flow is discounted one full period.
pub fn npv(rate: Decimal, cash_flows: &[Money]) -> FinCalcResult<Money> {
    validate_rate(rate)?;
    npv_checked(rate, cash_flows).ok_or_else(|| {
        FinCalcError::invalid("rate", format!("NPV at {rate} is not representable"))
    })
}

/// XNPV on a 365-day year anchored at `dates[0]`. Lengths must already match.
pub(crate) fn xnpv_checked(
    rate: Decimal,
    cash_flows: &[Money],
    dates: &[NaiveDate],
) -> Option<Money> {
    let one_plus_r = Decimal::ONE + rate;
    if one_plus_r <= Decimal::ZERO {
        return None;
    }
    let anchor = *dates.first()?;
    let mut total = Decimal::ZERO;
    for (cf, date) in cash_flows.iter().zip(dates) {
        let years = Decimal::from((*date - anchor).num_days()) / DAYS_PER_YEAR;
        let discount = checked_pow(one_plus_r, years)?;
        total = total.checked_add(cf.checked_div(discount)?)?;
    }
    Some(total)
}

pub(crate) fn validate_dated(cash_flows: &[Money], dates: &[NaiveDate]) -> FinCalcResult<()> {
    if cash_flows.len() != dates.len() {
        return Err(FinCalcError::invalid(
            "dates",
            format!(
                "cashflows and dates must be the same length ({} vs {})",
                cash_flows.len(),
                dates.len()
            ),
        ));
    }
    if cash_flows.is_empty() {
        return Err(FinCalcError::InsufficientData(
            "XNPV requires at least one dated cash flow".into(),
        ));
    }
    Ok(())
}

/// Net present value of irregularly dated cash flows.
pub fn xnpv(rate: Decimal, cash_flows: &[Money], dates: &[NaiveDate]) -> FinCalcResult<Money> {
    validate_dated(cash_flows, dates)?;
    validate_rate(rate)?;
    xnpv_checked(rate, cash_flows, dates).ok_or_else(|| {
        FinCalcError::invalid("rate", format!("XNPV at {rate} is not representable"))
    })
}

// ---------------------------------------------------------------------------
// Result objects
// ---------------------------------------------------------------------------

/// Present value calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pv {
    pub rate: Decimal,
    pub num_periods: Decimal,
    pub payment: Money,
    pub future_value: Money,
    pub pay_at_beginning: bool,
    pub result: Money,
}

impl Pv {
    pub fn new(
        rate: Decimal,
        num_periods: Decimal,
        payment: Money,
        future_value: Money,
        pay_at_beginning: bool,
    ) -> FinCalcResult<Self> {
        let result = pv(rate, num_periods, payment, future_value, pay_at_beginning)?;
        Ok(Pv {
            rate,
            num_periods,
            payment,
            future_value,
            pay_at_beginning,
            result,
        })
    }

    pub fn pays_at_beginning(&self) -> bool {
        self.pay_at_beginning
    }
}

/// Future value calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fv {
    pub rate: Decimal,
    pub num_periods: Decimal,
    pub payment: Money,
    pub present_value: Money,
    pub pay_at_beginning: bool,
    pub result: Money,
}

impl Fv {
    pub fn new(
        rate: Decimal,
        num_periods: Decimal,
        payment: Money,
        present_value: Money,
        pay_at_beginning: bool,
    ) -> FinCalcResult<Self> {
        let result = fv(rate, num_periods, payment, present_value, pay_at_beginning)?;
        Ok(Fv {
            rate,
            num_periods,
            payment,
            present_value,
            pay_at_beginning,
            result,
        })
    }

    pub fn pays_at_beginning(&self) -> bool {
        self.pay_at_beginning
    }
}

/// Periodic payment calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pmt {
    pub rate: Decimal,
    pub num_periods: Decimal,
    pub present_value: Money,
    pub future_value: Money,
    pub pay_at_beginning: bool,
    pub result: Money,
}

impl Pmt {
    pub fn new(
        rate: Decimal,
        num_periods: Decimal,
        present_value: Money,
        future_value: Money,
        pay_at_beginning: bool,
    ) -> FinCalcResult<Self> {
        let result = pmt(rate, num_periods, present_value, future_value, pay_at_beginning)?;
        Ok(Pmt {
            rate,
            num_periods,
            present_value,
            future_value,
            pay_at_beginning,
            result,
        })
    }

    pub fn pays_at_beginning(&self) -> bool {
        self.pay_at_beginning
    }
}

/// Number-of-periods calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nper {
    pub rate: Decimal,
    pub payment: Money,
    pub present_value: Money,
    pub future_value: Money,
    pub pay_at_beginning: bool,
    pub result: Decimal,
}

impl Nper {
    pub fn new(
        rate: Decimal,
        payment: Money,
        present_value: Money,
        future_value: Money,
        pay_at_beginning: bool,
    ) -> FinCalcResult<Self> {
        let result = nper(rate, payment, present_value, future_value, pay_at_beginning)?;
        Ok(Nper {
            rate,
            payment,
            present_value,
            future_value,
            pay_at_beginning,
            result,
        })
    }

    pub fn pays_at_beginning(&self) -> bool {
        self.pay_at_beginning
    }
}

/// Interest-portion calculation for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ipmt {
    pub rate: Decimal,
    pub period: Decimal,
    pub num_periods: Decimal,
    pub present_value: Money,
    pub future_value: Money,
    pub pay_at_beginning: bool,
    pub result: Money,
}

impl Ipmt {
    pub fn new(
        rate: Decimal,
        period: Decimal,
        num_periods: Decimal,
        present_value: Money,
        future_value: Money,
        pay_at_beginning: bool,
    ) -> FinCalcResult<Self> {
        let result = ipmt(
            rate,
            period,
            num_periods,
            present_value,
            future_value,
            pay_at_beginning,
        )?;
        Ok(Ipmt {
            rate,
            period,
            num_periods,
            present_value,
            future_value,
            pay_at_beginning,
            result,
        })
    }

    pub fn pays_at_beginning(&self) -> bool {
        self.pay_at_beginning
    }
}

/// Principal-portion calculation for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ppmt {
    pub rate: Decimal,
    pub period: Decimal,
    pub num_periods: Decimal,
    pub present_value: Money,
    pub future_value: Money,
    pub pay_at_beginning: bool,
    pub result: Money,
}

impl Ppmt {
    pub fn new(
        rate: Decimal,
        period: Decimal,
        num_periods: Decimal,
        present_value: Money,
        future_value: Money,
        pay_at_beginning: bool,
    ) -> FinCalcResult<Self> {
        let result = ppmt(
            rate,
            period,
            num_periods,
            present_value,
            future_value,
            pay_at_beginning,
        )?;
        Ok(Ppmt {
            rate,
            period,
            num_periods,
            present_value,
            future_value,
            pay_at_beginning,
            result,
        })
    }

    pub fn pays_at_beginning(&self) -> bool {
        self.pay_at_beginning
    }
}

/// Net present value of evenly spaced cash flows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Npv {
    pub rate: Decimal,
    pub cashflows: Vec<Money>,
    pub result: Money,
}

impl Npv {
    pub fn new(rate: Decimal, cashflows: &[Money]) -> FinCalcResult<Self> {
        let result = npv(rate, cashflows)?;
        Ok(Npv {
            rate,
            cashflows: cashflows.to_vec(),
            result,
        })
    }
}

/// Net present value of irregularly dated cash flows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Xnpv {
    pub rate: Decimal,
    pub cashflows: Vec<Money>,
    pub dates: Vec<NaiveDate>,
    pub result: Money,
}

impl Xnpv {
    pub fn new(rate: Decimal, cashflows: &[Money], dates: &[NaiveDate]) -> FinCalcResult<Self> {
        let result = xnpv(rate, cashflows, dates)?;
        Ok(Xnpv {
            rate,
            cashflows: cashflows.to_vec(),
            dates: dates.to_vec(),
            result,
        })
    }

    pub fn with_transactions<T: DatedAmount>(
        rate: Decimal,
        transactions: &[T],
    ) -> FinCalcResult<Self> {
        let (cashflows, dates) = unzip_dated(transactions);
        Xnpv::new(rate, &cashflows, &dates)
    }
}

macro_rules! labelled {
    ($($ty:ty => $label:literal),* $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, concat!($label, "({})"), self.result)
                }
            }
        )*
    };
}

labelled! {
    Pv => "PV",
    Fv => "FV",
    Pmt => "PMT",
    Nper => "NPER",
    Ipmt => "IPMT",
    Ppmt => "PPMT",
    Npv => "NPV",
    Xnpv => "XNPV",
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: Decimal, expected: Decimal, tol: Decimal) {
        let diff = (actual - expected).abs();
        assert!(diff <= tol, "expected ~{expected}, got {actual} (diff = {diff})");
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_pv_basic() {
        let result = pv(dec!(0.02), dec!(10), dec!(-100), Decimal::ZERO, false).unwrap();
        assert_close(result, dec!(898.2585006242236), dec!(0.0000001));
    }

    #[test]
    fn test_pv_sign_follows_payment() {
        assert!(pv(dec!(0.1), dec!(10), dec!(-100), Decimal::ZERO, false).unwrap() > Decimal::ZERO);
        assert!(pv(dec!(0.1), dec!(10), dec!(100), Decimal::ZERO, false).unwrap() < Decimal::ZERO);
        assert_eq!(
            pv(dec!(0.1), dec!(10), Decimal::ZERO, Decimal::ZERO, false).unwrap(),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_pv_annuity_due_is_larger() {
        let ordinary = pv(dec!(0.1), dec!(10), dec!(-100), Decimal::ZERO, false).unwrap();
        let due = pv(dec!(0.1), dec!(10), dec!(-100), Decimal::ZERO, true).unwrap();
        assert_close(due, ordinary * dec!(1.1), dec!(0.0000001));
    }

    #[test]
    fn test_pv_negative_periods_rejected() {
        assert!(pv(dec!(0.1), dec!(-1), dec!(-100), Decimal::ZERO, false).is_err());
        assert!(fv(dec!(0.1), dec!(-1), dec!(-100), Decimal::ZERO, false).is_err());
    }

    #[test]
    fn test_fv_basic() {
        let result = fv(dec!(0.02), dec!(10), dec!(-100), Decimal::ZERO, false).unwrap();
        assert_close(result, dec!(1094.972100), dec!(0.000001));
    }

    #[test]
    fn test_zero_periods() {
        assert_eq!(
            fv(dec!(0.1), Decimal::ZERO, dec!(-100), dec!(250), false).unwrap(),
            dec!(-250)
        );
        assert_eq!(
            pv(dec!(0.1), Decimal::ZERO, dec!(-100), dec!(250), false).unwrap(),
            dec!(-250)
        );
    }

    #[test]
    fn test_pmt_basic() {
        let result = pmt(dec!(0.1), dec!(20), dec!(1000), Decimal::ZERO, false).unwrap();
        assert_close(result, dec!(-117.459625), dec!(0.000001));
    }

    #[test]
    fn test_pmt_zero_rate() {
        let result = pmt(Decimal::ZERO, dec!(360), dec!(10000), Decimal::ZERO, false).unwrap();
        assert_eq!(result, dec!(-10000) / dec!(360));
    }

    #[test]
    fn test_nper_round_trips_pmt() {
        let payment = pmt(dec!(0.01), dec!(24), dec!(5000), Decimal::ZERO, false).unwrap();
        let n = nper(dec!(0.01), payment, dec!(5000), Decimal::ZERO, false).unwrap();
        assert_close(n, dec!(24), dec!(0.0000001));
    }

    #[test]
    fn test_nper_interest_only_rejected() {
        assert!(nper(dec!(0.1), dec!(-100), dec!(1000), Decimal::ZERO, false).is_err());
    }

    #[test]
    fn test_ipmt_first_period_is_full_interest() {
        let interest =
            ipmt(dec!(0.1), Decimal::ONE, dec!(20), dec!(1000), Decimal::ZERO, false).unwrap();
        assert_close(interest, dec!(-100), dec!(0.0000001));
        let due = ipmt(dec!(0.1), Decimal::ONE, dec!(20), dec!(1000), Decimal::ZERO, true).unwrap();
        assert_eq!(due, Decimal::ZERO);
    }

    #[test]
    fn test_ipmt_plus_ppmt_is_pmt() {
        let payment = pmt(dec!(0.1), dec!(20), dec!(1000), Decimal::ZERO, false).unwrap();
        let interest =
            ipmt(dec!(0.1), dec!(10), dec!(20), dec!(1000), Decimal::ZERO, false).unwrap();
        let principal =
            ppmt(dec!(0.1), dec!(10), dec!(20), dec!(1000), Decimal::ZERO, false).unwrap();
        assert_close(interest + principal, payment, dec!(0.0000000001));
        assert!(interest < Decimal::ZERO && interest > payment);
    }

    #[test]
    fn test_ipmt_period_out_of_range() {
        assert!(
            ipmt(dec!(0.1), Decimal::ZERO, dec!(20), dec!(1000), Decimal::ZERO, false).is_err()
        );
        assert!(ipmt(dec!(0.1), dec!(21), dec!(20), dec!(1000), Decimal::ZERO, false).is_err());
    }

    #[test]
    fn test_npv_discounts_first_flow() {
        let result = npv(dec!(0.1), &[dec!(10), dec!(10), dec!(10), dec!(10)]).unwrap();
        assert_close(result, dec!(31.6986544634), dec!(0.0000001));
    }

    #[test]
    fn test_npv_zero_rate() {
        let cfs = vec![dec!(-100), dec!(50), dec!(50), dec!(50)];
        assert_eq!(npv(Decimal::ZERO, &cfs).unwrap(), dec!(50));
    }

    #[test]
    fn test_npv_rejects_rate_at_minus_one() {
        assert!(npv(dec!(-1), &[dec!(1)]).is_err());
    }

    #[test]
    fn test_xnpv_anchor_flow_undiscounted() {
        let dates = [date(2017, 1, 1), date(2018, 1, 1)];
        let result = xnpv(dec!(0.1), &[dec!(-100), dec!(110)], &dates).unwrap();
        assert_close(result, Decimal::ZERO, dec!(0.0000001));
    }

    #[test]
    fn test_xnpv_validation() {
        let dates = [date(2017, 1, 1), date(2017, 3, 1)];
        assert!(matches!(
            xnpv(dec!(0.02), &[dec!(1000)], &dates),
            Err(FinCalcError::InvalidInput { .. })
        ));
        assert!(matches!(
            xnpv(dec!(0.02), &[], &[]),
            Err(FinCalcError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_labels() {
        let present = Pv::new(dec!(0.1), dec!(10), dec!(-100), Decimal::ZERO, false).unwrap();
        assert_eq!(present.to_string(), format!("PV({})", present.result));
        assert!(!present.pays_at_beginning());
        let n = Npv::new(dec!(0.1), &[dec!(10)]).unwrap();
        assert!(n.to_string().starts_with("NPV("));
    }
}
