use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::decimal::parse_decimal;
use crate::error::FinCalcError;
use crate::FinCalcResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Anything that carries a signed amount and the calendar date it occurs on.
///
/// Date-weighted calculations (XNPV, XIRR) accept any slice of these.
pub trait DatedAmount {
    fn amount(&self) -> Money;
    fn date(&self) -> NaiveDate;
}

/// A single dated cash flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub amount: Money,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Transaction {
    pub fn new(amount: Money, date: NaiveDate) -> Self {
        Transaction {
            amount,
            date,
            label: None,
        }
    }

    /// Build a transaction from textual parts, e.g. `("-1000", "1985-01-01")`.
    pub fn parse(amount: &str, date: &str) -> FinCalcResult<Self> {
        let amount = parse_decimal("amount", amount)?;
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|e| FinCalcError::DateError(format!("'{date}' is not a calendar date: {e}")))?;
        Ok(Transaction::new(amount, date))
    }
}

impl DatedAmount for Transaction {
    fn amount(&self) -> Money {
        self.amount
    }

    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl DatedAmount for (NaiveDate, Money) {
    fn amount(&self) -> Money {
        self.1
    }

    fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transaction({})", self.amount)
    }
}

/// Split dated amounts into parallel amount and date vectors.
pub fn unzip_dated<T: DatedAmount>(flows: &[T]) -> (Vec<Money>, Vec<NaiveDate>) {
    flows.iter().map(|t| (t.amount(), t.date())).unzip()
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_transaction_display_includes_amount() {
        let tx = Transaction::new(dec!(100.00), NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert_eq!(tx.to_string(), "Transaction(100.00)");
    }

    #[test]
    fn test_transaction_parse() {
        let tx = Transaction::parse("-1000", "1985-01-01").unwrap();
        assert_eq!(tx.amount, dec!(-1000));
        assert_eq!(tx.date, NaiveDate::from_ymd_opt(1985, 1, 1).unwrap());
    }

    #[test]
    fn test_transaction_parse_rejects_bad_date() {
        assert!(matches!(
            Transaction::parse("10", "1985-02-30"),
            Err(FinCalcError::DateError(_))
        ));
        assert!(matches!(
            Transaction::parse("ten", "1985-02-01"),
            Err(FinCalcError::InvalidNumeric { .. })
        ));
    }

    #[test]
    fn test_unzip_dated_tuples() {
        let d0 = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap();
        let d1 = NaiveDate::from_ymd_opt(2018, 6, 1).unwrap();
        let (amounts, dates) = unzip_dated(&[(d0, dec!(-10)), (d1, dec!(20))]);
        assert_eq!(amounts, vec![dec!(-10), dec!(20)]);
        assert_eq!(dates, vec![d0, d1]);
    }
}
