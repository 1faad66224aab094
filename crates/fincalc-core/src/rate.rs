//! Interest rates and compounding conventions.
//!
//! A [`Rate`] is stored in both its nominal and effective annual form, so
//! either view is available regardless of how the rate was quoted. Rates
//! compare by effective yield only.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::decimal::{checked_exp, checked_ln, checked_pow, checked_powi, round_half_up};
use crate::error::FinCalcError;
use crate::FinCalcResult;

/// Fractional digits kept on the monthly periodic rate.
const MONTHLY_DP: u32 = 15;
const MONTHS_PER_YEAR: Decimal = dec!(12);

// ---------------------------------------------------------------------------
// Rate kind
// ---------------------------------------------------------------------------

/// How the quoted magnitude of a rate should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateKind {
    Nominal,
    Effective,
    /// Annual percentage rate, read as an effective rate.
    Apr,
    /// Annual percentage yield, read as an effective rate.
    Apy,
}

impl RateKind {
    pub fn is_effective(self) -> bool {
        !matches!(self, RateKind::Nominal)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RateKind::Nominal => "nominal",
            RateKind::Effective => "effective",
            RateKind::Apr => "apr",
            RateKind::Apy => "apy",
        }
    }
}

impl fmt::Display for RateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RateKind {
    type Err = FinCalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nominal" => Ok(RateKind::Nominal),
            "effective" => Ok(RateKind::Effective),
            "apr" => Ok(RateKind::Apr),
            "apy" => Ok(RateKind::Apy),
            other => Err(FinCalcError::invalid(
                "kind",
                format!("'{other}' is not one of apr, apy, effective, nominal"),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Compounding
// ---------------------------------------------------------------------------

/// Number of times per year interest is compounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "CompoundingRepr", into = "CompoundingRepr")]
pub enum Compounding {
    Annually,
    Semiannually,
    Quarterly,
    #[default]
    Monthly,
    Daily,
    Continuously,
    /// An explicit, positive number of compounding periods per year.
    PerYear(u32),
}

impl Compounding {
    pub fn per_year(times: u32) -> FinCalcResult<Self> {
        if times == 0 {
            return Err(FinCalcError::invalid(
                "compounds",
                "times per year must be positive",
            ));
        }
        Ok(Compounding::PerYear(times))
    }

    /// Compounding periods per year; `None` for continuous compounding.
    pub fn periods_per_year(self) -> Option<u32> {
        match self {
            Compounding::Annually => Some(1),
            Compounding::Semiannually => Some(2),
            Compounding::Quarterly => Some(4),
            Compounding::Monthly => Some(12),
            Compounding::Daily => Some(365),
            Compounding::Continuously => None,
            Compounding::PerYear(n) => Some(n),
        }
    }
}

impl fmt::Display for Compounding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compounding::Annually => write!(f, "annually"),
            Compounding::Semiannually => write!(f, "semiannually"),
            Compounding::Quarterly => write!(f, "quarterly"),
            Compounding::Monthly => write!(f, "monthly"),
            Compounding::Daily => write!(f, "daily"),
            Compounding::Continuously => write!(f, "continuously"),
            Compounding::PerYear(n) => write!(f, "{n}"),
        }
    }
}

impl FromStr for Compounding {
    type Err = FinCalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_ascii_lowercase();
        match token.as_str() {
            "annually" => Ok(Compounding::Annually),
            "semiannually" | "semi-annually" => Ok(Compounding::Semiannually),
            "quarterly" => Ok(Compounding::Quarterly),
            "monthly" => Ok(Compounding::Monthly),
            "daily" => Ok(Compounding::Daily),
            "continuously" => Ok(Compounding::Continuously),
            other => match other.parse::<u32>() {
                Ok(n) => Compounding::per_year(n),
                Err(_) => Err(FinCalcError::invalid(
                    "compounds",
                    format!("unknown compounding period '{other}'"),
                )),
            },
        }
    }
}

/// Wire form of [`Compounding`]: a token or a count per year.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum CompoundingRepr {
    Times(u32),
    Token(String),
}

impl TryFrom<CompoundingRepr> for Compounding {
    type Error = FinCalcError;

    fn try_from(repr: CompoundingRepr) -> Result<Self, Self::Error> {
        match repr {
            CompoundingRepr::Times(n) => Compounding::per_year(n),
            CompoundingRepr::Token(token) => token.parse(),
        }
    }
}

impl From<Compounding> for CompoundingRepr {
    fn from(c: Compounding) -> Self {
        match c {
            Compounding::PerYear(n) => CompoundingRepr::Times(n),
            named => CompoundingRepr::Token(named.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Rate
// ---------------------------------------------------------------------------

/// An annual interest rate, optionally applying for a fixed number of periods.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "RateRepr", into = "RateRepr")]
pub struct Rate {
    kind: RateKind,
    compounds: Compounding,
    nominal: Decimal,
    effective: Decimal,
    duration: Option<u32>,
}

/// Wire form of [`Rate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RateRepr {
    value: Decimal,
    kind: RateKind,
    #[serde(default)]
    compounds: Compounding,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration: Option<u32>,
}

impl TryFrom<RateRepr> for Rate {
    type Error = FinCalcError;

    fn try_from(repr: RateRepr) -> Result<Self, Self::Error> {
        let rate = Rate::with_compounding(repr.value, repr.kind, repr.compounds)?;
        Ok(match repr.duration {
            Some(periods) => rate.with_duration(periods),
            None => rate,
        })
    }
}

impl From<Rate> for RateRepr {
    fn from(rate: Rate) -> Self {
        RateRepr {
            value: rate.value(),
            kind: rate.kind,
            compounds: rate.compounds,
            duration: rate.duration,
        }
    }
}

impl Rate {
    /// A rate compounded monthly.
    pub fn new(value: Decimal, kind: RateKind) -> FinCalcResult<Self> {
        Rate::with_compounding(value, kind, Compounding::default())
    }

    pub fn with_compounding(
        value: Decimal,
        kind: RateKind,
        compounds: Compounding,
    ) -> FinCalcResult<Self> {
        let (nominal, effective) = if kind.is_effective() {
            (Rate::to_nominal(value, compounds)?, value)
        } else {
            (value, Rate::to_effective(value, compounds)?)
        };
        Ok(Rate {
            kind,
            compounds,
            nominal,
            effective,
            duration: None,
        })
    }

    /// The same rate applying for `periods` periods.
    pub fn with_duration(mut self, periods: u32) -> Self {
        self.duration = Some(periods);
        self
    }

    pub fn kind(&self) -> RateKind {
        self.kind
    }

    pub fn compounds(&self) -> Compounding {
        self.compounds
    }

    pub fn duration(&self) -> Option<u32> {
        self.duration
    }

    /// The magnitude as quoted.
    pub fn value(&self) -> Decimal {
        if self.kind.is_effective() {
            self.effective
        } else {
            self.nominal
        }
    }

    pub fn nominal(&self) -> Decimal {
        self.nominal
    }

    /// Effective annual yield.
    pub fn effective(&self) -> Decimal {
        self.effective
    }

    pub fn apr(&self) -> Decimal {
        self.effective()
    }

    pub fn apy(&self) -> Decimal {
        self.effective()
    }

    /// Monthly periodic rate used for loan amortization (`effective / 12`).
    pub fn monthly(&self) -> Decimal {
        round_half_up(self.effective / MONTHS_PER_YEAR, MONTHLY_DP)
    }

    /// Monthly rate that compounds to the effective yield:
    /// `(1 + effective)^(1/12) - 1`.
    pub fn monthly_compounded(&self) -> FinCalcResult<Decimal> {
        checked_pow(Decimal::ONE + self.effective, Decimal::ONE / MONTHS_PER_YEAR)
            .map(|growth| growth - Decimal::ONE)
            .ok_or_else(|| {
                FinCalcError::invalid("rate", "monthly equivalent is not representable")
            })
    }

    /// Convert a nominal annual rate into an effective annual yield.
    pub fn to_effective(nominal: Decimal, compounds: Compounding) -> FinCalcResult<Decimal> {
        let effective = match compounds.periods_per_year() {
            None => checked_exp(nominal).map(|growth| growth - Decimal::ONE),
            Some(n) => {
                let periodic = nominal / Decimal::from(n);
                if periodic <= dec!(-1) {
                    None
                } else {
                    checked_powi(Decimal::ONE + periodic, i64::from(n))
                        .map(|growth| growth - Decimal::ONE)
                }
            }
        };
        effective.ok_or_else(|| {
            FinCalcError::invalid(
                "rate",
                format!("nominal rate {nominal} compounded {compounds} has no effective yield"),
            )
        })
    }

    /// Convert an effective annual yield into a nominal annual rate.
    pub fn to_nominal(effective: Decimal, compounds: Compounding) -> FinCalcResult<Decimal> {
        let growth = Decimal::ONE + effective;
        let nominal = match compounds.periods_per_year() {
            None => checked_ln(growth),
            Some(n) => {
                let n = Decimal::from(n);
                if growth <= Decimal::ZERO {
                    None
                } else {
                    checked_pow(growth, Decimal::ONE / n).map(|root| n * (root - Decimal::ONE))
                }
            }
        };
        nominal.ok_or_else(|| {
            FinCalcError::invalid(
                "rate",
                format!("effective rate {effective} must be greater than -100%"),
            )
        })
    }
}

impl PartialEq for Rate {
    fn eq(&self, other: &Self) -> bool {
        self.effective == other.effective
    }
}

impl Eq for Rate {}

impl PartialOrd for Rate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.effective.cmp(&other.effective)
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rate({}, {})", self.value(), self.kind)
    }
}
