use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;

use fincalc_core::rate::{Compounding, Rate, RateKind};

use super::{envelope, required};
use crate::input;

/// Arguments for rate conversion
#[derive(Args)]
pub struct RateArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Quoted annual rate (e.g. 0.0375)
    #[arg(long, allow_hyphen_values = true)]
    pub value: Option<Decimal>,

    /// How the value is quoted: nominal, effective, apr or apy
    #[arg(long, default_value = "nominal")]
    pub kind: RateKind,

    /// Compounding: annually, semiannually, quarterly, monthly, daily,
    /// continuously, or a number of times per year
    #[arg(long, default_value = "monthly")]
    pub compounds: Compounding,
}

/// Every representation of one rate.
#[derive(Debug, Serialize)]
struct RateReport {
    kind: RateKind,
    compounds: Compounding,
    nominal: Decimal,
    effective: Decimal,
    monthly: Decimal,
    monthly_compounded: Decimal,
    label: String,
}

pub fn run_rate(args: RateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let started = Instant::now();
    let rate = match input::read_document::<Rate>(args.input.as_deref())? {
        Some(rate) => rate,
        None => {
            let value = args.value.ok_or_else(|| required("value"))?;
            Rate::with_compounding(value, args.kind, args.compounds)?
        }
    };

    let report = RateReport {
        kind: rate.kind(),
        compounds: rate.compounds(),
        nominal: rate.nominal(),
        effective: rate.effective(),
        monthly: rate.monthly(),
        monthly_compounded: rate.monthly_compounded()?,
        label: rate.to_string(),
    };
    envelope(
        "Rate conversion: (1 + nominal/n)^n - 1, continuous limit e^nominal - 1",
        &rate,
        Vec::new(),
        started,
        report,
    )
}
