use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use fincalc_core::amortization::{self, AmortizationInput};
use fincalc_core::rate::{Compounding, Rate, RateKind};

use super::required;
use crate::input;

/// Arguments for an amortization schedule
///
/// Flags describe a single fixed-rate loan; adjustable-rate schedules with
/// several rate spans come from `--input` or stdin.
#[derive(Args)]
pub struct AmortizeArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Loan principal
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Annual rate (e.g. 0.0375)
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// How the rate is quoted: nominal, effective, apr or apy
    #[arg(long, default_value = "apr")]
    pub kind: RateKind,

    /// Rate compounding convention
    #[arg(long, default_value = "monthly")]
    pub compounds: Compounding,

    /// Term in monthly periods
    #[arg(long)]
    pub months: Option<u32>,

    /// Extra amount paid on top of the level payment every month
    #[arg(long)]
    pub extra_payment: Option<Decimal>,

    /// Print only the period-by-period schedule
    #[arg(long)]
    pub schedule_only: bool,
}

pub fn run_amortize(args: AmortizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let amortization_input: AmortizationInput =
        match input::read_document(args.input.as_deref())? {
            Some(doc) => doc,
            None => {
                let principal = args.principal.ok_or_else(|| required("principal"))?;
                let value = args.rate.ok_or_else(|| required("rate"))?;
                let months = args.months.ok_or_else(|| required("months"))?;
                let rate =
                    Rate::with_compounding(value, args.kind, args.compounds)?.with_duration(months);
                AmortizationInput {
                    principal,
                    rates: vec![rate],
                    extra_payment: args.extra_payment,
                }
            }
        };

    let result = amortization::build_amortization(&amortization_input)?;
    if args.schedule_only {
        return Ok(serde_json::to_value(&result.result.periods)?);
    }
    Ok(serde_json::to_value(result)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_adjustable_rate_document() {
        let doc: AmortizationInput = serde_json::from_str(
            r#"{
                "principal": "200000",
                "rates": [
                    {"value": "0.0375", "kind": "apr", "duration": 36},
                    {"value": "0.0475", "kind": "apr", "duration": 324}
                ]
            }"#,
        )
        .unwrap();
        let out = amortization::build_amortization(&doc).unwrap();
        assert_eq!(out.result.duration, 360);
        assert_eq!(out.result.payment, None);
        assert_eq!(out.result.periods[0].payment, dec!(-926.23));
        assert_eq!(
            out.methodology,
            "Adjustable-rate amortization (level payment re-set per rate span)"
        );
    }
}
