use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;

use fincalc_core::time_value::{Fv, Ipmt, Nper, Npv, Pmt, Ppmt, Pv, Xnpv};

use super::{envelope, required};
use crate::input;

type CmdResult = Result<Value, Box<dyn std::error::Error>>;

// ---------------------------------------------------------------------------
// Shared flags
// ---------------------------------------------------------------------------

/// Flags common to the annuity calculators
#[derive(Args)]
pub struct AnnuityFlags {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Interest rate per period (e.g. 0.005 for 0.5% a month)
    #[arg(long, allow_hyphen_values = true)]
    pub rate: Option<Decimal>,

    /// Number of periods
    #[arg(long, allow_hyphen_values = true)]
    pub periods: Option<Decimal>,

    /// Payments fall at the start of each period (annuity due)
    #[arg(long)]
    pub due: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AnnuityInput {
    rate: Decimal,
    num_periods: Decimal,
    #[serde(default)]
    payment: Decimal,
    #[serde(default)]
    present_value: Decimal,
    #[serde(default)]
    future_value: Decimal,
    #[serde(default)]
    period: Option<Decimal>,
    #[serde(default)]
    pay_at_beginning: bool,
}

impl AnnuityInput {
    fn resolve(
        flags: &AnnuityFlags,
        fill: impl FnOnce(&mut AnnuityInput),
    ) -> Result<Self, Box<dyn std::error::Error>> {
        if let Some(doc) = input::read_document(flags.input.as_deref())? {
            return Ok(doc);
        }
        let mut built = AnnuityInput {
            rate: flags.rate.ok_or_else(|| required("rate"))?,
            num_periods: flags.periods.ok_or_else(|| required("periods"))?,
            payment: Decimal::ZERO,
            present_value: Decimal::ZERO,
            future_value: Decimal::ZERO,
            period: None,
            pay_at_beginning: flags.due,
        };
        fill(&mut built);
        Ok(built)
    }
}

// ---------------------------------------------------------------------------
// PV / FV
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct PvArgs {
    #[command(flatten)]
    pub annuity: AnnuityFlags,

    /// Payment made each period (negative for outflows)
    #[arg(long, allow_hyphen_values = true)]
    pub payment: Option<Decimal>,

    /// Amount at the end of the last period
    #[arg(long, allow_hyphen_values = true)]
    pub future_value: Option<Decimal>,
}

pub fn run_pv(args: PvArgs) -> CmdResult {
    let started = Instant::now();
    let doc = AnnuityInput::resolve(&args.annuity, |d| {
        d.payment = args.payment.unwrap_or_default();
        d.future_value = args.future_value.unwrap_or_default();
    })?;
    let result = Pv::new(
        doc.rate,
        doc.num_periods,
        doc.payment,
        doc.future_value,
        doc.pay_at_beginning,
    )?;
    envelope("Present value of an annuity", &doc, Vec::new(), started, result)
}

#[derive(Args)]
pub struct FvArgs {
    #[command(flatten)]
    pub annuity: AnnuityFlags,

    /// Payment made each period (negative for outflows)
    #[arg(long, allow_hyphen_values = true)]
    pub payment: Option<Decimal>,

    /// Amount at the start of the first period
    #[arg(long, allow_hyphen_values = true)]
    pub present_value: Option<Decimal>,
}

pub fn run_fv(args: FvArgs) -> CmdResult {
    let started = Instant::now();
    let doc = AnnuityInput::resolve(&args.annuity, |d| {
        d.payment = args.payment.unwrap_or_default();
        d.present_value = args.present_value.unwrap_or_default();
    })?;
    let result = Fv::new(
        doc.rate,
        doc.num_periods,
        doc.payment,
        doc.present_value,
        doc.pay_at_beginning,
    )?;
    envelope("Future value of an annuity", &doc, Vec::new(), started, result)
}

// ---------------------------------------------------------------------------
// PMT / IPMT / PPMT
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct PmtArgs {
    #[command(flatten)]
    pub annuity: AnnuityFlags,

    /// Loan amount or initial balance
    #[arg(long, allow_hyphen_values = true)]
    pub present_value: Option<Decimal>,

    /// Balance left after the last payment
    #[arg(long, allow_hyphen_values = true)]
    pub future_value: Option<Decimal>,
}

pub fn run_pmt(args: PmtArgs) -> CmdResult {
    let started = Instant::now();
    let doc = AnnuityInput::resolve(&args.annuity, |d| {
        d.present_value = args.present_value.unwrap_or_default();
        d.future_value = args.future_value.unwrap_or_default();
    })?;
    let result = Pmt::new(
        doc.rate,
        doc.num_periods,
        doc.present_value,
        doc.future_value,
        doc.pay_at_beginning,
    )?;
    envelope("Level annuity payment", &doc, Vec::new(), started, result)
}

#[derive(Args)]
pub struct PortionArgs {
    #[command(flatten)]
    pub annuity: AnnuityFlags,

    /// Period to split (1-based)
    #[arg(long)]
    pub period: Option<Decimal>,

    /// Loan amount or initial balance
    #[arg(long, allow_hyphen_values = true)]
    pub present_value: Option<Decimal>,

    /// Balance left after the last payment
    #[arg(long, allow_hyphen_values = true)]
    pub future_value: Option<Decimal>,
}

pub type IpmtArgs = PortionArgs;
pub type PpmtArgs = PortionArgs;

fn resolve_portion(
    args: &PortionArgs,
) -> Result<(AnnuityInput, Decimal), Box<dyn std::error::Error>> {
    let doc = AnnuityInput::resolve(&args.annuity, |d| {
        d.period = args.period;
        d.present_value = args.present_value.unwrap_or_default();
        d.future_value = args.future_value.unwrap_or_default();
    })?;
    let period = doc.period.ok_or_else(|| required("period"))?;
    Ok((doc, period))
}

pub fn run_ipmt(args: IpmtArgs) -> CmdResult {
    let started = Instant::now();
    let (doc, period) = resolve_portion(&args)?;
    let result = Ipmt::new(
        doc.rate,
        period,
        doc.num_periods,
        doc.present_value,
        doc.future_value,
        doc.pay_at_beginning,
    )?;
    envelope("Interest portion of a level payment", &doc, Vec::new(), started, result)
}

pub fn run_ppmt(args: PpmtArgs) -> CmdResult {
    let started = Instant::now();
    let (doc, period) = resolve_portion(&args)?;
    let result = Ppmt::new(
        doc.rate,
        period,
        doc.num_periods,
        doc.present_value,
        doc.future_value,
        doc.pay_at_beginning,
    )?;
    envelope("Principal portion of a level payment", &doc, Vec::new(), started, result)
}

// ---------------------------------------------------------------------------
// NPER
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct NperArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Interest rate per period
    #[arg(long, allow_hyphen_values = true)]
    pub rate: Option<Decimal>,

    /// Payment made each period (negative for outflows)
    #[arg(long, allow_hyphen_values = true)]
    pub payment: Option<Decimal>,

    /// Amount at the start of the first period
    #[arg(long, allow_hyphen_values = true)]
    pub present_value: Option<Decimal>,

    /// Target amount after the last period
    #[arg(long, allow_hyphen_values = true)]
    pub future_value: Option<Decimal>,

    /// Payments fall at the start of each period (annuity due)
    #[arg(long)]
    pub due: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NperInput {
    rate: Decimal,
    payment: Decimal,
    #[serde(default)]
    present_value: Decimal,
    #[serde(default)]
    future_value: Decimal,
    #[serde(default)]
    pay_at_beginning: bool,
}

pub fn run_nper(args: NperArgs) -> CmdResult {
    let started = Instant::now();
    let doc: NperInput = match input::read_document(args.input.as_deref())? {
        Some(doc) => doc,
        None => NperInput {
            rate: args.rate.ok_or_else(|| required("rate"))?,
            payment: args.payment.ok_or_else(|| required("payment"))?,
            present_value: args.present_value.unwrap_or_default(),
            future_value: args.future_value.unwrap_or_default(),
            pay_at_beginning: args.due,
        },
    };
    let result = Nper::new(
        doc.rate,
        doc.payment,
        doc.present_value,
        doc.future_value,
        doc.pay_at_beginning,
    )?;
    envelope("Number of periods (logarithmic annuity solution)", &doc, Vec::new(), started, result)
}

// ---------------------------------------------------------------------------
// NPV / XNPV
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct NpvArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Discount rate per period
    #[arg(long, allow_hyphen_values = true)]
    pub rate: Option<Decimal>,

    /// Cash flows, one per period (comma-separated, e.g. "-100,60,60,60")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub cash_flows: Option<Vec<Decimal>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NpvInput {
    rate: Decimal,
    cash_flows: Vec<Decimal>,
}

pub fn run_npv(args: NpvArgs) -> CmdResult {
    let started = Instant::now();
    let doc: NpvInput = match input::read_document(args.input.as_deref())? {
        Some(doc) => doc,
        None => NpvInput {
            rate: args.rate.ok_or_else(|| required("rate"))?,
            cash_flows: args.cash_flows.ok_or_else(|| required("cash-flows"))?,
        },
    };
    let result = Npv::new(doc.rate, &doc.cash_flows)?;
    envelope(
        "Net present value (every flow discounted from one period out)",
        &doc,
        Vec::new(),
        started,
        result,
    )
}

#[derive(Args)]
pub struct XnpvArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Annual discount rate
    #[arg(long, allow_hyphen_values = true)]
    pub rate: Option<Decimal>,

    /// Cash flow amounts (comma-separated)
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub cash_flows: Option<Vec<Decimal>>,

    /// Dates matching the cash flows (comma-separated, YYYY-MM-DD)
    #[arg(long, value_delimiter = ',')]
    pub dates: Option<Vec<NaiveDate>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct XnpvInput {
    rate: Decimal,
    cash_flows: Vec<Decimal>,
    dates: Vec<NaiveDate>,
}

pub fn run_xnpv(args: XnpvArgs) -> CmdResult {
    let started = Instant::now();
    let doc: XnpvInput = match input::read_document(args.input.as_deref())? {
        Some(doc) => doc,
        None => XnpvInput {
            rate: args.rate.ok_or_else(|| required("rate"))?,
            cash_flows: args.cash_flows.ok_or_else(|| required("cash-flows"))?,
            dates: args.dates.ok_or_else(|| required("dates"))?,
        },
    };
    let result = Xnpv::new(doc.rate, &doc.cash_flows, &doc.dates)?;
    envelope(
        "XNPV on a 365-day year anchored at the first date",
        &doc,
        Vec::new(),
        started,
        result,
    )
}
