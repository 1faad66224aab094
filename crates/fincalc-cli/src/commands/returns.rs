use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;

use fincalc_core::returns::{Irr, Xirr};
use fincalc_core::solver::SecantConfig;
use fincalc_core::Transaction;

use super::{envelope, required};
use crate::input;

/// Secant solver overrides shared by IRR and XIRR
#[derive(Args)]
pub struct SolverFlags {
    /// First rate guess (default: closed-form seed from the cash flows)
    #[arg(long, allow_hyphen_values = true)]
    pub guess: Option<Decimal>,

    /// Second rate guess (default: refined from the first)
    #[arg(long, allow_hyphen_values = true)]
    pub second_guess: Option<Decimal>,

    /// Stop once successive guesses differ by less than this
    #[arg(long)]
    pub epsilon: Option<Decimal>,

    /// Iteration cap
    #[arg(long)]
    pub max_iterations: Option<u32>,
}

/// Solver settings as they appear in an input document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SolverInput {
    #[serde(default)]
    guess: Option<Decimal>,
    #[serde(default)]
    second_guess: Option<Decimal>,
    #[serde(default)]
    epsilon: Option<Decimal>,
    #[serde(default)]
    max_iterations: Option<u32>,
}

impl SolverInput {
    fn from_flags(flags: &SolverFlags) -> Self {
        SolverInput {
            guess: flags.guess,
            second_guess: flags.second_guess,
            epsilon: flags.epsilon,
            max_iterations: flags.max_iterations,
        }
    }

    fn config(&self) -> SecantConfig {
        let defaults = SecantConfig::default();
        SecantConfig {
            epsilon: self.epsilon.unwrap_or(defaults.epsilon),
            max_iterations: self.max_iterations.unwrap_or(defaults.max_iterations),
        }
    }
}

fn convergence_warnings(converged: bool, iterations: u32, config: SecantConfig) -> Vec<String> {
    if converged {
        Vec::new()
    } else if iterations >= config.max_iterations {
        vec![format!(
            "Secant iteration stopped at the {} iteration cap before converging",
            config.max_iterations
        )]
    } else {
        vec!["Secant iteration diverged; result is the last finite guess".to_string()]
    }
}

// ---------------------------------------------------------------------------
// IRR
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct IrrArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Cash flows, one per period (comma-separated, e.g. "-4000,1200,1410")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub cash_flows: Option<Vec<Decimal>>,

    #[command(flatten)]
    pub solver: SolverFlags,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IrrInput {
    cash_flows: Vec<Decimal>,
    #[serde(flatten)]
    solver: SolverInput,
}

pub fn run_irr(args: IrrArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let started = Instant::now();
    let doc: IrrInput = match input::read_document(args.input.as_deref())? {
        Some(doc) => doc,
        None => IrrInput {
            cash_flows: args.cash_flows.ok_or_else(|| required("cash-flows"))?,
            solver: SolverInput::from_flags(&args.solver),
        },
    };

    let config = doc.solver.config();
    let irr = Irr::with_guesses(
        &doc.cash_flows,
        doc.solver.guess,
        doc.solver.second_guess,
        config,
    )?;
    let warnings = convergence_warnings(irr.converged, irr.iterations, config);
    envelope("IRR (secant method on NPV)", &doc, warnings, started, irr)
}

// ---------------------------------------------------------------------------
// XIRR
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct XirrArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Cash flow amounts (comma-separated)
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub cash_flows: Option<Vec<Decimal>>,

    /// Dates matching the cash flows (comma-separated, YYYY-MM-DD)
    #[arg(long, value_delimiter = ',')]
    pub dates: Option<Vec<NaiveDate>>,

    #[command(flatten)]
    pub solver: SolverFlags,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct XirrInput {
    transactions: Vec<Transaction>,
    #[serde(flatten)]
    solver: SolverInput,
}

/// XIRR result with the annualised rate it implies.
#[derive(Debug, Serialize)]
struct XirrReport {
    result: Decimal,
    effective: Decimal,
    iterations: u32,
    converged: bool,
    transactions: usize,
}

pub fn run_xirr(args: XirrArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let started = Instant::now();
    let doc: XirrInput = match input::read_document(args.input.as_deref())? {
        Some(doc) => doc,
        None => {
            let amounts = args.cash_flows.ok_or_else(|| required("cash-flows"))?;
            let dates = args.dates.ok_or_else(|| required("dates"))?;
            if amounts.len() != dates.len() {
                return Err(format!(
                    "--cash-flows has {} entries but --dates has {}",
                    amounts.len(),
                    dates.len()
                )
                .into());
            }
            XirrInput {
                transactions: amounts
                    .into_iter()
                    .zip(dates)
                    .map(|(amount, date)| Transaction::new(amount, date))
                    .collect(),
                solver: SolverInput::from_flags(&args.solver),
            }
        }
    };

    let config = doc.solver.config();
    let (cash_flows, dates) = fincalc_core::unzip_dated(&doc.transactions);
    let xirr = Xirr::with_guesses(
        &cash_flows,
        &dates,
        doc.solver.guess,
        doc.solver.second_guess,
        config,
    )?;
    let report = XirrReport {
        result: xirr.result,
        effective: xirr.to_rate()?.effective(),
        iterations: xirr.iterations,
        converged: xirr.converged,
        transactions: doc.transactions.len(),
    };
    let warnings = convergence_warnings(xirr.converged, xirr.iterations, config);
    envelope(
        "XIRR (secant method on XNPV, 365-day year)",
        &doc,
        warnings,
        started,
        report,
    )
}
