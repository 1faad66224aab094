mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::amortization::AmortizeArgs;
use commands::rate::RateArgs;
use commands::returns::{IrrArgs, XirrArgs};
use commands::time_value::{
    FvArgs, IpmtArgs, NperArgs, NpvArgs, PmtArgs, PpmtArgs, PvArgs, XnpvArgs,
};
use output::OutputFormat;

/// Time-value-of-money, rate-of-return and amortization calculations
#[derive(Parser)]
#[command(
    name = "fincalc",
    version,
    about = "Time-value-of-money, rate-of-return and amortization calculations",
    long_about = "A CLI for loan and investment arithmetic with decimal precision. \
                  Supports PV/FV/PMT/NPER/IPMT/PPMT, NPV/XNPV, IRR/XIRR via the \
                  secant method, rate conversions, and amortization schedules \
                  with adjustable rates and extra payments."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log solver and schedule diagnostics to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Present value of an annuity plus a terminal amount
    Pv(PvArgs),
    /// Future value of a present amount plus an annuity
    Fv(FvArgs),
    /// Level payment for a loan or annuity
    Pmt(PmtArgs),
    /// Number of periods to reach a target value
    Nper(NperArgs),
    /// Interest portion of one period's payment
    Ipmt(IpmtArgs),
    /// Principal portion of one period's payment
    Ppmt(PpmtArgs),
    /// Net present value of evenly spaced cash flows
    Npv(NpvArgs),
    /// Net present value of dated cash flows
    Xnpv(XnpvArgs),
    /// Internal rate of return of evenly spaced cash flows
    Irr(IrrArgs),
    /// Internal rate of return of dated cash flows
    Xirr(XirrArgs),
    /// Convert a rate between nominal, effective and monthly forms
    Rate(RateArgs),
    /// Build a loan amortization schedule
    Amortize(AmortizeArgs),
    /// Print version information
    Version,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "fincalc_core=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // stdout carries the result; diagnostics go to stderr.
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    tracing::debug!(output = ?cli.output, "fincalc starting");

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Pv(args) => commands::time_value::run_pv(args),
        Commands::Fv(args) => commands::time_value::run_fv(args),
        Commands::Pmt(args) => commands::time_value::run_pmt(args),
        Commands::Nper(args) => commands::time_value::run_nper(args),
        Commands::Ipmt(args) => commands::time_value::run_ipmt(args),
        Commands::Ppmt(args) => commands::time_value::run_ppmt(args),
        Commands::Npv(args) => commands::time_value::run_npv(args),
        Commands::Xnpv(args) => commands::time_value::run_xnpv(args),
        Commands::Irr(args) => commands::returns::run_irr(args),
        Commands::Xirr(args) => commands::returns::run_xirr(args),
        Commands::Rate(args) => commands::rate::run_rate(args),
        Commands::Amortize(args) => commands::amortization::run_amortize(args),
        Commands::Version => {
            println!("fincalc {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
