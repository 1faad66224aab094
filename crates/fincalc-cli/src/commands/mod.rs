pub mod amortization;
pub mod rate;
pub mod returns;
pub mod time_value;

use serde::Serialize;
use serde_json::Value;
use std::time::Instant;

use fincalc_core::with_metadata;

/// Wrap a calculator result in the standard output envelope.
pub(crate) fn envelope<I: Serialize, T: Serialize>(
    methodology: &str,
    input: &I,
    warnings: Vec<String>,
    started: Instant,
    result: T,
) -> Result<Value, Box<dyn std::error::Error>> {
    let elapsed = started.elapsed().as_micros() as u64;
    let output = with_metadata(methodology, input, warnings, elapsed, result);
    Ok(serde_json::to_value(output)?)
}

/// Error for a flag that is required when no input document was given.
pub(crate) fn required(flag: &str) -> String {
    format!("--{flag} is required (or provide --input)")
}
