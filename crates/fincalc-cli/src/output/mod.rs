pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use clap::ValueEnum;
use serde_json::Value;

/// How a command result is written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// The full envelope, pretty-printed
    Json,
    /// Field/value table, schedules as one row per period
    Table,
    /// Field/value pairs, or one record per period for schedules
    Csv,
    /// Only the headline number
    Minimal,
}

/// Render `value` in `format`.
pub fn format_output(format: OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formats_parse_from_flag_values() {
        assert_eq!(OutputFormat::from_str("table", true), Ok(OutputFormat::Table));
        assert_eq!(OutputFormat::from_str("MINIMAL", true), Ok(OutputFormat::Minimal));
        assert!(OutputFormat::from_str("yaml", true).is_err());
    }
}
