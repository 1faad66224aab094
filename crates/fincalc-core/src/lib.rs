pub mod decimal;
pub mod error;
pub mod rate;
pub mod solver;
pub mod time_value;
pub mod types;

#[cfg(feature = "returns")]
pub mod returns;

#[cfg(feature = "amortization")]
pub mod amortization;

pub use error::FinCalcError;
pub use types::*;

/// Standard result type for all fincalc operations
pub type FinCalcResult<T> = Result<T, FinCalcError>;
