pub mod amortization;
pub mod arrears;
pub mod config;
pub mod error;
pub mod gate;
pub mod ledger;
pub mod rates;
pub mod settlement;
pub mod types;

pub use error::LendingError;
pub use types::*;

/// Standard result type for all lending operations
pub type LendingResult<T> = Result<T, LendingError>;
