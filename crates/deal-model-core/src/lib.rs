pub mod assumptions;
pub mod error;
pub mod facts;
pub mod time_value;
pub mod types;

#[cfg(feature = "ma")]
pub mod ma;

#[cfg(feature = "scenarios")]
pub mod scenarios;

pub use error::DealModelError;
pub use types::*;

/// Standard result type for all deal-model operations
pub type DealModelResult<T> = Result<T, DealModelError>;
