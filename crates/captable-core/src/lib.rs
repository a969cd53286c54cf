pub mod error;
pub mod time_value;
pub mod types;

pub mod assumptions;
pub mod cap_table;
pub mod projections;
pub mod valuation;

#[cfg(feature = "waterfall")]
pub mod waterfall;

#[cfg(feature = "waterfall")]
pub mod model;

#[cfg(feature = "scenarios")]
pub mod scenarios;

pub use error::CapTableError;
pub use types::*;

/// Standard result type for all cap-table operations
pub type CapTableResult<T> = Result<T, CapTableError>;
