//! Deterministic FCFF discounted cash flow valuation.
//!
//! The engine is a library of pure functions: a projection of free cash flow
//! to the firm from a handful of percentage assumptions, a valuation that
//! discounts the stream plus a terminal value at WACC and bridges to equity
//! value per share, and a sensitivity grid over (WACC, terminal growth).
//! No I/O, no shared state; identical inputs give identical decimal outputs.

pub mod error;
pub mod time_value;
pub mod types;

#[cfg(feature = "valuation")]
pub mod valuation;

#[cfg(feature = "suggestions")]
pub mod suggestions;

pub use error::DcfError;
pub use types::*;

/// Standard result type for all DCF operations
pub type DcfResult<T> = Result<T, DcfError>;
