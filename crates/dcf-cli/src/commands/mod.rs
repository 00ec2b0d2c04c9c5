pub mod suggest;
pub mod valuation;
