use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DcfError {
    #[error("Invalid assumptions: {field} — {reason}")]
    InvalidAssumptions { field: String, reason: String },

    #[error("Invalid terminal assumption: terminal growth ({growth}) must be strictly below WACC ({wacc})")]
    InvalidTerminalAssumption { wacc: Decimal, growth: Decimal },

    #[error("Invalid share count: {0} (must be positive)")]
    InvalidShareCount(Decimal),

    #[error("Numeric overflow in {context}")]
    NumericOverflow { context: String },

    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Missing input: {field} is required")]
    MissingInput { field: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl DcfError {
    pub(crate) fn assumptions(field: &str, reason: impl Into<String>) -> Self {
        DcfError::InvalidAssumptions {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn overflow(context: impl Into<String>) -> Self {
        DcfError::NumericOverflow {
            context: context.into(),
        }
    }
}

impl From<serde_json::Error> for DcfError {
    fn from(e: serde_json::Error) -> Self {
        DcfError::SerializationError(e.to_string())
    }
}

/// Turns the `None` of a checked decimal operation into `NumericOverflow`.
pub(crate) trait OrOverflow {
    fn or_overflow(self, context: &str) -> Result<Decimal, DcfError>;
}

impl OrOverflow for Option<Decimal> {
    fn or_overflow(self, context: &str) -> Result<Decimal, DcfError> {
        self.ok_or_else(|| DcfError::overflow(context))
    }
}
