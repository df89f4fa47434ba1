//! Error types for panel derivation and curve aggregation

use thiserror::Error;

/// Result alias used throughout the crate
pub type CurveResult<T> = Result<T, CurveError>;

/// Errors raised by the panel store, the derivers and the curve framework
#[derive(Debug, Error)]
pub enum CurveError {
    /// A metric needed by a deriver or a curve is not in the panel
    #[error("Missing required metric: {metric}")]
    MissingMetric { metric: String },

    /// A panel loan has no static record but the operation needs its attributes
    #[error("Loan {loan_id} has no static record (needed by {context})")]
    UnknownLoan { loan_id: u32, context: String },

    /// Pivot column not present in the static table
    #[error("Unknown static attribute: {name}")]
    UnknownAttribute { name: String },

    /// A metric row does not span the panel date axis
    #[error("Row for loan {loan_id} / {metric} has {got} values, expected {expected}")]
    ShapeMismatch {
        loan_id: u32,
        metric: String,
        expected: usize,
        got: usize,
    },

    #[error("Invalid date axis: {reason}")]
    InvalidDates { reason: String },

    #[error("Could not parse {context}: {value:?}")]
    Parse { context: String, value: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CurveError {
    pub fn missing_metric(metric: impl std::fmt::Display) -> Self {
        Self::MissingMetric {
            metric: metric.to_string(),
        }
    }

    pub fn unknown_loan(loan_id: u32, context: impl Into<String>) -> Self {
        Self::UnknownLoan {
            loan_id,
            context: context.into(),
        }
    }

    pub fn parse(context: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Parse {
            context: context.into(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CurveError::missing_metric("Payment Made");
        assert_eq!(err.to_string(), "Missing required metric: Payment Made");

        let err = CurveError::unknown_loan(7, "Seasoning");
        assert!(err.to_string().contains("Loan 7"));
        assert!(err.to_string().contains("Seasoning"));
    }
}
