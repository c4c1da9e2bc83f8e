use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoanError {
    #[error("Invalid input: {field} ({reason})")]
    InvalidInput { field: String, reason: String },

    #[error("Schedule did not converge after {iterations} periods (remaining balance {remaining_balance:.2})")]
    NonConvergence {
        iterations: usize,
        remaining_balance: f64,
    },

    #[error("{0} does not return a new payment date")]
    DateOverflow(NaiveDate),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LoanError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        LoanError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for all loan calculations
pub type LoanResult<T> = Result<T, LoanError>;
