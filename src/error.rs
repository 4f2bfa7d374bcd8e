//! Error types for loan and currency calculations.

use thiserror::Error;

/// A specialized Result type for loan calculations.
pub type LoanResult<T> = Result<T, LoanError>;

/// Errors raised when loan parameters or currency data are unusable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoanError {
    /// Principal was zero, negative, or not a finite number.
    #[error("Invalid principal: {value} (must be a positive amount)")]
    InvalidPrincipal { value: f64 },

    /// Term was zero, negative, fractional, or not a finite number.
    #[error("Invalid term: {value} years (must be a whole number of years, at least 1)")]
    InvalidTerm { value: f64 },

    /// Annual rate was negative or not a finite number.
    #[error("Invalid interest rate: {value}% (must be zero or greater)")]
    InvalidRate { value: f64 },

    /// No exchange rate is known for the currency code.
    #[error("Unknown currency: {code}")]
    UnknownCurrency { code: String },

    /// Exchange rates could not be read from the supplied payload.
    #[error("Exchange rates unavailable: {reason}")]
    RatesUnavailable { reason: String },
}

#[cfg(test)]
mod tests {
    use super::LoanError;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            LoanError::InvalidPrincipal { value: -5. }.to_string(),
            "Invalid principal: -5 (must be a positive amount)"
        );
        assert_eq!(
            LoanError::InvalidTerm { value: 1.5 }.to_string(),
            "Invalid term: 1.5 years (must be a whole number of years, at least 1)"
        );
        assert_eq!(
            LoanError::UnknownCurrency {
                code: "XYZ".to_string()
            }
            .to_string(),
            "Unknown currency: XYZ"
        );
    }
}
