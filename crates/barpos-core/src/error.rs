//! # Error Types
//!
//! Domain-specific error types for barpos-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  barpos-core errors (this file)                                        │
//! │  ├── CoreError        - Cart and checkout rule violations              │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  barpos-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  Terminal errors (in app)                                              │
//! │  └── TerminalError    - What the operator sees (code + message)        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ──┐                                 │
//! │                         DbError ─────┴──► TerminalError → Console      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Messages carry the line id, row or balance the operator needs to fix
//! the input.

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Cart and checkout errors.
///
/// None of these are fatal: the console reports them and the operator
/// corrects the input.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A cart line id that is not (or no longer) in the cart.
    ///
    /// ## When This Occurs
    /// - Line removed, then a stale id is reused
    /// - Operator mistyped the line number
    #[error("Cart line not found: {0}")]
    LineNotFound(u32),

    /// A payment row index outside the current checkout rows.
    #[error("Payment row not found: {0}")]
    PaymentRowNotFound(usize),

    /// Finalization refused because too little was tendered.
    ///
    /// ## User Workflow
    /// ```text
    /// grand total 2124, paid 2000
    ///      │
    ///      ▼
    /// balance_due = 124 > tolerance (1)
    ///      │
    ///      ▼
    /// InsufficientPayment { balance_due: 124.00 }
    ///      │
    ///      ▼
    /// Checkout stays open, operator adds a payment row
    /// ```
    #[error("Insufficient payment: balance due {balance_due}")]
    InsufficientPayment { balance_due: Money },

    /// The requested operation does not fit the current checkout state.
    ///
    /// ## When This Occurs
    /// - Editing the cart while payment entry is open
    /// - Paying or finalizing with no checkout open
    /// - Opening a second checkout
    #[error("Invalid checkout state: {0}")]
    InvalidCheckoutState(String),

    /// Validation error (wraps ValidationError).
    ///
    /// An empty cart at checkout is reported as `Empty { field: "cart" }`.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or blank.
    #[error("{field} is required")]
    Required { field: String },

    /// A collection that must have at least one element is empty.
    #[error("{field} is empty")]
    Empty { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g. non-numeric amount, bad date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientPayment {
            balance_due: Money::from_major(124),
        };
        assert_eq!(err.to_string(), "Insufficient payment: balance due 124.00");

        assert_eq!(CoreError::LineNotFound(7).to_string(), "Cart line not found: 7");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");

        let err = ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 100,
        };
        assert_eq!(err.to_string(), "tax_rate must be between 0 and 100");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Empty {
            field: "cart".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
