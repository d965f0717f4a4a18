//! # Terminal Error Type
//!
//! Unified error type for register commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in BarPOS                                 │
//! │                                                                         │
//! │  Operator                    Rust Backend                               │
//! │  ────────                    ────────────                               │
//! │                                                                         │
//! │  > finalize                                                             │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command Function                                                │  │
//! │  │  Result<T, TerminalError>                                        │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Database Error? ─── DbError::UniqueViolation ────┐             │  │
//! │  │         │                                         │             │  │
//! │  │         ▼                                         ▼             │  │
//! │  │  Rule Error? ──── CoreError::InsufficientPayment ─ TerminalError │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  ◄────────────────────────────────────────────────────────────────────  │
//! │                                                                         │
//! │  [INSUFFICIENT_PAYMENT] Insufficient payment: balance due 124.00        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No error ends the process; the console prints it and waits for the next
//! command.

use barpos_core::{CoreError, ValidationError};
use barpos_db::DbError;
use serde::Serialize;

/// Error returned from register commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "INSUFFICIENT_PAYMENT",
///   "message": "Insufficient payment: balance due 124.00"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("[{}] {}", .code.as_str(), .message)]
pub struct TerminalError {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes shown in front of every console error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Product, line, payment row or record missing
    NotFound,

    /// Operator input failed validation
    ValidationError,

    /// Finalization refused, balance above tolerance
    InsufficientPayment,

    /// Storage failed; the cart is kept for a retry
    PersistenceError,

    /// Cart or checkout used in the wrong state
    CartError,

    /// No cashier signed in, or the session expired
    SessionError,

    /// Anything else
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::InsufficientPayment => "INSUFFICIENT_PAYMENT",
            ErrorCode::PersistenceError => "PERSISTENCE_ERROR",
            ErrorCode::CartError => "CART_ERROR",
            ErrorCode::SessionError => "SESSION_ERROR",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

impl TerminalError {
    /// Creates a new terminal error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        TerminalError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        TerminalError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        TerminalError::new(ErrorCode::ValidationError, message)
    }

    /// Creates a cart error.
    pub fn cart(message: impl Into<String>) -> Self {
        TerminalError::new(ErrorCode::CartError, message)
    }

    /// Creates a session error.
    pub fn session(message: impl Into<String>) -> Self {
        TerminalError::new(ErrorCode::SessionError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        TerminalError::new(ErrorCode::Internal, message)
    }
}

/// Converts database errors to terminal errors.
impl From<DbError> for TerminalError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => TerminalError::not_found(&entity, &id),
            DbError::Invalid(e) => TerminalError::validation(e.to_string()),
            DbError::UniqueViolation { field, .. } => {
                tracing::error!(%field, "Unique constraint failed");
                TerminalError::new(
                    ErrorCode::PersistenceError,
                    format!("Duplicate record ({}), please retry", field),
                )
            }
            DbError::Decode { column, reason } => {
                tracing::error!(%column, %reason, "Stored value could not be decoded");
                TerminalError::new(
                    ErrorCode::PersistenceError,
                    format!("Corrupt value in {}", column),
                )
            }
            other => {
                tracing::error!(error = %other, "Database operation failed");
                TerminalError::new(ErrorCode::PersistenceError, other.to_string())
            }
        }
    }
}

/// Converts core errors to terminal errors.
impl From<CoreError> for TerminalError {
    fn from(err: CoreError) -> Self {
        match &err {
            CoreError::LineNotFound(_) | CoreError::PaymentRowNotFound(_) => {
                TerminalError::new(ErrorCode::NotFound, err.to_string())
            }
            CoreError::InsufficientPayment { .. } => {
                TerminalError::new(ErrorCode::InsufficientPayment, err.to_string())
            }
            CoreError::InvalidCheckoutState(_) => TerminalError::cart(err.to_string()),
            CoreError::Validation(e) => TerminalError::validation(e.to_string()),
        }
    }
}

impl From<ValidationError> for TerminalError {
    fn from(err: ValidationError) -> Self {
        TerminalError::validation(err.to_string())
    }
}

/// Result type for register commands.
pub type TerminalResult<T> = Result<T, TerminalError>;

#[cfg(test)]
mod tests {
    use super::*;
    use barpos_core::Money;

    #[test]
    fn test_insufficient_payment_code() {
        let err: TerminalError = CoreError::InsufficientPayment {
            balance_due: Money::from_major(124),
        }
        .into();
        assert_eq!(err.code, ErrorCode::InsufficientPayment);
        assert_eq!(
            err.to_string(),
            "[INSUFFICIENT_PAYMENT] Insufficient payment: balance due 124.00"
        );
    }

    #[test]
    fn test_db_errors_become_persistence_errors() {
        let err: TerminalError = DbError::duplicate("sales.id").into();
        assert_eq!(err.code, ErrorCode::PersistenceError);

        let err: TerminalError = DbError::not_found("Product", "lager").into();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "Product not found: lager");
    }

    #[test]
    fn test_validation_flows_through() {
        let err: TerminalError = CoreError::Validation(ValidationError::Empty {
            field: "cart".to_string(),
        })
        .into();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[test]
    fn test_serializes_code_screaming() {
        let json = serde_json::to_string(&TerminalError::session("Not signed in")).unwrap();
        assert_eq!(json, r#"{"code":"SESSION_ERROR","message":"Not signed in"}"#);
    }
}
