//! # Store Errors
//!
//! Every repository and the [`crate::PersistenceGateway`] impl return
//! [`DbError`]. The terminal turns all of them into a `PERSISTENCE_ERROR`,
//! except `NotFound` and `Invalid` which keep their own codes.
//!
//! ```text
//! sqlx::Error::RowNotFound                 → NotFound
//! "UNIQUE constraint failed: sales.id"     → UniqueViolation { field: "sales.id" }
//! "database is locked" / pool timeout      → Busy
//! other database message                   → QueryFailed
//! MigrateError                             → MigrationFailed
//! ```

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// Unknown product id, missing settings row, empty lookup.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Two sales stamped in the same second on different registers, or a
    /// product id inserted twice.
    #[error("Duplicate {field}")]
    UniqueViolation { field: String },

    /// Another register held the write lock past `busy_timeout`.
    #[error("Store is busy, try again")]
    Busy,

    #[error("Cannot open store: {0}")]
    ConnectionFailed(String),

    #[error("Schema migration failed: {0}")]
    MigrationFailed(String),

    /// CHECK constraints and any other SQL failure.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A stored value no longer parses as its domain type.
    #[error("Cannot decode {column}: {reason}")]
    Decode { column: String, reason: String },

    /// Rejected by a business rule before any SQL ran.
    #[error("Invalid input: {0}")]
    Invalid(#[from] barpos_core::ValidationError),

    /// Commit or rollback itself failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Internal store error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
        }
    }

    pub fn decode(column: impl Into<String>, reason: impl ToString) -> Self {
        DbError::Decode {
            column: column.into(),
            reason: reason.to_string(),
        }
    }
}

const UNIQUE_PREFIX: &str = "UNIQUE constraint failed: ";

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                if let Some(field) = msg.strip_prefix(UNIQUE_PREFIX) {
                    DbError::duplicate(field)
                } else if msg.contains("database is locked") || msg.contains("database is busy") {
                    DbError::Busy
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }
            sqlx::Error::PoolTimedOut => DbError::Busy,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("store is closed".to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[test]
    fn test_pool_timeout_is_busy() {
        let err: DbError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, DbError::Busy));
        assert_eq!(err.to_string(), "Store is busy, try again");
    }

    #[test]
    fn test_decode_message() {
        let err = DbError::decode("sales.total", "'abc' is not a number");
        assert_eq!(err.to_string(), "Cannot decode sales.total: 'abc' is not a number");
    }

    #[test]
    fn test_validation_error_converts() {
        let err: DbError = barpos_core::ValidationError::MustBePositive {
            field: "bottle quantity".to_string(),
        }
        .into();
        assert!(matches!(err, DbError::Invalid(_)));
    }
}
