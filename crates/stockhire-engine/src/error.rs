//! # Engine Errors
//!
//! What callers of the rental engine see.
//!
//! ## Error Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ValidationError ──► CoreError ──┐                                     │
//! │                                  ├──► EngineError ──► ErrorKind        │
//! │  sqlx::Error ──► DbError ────────┘         │                           │
//! │                    │                       │                           │
//! │                    └── Conflict ──► retried, then TransactionConflict  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use stockhire_core::{CoreError, ValidationError};
use stockhire_db::DbError;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors returned by [`RentalEngine`](crate::RentalEngine) and
/// [`Catalog`](crate::Catalog).
#[derive(Debug, Error)]
pub enum EngineError {
    /// A business rule rejected the request.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// SQLite kept reporting write conflicts until the retry budget ran out.
    #[error("Transaction conflict persisted after {attempts} attempts")]
    TransactionConflict { attempts: u32 },

    /// The store failed in a way the engine does not recover from.
    #[error("Database error: {0}")]
    Store(#[from] DbError),

    /// Configuration could not be loaded or is invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Coarse classification of an [`EngineError`] for callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    InsufficientStock,
    AlreadyReturned,
    TransactionConflict,
    Internal,
}

impl ErrorKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::InsufficientStock => "insufficient_stock",
            ErrorKind::AlreadyReturned => "already_returned",
            ErrorKind::TransactionConflict => "transaction_conflict",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EngineError {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Domain(err) => match err {
                CoreError::CustomerNotFound(_)
                | CoreError::StockNotFound { .. }
                | CoreError::RentalNotFound(_) => ErrorKind::NotFound,
                CoreError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
                CoreError::AlreadyReturned(_) => ErrorKind::AlreadyReturned,
                CoreError::FeeOverflow { .. } | CoreError::Validation(_) => {
                    ErrorKind::InvalidInput
                }
            },
            EngineError::TransactionConflict { .. } => ErrorKind::TransactionConflict,
            EngineError::Store(DbError::Conflict(_)) => ErrorKind::TransactionConflict,
            EngineError::Store(DbError::NotFound { .. }) => ErrorKind::NotFound,
            EngineError::Store(_) | EngineError::Config(_) => ErrorKind::Internal,
        }
    }

    /// Whether running the whole unit of work again may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Store(err) => err.is_retryable(),
            _ => false,
        }
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Domain(CoreError::Validation(err))
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err: EngineError = CoreError::StockNotFound {
            ids: vec!["s-9".to_string()],
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err: EngineError = ValidationError::Required {
            field: "items".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err: EngineError = CoreError::FeeOverflow {
            rental_id: "r-1".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        assert_eq!(
            EngineError::TransactionConflict { attempts: 4 }.kind(),
            ErrorKind::TransactionConflict
        );
        assert_eq!(
            EngineError::Store(DbError::QueryFailed("boom".into())).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_only_store_conflicts_retry() {
        assert!(EngineError::Store(DbError::Conflict("database is locked".into())).is_retryable());
        assert!(!EngineError::TransactionConflict { attempts: 4 }.is_retryable());
        assert!(!EngineError::Domain(CoreError::AlreadyReturned("r-1".into())).is_retryable());
    }

    #[test]
    fn test_display() {
        let err = EngineError::TransactionConflict { attempts: 4 };
        assert!(err.to_string().contains("4 attempts"));
        assert_eq!(ErrorKind::InsufficientStock.to_string(), "insufficient_stock");
    }
}
