//! # Error Types
//!
//! Domain-specific error types for stockhire-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stockhire-core errors (this file)                                     │
//! │  ├── CoreError        - Rental rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  stockhire-db errors (separate crate)                                  │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  stockhire-engine errors                                               │
//! │  └── EngineError      - What callers see (with ErrorKind)              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError ← DbError             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant carries enough context (ids, quantities, field names) to
//! render a user-facing message without another lookup.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Rental rule violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The customer referenced by a rental request does not exist.
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// One or more requested stock items do not exist.
    ///
    /// All missing ids are reported, not only the first one.
    #[error("Stock items not found: {}", ids.join(", "))]
    StockNotFound { ids: Vec<String> },

    /// Rental cannot be found.
    #[error("Rental not found: {0}")]
    RentalNotFound(String),

    /// Requested quantity exceeds what is on the shelf.
    ///
    /// ## User Workflow
    /// ```text
    /// Rent 6 × "Tent 4P"
    ///      │
    ///      ▼
    /// Check stock: available=4
    ///      │
    ///      ▼
    /// InsufficientStock { name: "Tent 4P", available: 4, requested: 6 }
    ///      │
    ///      ▼
    /// Operator sees: "Only 4 Tent 4P in stock"
    /// ```
    #[error("Insufficient stock for {name} ({stock_id}): available {available}, requested {requested}")]
    InsufficientStock {
        stock_id: String,
        name: String,
        available: i64,
        requested: i64,
    },

    /// The rental has already been settled.
    #[error("Rental {0} has already been returned")]
    AlreadyReturned(String),

    /// Fee arithmetic left the representable range.
    #[error("Late fee for rental {rental_id} overflows")]
    FeeOverflow { rental_id: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any store access, so they never leave partial writes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

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
    Negative { field: String },

    /// Invalid format (e.g., invalid date, invalid phone number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Request carried a field that is not part of its schema.
    #[error("unknown field: {field}")]
    UnknownField { field: String },
}

impl ValidationError {
    /// Returns the name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::Negative { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::UnknownField { field } => field,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
