//! # CLI Error Output
//!
//! Failed commands print one JSON object to stderr:
//! ```json
//! {
//!   "code": "insufficient_stock",
//!   "message": "Insufficient stock for Dome Tent (s-1): available 2, requested 3"
//! }
//! ```
//! `code` is the engine's [`ErrorKind`]; scripts branch on it, people read
//! `message`.

use serde::Serialize;
use std::fmt;

use stockhire_core::ValidationError;
use stockhire_engine::{EngineError, ErrorKind};

/// Error printed by the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct CliError {
    /// Machine-readable error code
    pub code: ErrorKind,

    /// Human-readable error message
    pub message: String,
}

impl CliError {
    pub fn new(code: ErrorKind, message: impl Into<String>) -> Self {
        CliError {
            code,
            message: message.into(),
        }
    }

    /// Bad command line usage.
    pub fn usage(message: impl Into<String>) -> Self {
        CliError::new(ErrorKind::InvalidInput, message)
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self.code {
            ErrorKind::InvalidInput => 2,
            ErrorKind::Internal => 70,
            _ => 1,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| self.message.clone())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for CliError {}

impl From<EngineError> for CliError {
    fn from(err: EngineError) -> Self {
        CliError::new(err.kind(), err.to_string())
    }
}

impl From<ValidationError> for CliError {
    fn from(err: ValidationError) -> Self {
        CliError::new(ErrorKind::InvalidInput, err.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::new(ErrorKind::Internal, err.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::new(ErrorKind::Internal, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockhire_core::CoreError;

    #[test]
    fn test_engine_error_keeps_kind() {
        let err: CliError = EngineError::from(CoreError::AlreadyReturned("r-1".into())).into();
        assert_eq!(err.code, ErrorKind::AlreadyReturned);
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_json().contains("\"already_returned\""));
    }

    #[test]
    fn test_usage_is_invalid_input() {
        let err = CliError::usage("missing <RENTAL_ID>");
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.to_string(), "invalid_input: missing <RENTAL_ID>");
    }
}
