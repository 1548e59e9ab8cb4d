//! # Validation Module
//!
//! Field validators and normalizers for StockHire.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Request parsing (serde, deny_unknown_fields)                 │
//! │  ├── Unknown fields rejected                                           │
//! │  └── Types enforced                                                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Deadline parsing, quantity and amount bounds                      │
//! │  └── Phone normalization                                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (quantity >= 0)                                             │
//! │  ├── UNIQUE (history.rental_id)                                        │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::ValidationError;
use crate::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates that a field is present, returning it trimmed.
///
/// ```rust
/// use stockhire_core::validation::validate_required;
///
/// assert_eq!(validate_required("customer_id", "  c-1 ").unwrap(), "c-1");
/// assert!(validate_required("customer_id", "   ").is_err());
/// ```
pub fn validate_required(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    Ok(value.to_string())
}

/// Validates a display name (customer or stock item).
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
pub fn validate_name(field: &str, name: &str) -> ValidationResult<String> {
    let name = validate_required(field, name)?;

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(name)
}

/// Trims an optional attribute, mapping blank strings to `None`.
pub fn normalize_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// =============================================================================
// Dates
// =============================================================================

/// Parses a deadline into a calendar date.
///
/// ## Accepted Forms
/// - `YYYY-MM-DD` (e.g. `2024-01-10`)
/// - RFC 3339 timestamp; the UTC calendar date is kept and the time of day
///   is dropped
///
/// ```rust
/// use chrono::NaiveDate;
/// use stockhire_core::validation::parse_deadline;
///
/// let d = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
/// assert_eq!(parse_deadline("2024-01-10").unwrap(), d);
/// assert_eq!(parse_deadline("2024-01-10T18:00:00Z").unwrap(), d);
/// assert!(parse_deadline("2024-02-30").is_err());
/// ```
pub fn parse_deadline(raw: &str) -> ValidationResult<NaiveDate> {
    let raw = validate_required("deadline_date", raw)?;

    if let Ok(date) = NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
        return Ok(date);
    }

    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc).date_naive())
        .map_err(|_| ValidationError::InvalidFormat {
            field: "deadline_date".to_string(),
            reason: format!("'{}' is not a valid calendar date", raw),
        })
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be at least 1
///
/// ```rust
/// use stockhire_core::validation::validate_quantity;
///
/// assert!(validate_quantity(1).is_ok());
/// assert!(validate_quantity(0).is_err());
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty < 1 {
        return Err(ValidationError::MustBePositive {
            field: "qty".to_string(),
        });
    }

    Ok(())
}

/// Validates a non-negative amount (payments, fee rates, stock levels).
pub fn validate_non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Phone Numbers
// =============================================================================

/// Normalizes a phone number into `+<digits>` form.
///
/// ## Rules
/// ```text
/// "+1 (555) 010-9999"   → "+15550109999"     explicit country code
/// "0044 20 7946 0958"   → "+442079460958"    international 00 prefix
/// "0612 345 678", "31"  → "+31612345678"     trunk 0 replaced by default CC
/// "5550109999", "1"     → "+15550109999"     national number, default CC
/// ```
/// Spaces, dashes, dots and parentheses are ignored. The result must have
/// 8 to 15 digits.
pub fn normalize_phone(raw: &str, default_country_code: &str) -> ValidationResult<String> {
    let raw = validate_required("phone", raw)?;
    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "phone".to_string(),
        reason: reason.to_string(),
    };

    let explicit = raw.starts_with('+');
    let body = if explicit { &raw[1..] } else { raw.as_str() };

    let mut digits = String::with_capacity(body.len());
    for c in body.chars() {
        match c {
            '0'..='9' => digits.push(c),
            ' ' | '-' | '.' | '(' | ')' => {}
            _ => return Err(invalid("must contain only digits and separators")),
        }
    }

    let country_code: String = default_country_code
        .trim()
        .trim_start_matches('+')
        .to_string();

    let canonical = if explicit {
        digits
    } else if let Some(rest) = digits.strip_prefix("00") {
        rest.to_string()
    } else if let Some(rest) = digits.strip_prefix('0') {
        format!("{}{}", country_code, rest)
    } else {
        format!("{}{}", country_code, digits)
    };

    if !(8..=15).contains(&canonical.len()) {
        return Err(invalid("must have between 8 and 15 digits"));
    }

    Ok(format!("+{}", canonical))
}

// =============================================================================
// Pagination
// =============================================================================

/// A normalized page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u32,
    pub limit: u32,
}

impl PageWindow {
    /// Clamps `limit` to `[1, MAX_PAGE_SIZE]` and floors `page` to 1.
    ///
    /// ```rust
    /// use stockhire_core::validation::PageWindow;
    ///
    /// let w = PageWindow::new(Some(0), Some(500));
    /// assert_eq!((w.page, w.limit), (1, 100));
    /// assert_eq!(w.offset(), 0);
    /// ```
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        PageWindow {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Rows to skip.
    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
