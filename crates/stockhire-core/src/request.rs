//! # Rental Requests
//!
//! Strictly typed inputs for creating and returning rentals.
//!
//! Both requests reject fields they do not declare, so a body such as
//! `{"rental_id": "...", "discount": 100}` fails with
//! [`ValidationError::UnknownField`] instead of being silently accepted.
//!
//! ## Flow
//! ```text
//! JSON body ──► from_json() ──► CreateRentalRequest ──► validate() ──► RentalOrder
//!                  │                                        │
//!                  └── UnknownField / Required              └── Required / MustBePositive /
//!                                                               Negative / InvalidFormat
//! ```

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::validation::{
    normalize_optional, normalize_phone, parse_deadline, validate_name, validate_non_negative,
    validate_required, ValidationResult,
};
use crate::MAX_RENTAL_LINES;

/// Longest note accepted on return.
const MAX_NOTE_LEN: usize = 1000;

// =============================================================================
// Create
// =============================================================================

/// Request to rent one or more stock items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateRentalRequest {
    pub customer_id: String,
    /// Calendar date, `YYYY-MM-DD` or an RFC 3339 timestamp.
    pub deadline_date: String,
    #[serde(default)]
    pub paid_amount: i64,
    pub items: Vec<RentalLineRequest>,
    /// Actor processing the rental.
    pub processed_by: String,
}

/// One requested line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RentalLineRequest {
    pub stock_id: String,
    pub qty: i64,
}

/// A create request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RentalOrder {
    pub customer_id: String,
    pub deadline_date: NaiveDate,
    pub paid_amount: i64,
    /// Lines in request order, ids trimmed.
    pub lines: Vec<RentalLineRequest>,
    pub processed_by: String,
}

impl CreateRentalRequest {
    /// Parses a JSON body.
    pub fn from_json(body: &str) -> ValidationResult<Self> {
        parse_json(body)
    }

    /// Validates every field before anything touches the store.
    pub fn validate(&self) -> ValidationResult<RentalOrder> {
        let customer_id = validate_required("customer_id", &self.customer_id)?;
        let processed_by = validate_required("processed_by", &self.processed_by)?;
        let deadline_date = parse_deadline(&self.deadline_date)?;
        validate_non_negative("paid_amount", self.paid_amount)?;

        if self.items.is_empty() {
            return Err(ValidationError::Required {
                field: "items".to_string(),
            });
        }

        if self.items.len() > MAX_RENTAL_LINES {
            return Err(ValidationError::OutOfRange {
                field: "items".to_string(),
                min: 1,
                max: MAX_RENTAL_LINES as i64,
            });
        }

        let mut lines = Vec::with_capacity(self.items.len());
        for (idx, line) in self.items.iter().enumerate() {
            let stock_id = validate_required(&format!("items[{}].stock_id", idx), &line.stock_id)?;
            if line.qty < 1 {
                return Err(ValidationError::MustBePositive {
                    field: format!("items[{}].qty", idx),
                });
            }
            lines.push(RentalLineRequest {
                stock_id,
                qty: line.qty,
            });
        }

        Ok(RentalOrder {
            customer_id,
            deadline_date,
            paid_amount: self.paid_amount,
            lines,
            processed_by,
        })
    }
}

impl RentalOrder {
    /// Distinct stock ids in first-seen order.
    pub fn stock_ids(&self) -> Vec<String> {
        self.requested_by_stock()
            .into_iter()
            .map(|(id, _)| id)
            .collect()
    }

    /// Total quantity per stock item, summing repeated lines.
    ///
    /// Availability has to be checked against the sum, otherwise two lines
    /// of 6 on an item with 10 units would each pass on their own.
    pub fn requested_by_stock(&self) -> Vec<(String, i64)> {
        let mut totals: Vec<(String, i64)> = Vec::new();
        for line in &self.lines {
            match totals.iter_mut().find(|(id, _)| *id == line.stock_id) {
                Some((_, qty)) => *qty = qty.saturating_add(line.qty),
                None => totals.push((line.stock_id.clone(), line.qty)),
            }
        }
        totals
    }
}

// =============================================================================
// Return
// =============================================================================

/// Request to return a rental in full.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReturnRentalRequest {
    pub rental_id: String,
    #[serde(default)]
    pub paid_on_return: Option<i64>,
    #[serde(default)]
    pub note: Option<String>,
}

/// A return request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnOrder {
    pub rental_id: String,
    pub paid_on_return: i64,
    pub note: Option<String>,
}

impl ReturnRentalRequest {
    /// Parses a JSON body.
    pub fn from_json(body: &str) -> ValidationResult<Self> {
        parse_json(body)
    }

    /// Validates the request; `paid_on_return` defaults to 0.
    pub fn validate(&self) -> ValidationResult<ReturnOrder> {
        let rental_id = validate_required("rental_id", &self.rental_id)?;
        let paid_on_return = self.paid_on_return.unwrap_or(0);
        validate_non_negative("paid_on_return", paid_on_return)?;

        let note = normalize_optional(self.note.as_deref());
        if note
            .as_ref()
            .is_some_and(|n| n.chars().count() > MAX_NOTE_LEN)
        {
            return Err(ValidationError::TooLong {
                field: "note".to_string(),
                max: MAX_NOTE_LEN,
            });
        }

        Ok(ReturnOrder {
            rental_id,
            paid_on_return,
            note,
        })
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// Registration input for the customer directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewCustomer {
    pub name: String,
    /// Free-form phone number; normalized on validation.
    pub phone: String,
    #[serde(default)]
    pub national_id: Option<String>,
}

impl NewCustomer {
    /// Parses a JSON body.
    pub fn from_json(body: &str) -> ValidationResult<Self> {
        parse_json(body)
    }

    /// Returns a copy with a trimmed name, canonical phone and trimmed id.
    pub fn validate(&self, default_country_code: &str) -> ValidationResult<NewCustomer> {
        Ok(NewCustomer {
            name: validate_name("name", &self.name)?,
            phone: normalize_phone(&self.phone, default_country_code)?,
            national_id: normalize_optional(self.national_id.as_deref()),
        })
    }
}

/// Input for adding an item to the stock ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewStockItem {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    pub quantity: i64,
    pub daily_late_fee: i64,
    #[serde(default)]
    pub reorder_threshold: Option<i64>,
}

impl NewStockItem {
    /// Parses a JSON body.
    pub fn from_json(body: &str) -> ValidationResult<Self> {
        parse_json(body)
    }

    /// Returns a trimmed copy; counts and fees must not be negative.
    pub fn validate(&self) -> ValidationResult<NewStockItem> {
        validate_non_negative("quantity", self.quantity)?;
        validate_non_negative("daily_late_fee", self.daily_late_fee)?;
        if let Some(threshold) = self.reorder_threshold {
            validate_non_negative("reorder_threshold", threshold)?;
        }

        Ok(NewStockItem {
            name: validate_name("name", &self.name)?,
            color: normalize_optional(self.color.as_deref()),
            size: normalize_optional(self.size.as_deref()),
            quantity: self.quantity,
            daily_late_fee: self.daily_late_fee,
            reorder_threshold: self.reorder_threshold,
        })
    }
}

// =============================================================================
// JSON Parsing
// =============================================================================

fn parse_json<T: DeserializeOwned>(body: &str) -> ValidationResult<T> {
    serde_json::from_str(body).map_err(|err| json_error(&err))
}

/// Maps serde_json's messages onto field-level errors.
fn json_error(err: &serde_json::Error) -> ValidationError {
    let msg = err.to_string();
    let quoted = |prefix: &str| {
        msg.strip_prefix(prefix)
            .and_then(|rest| rest.split('`').next())
            .map(str::to_string)
    };

    if let Some(field) = quoted("unknown field `") {
        return ValidationError::UnknownField { field };
    }
    if let Some(field) = quoted("missing field `") {
        return ValidationError::Required { field };
    }

    ValidationError::InvalidFormat {
        field: "body".to_string(),
        reason: msg,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateRentalRequest {
        CreateRentalRequest {
            customer_id: "c-1".to_string(),
            deadline_date: "2024-01-10".to_string(),
            paid_amount: 1000,
            items: vec![
                RentalLineRequest {
                    stock_id: "s-1".to_string(),
                    qty: 2,
                },
                RentalLineRequest {
                    stock_id: "s-2".to_string(),
                    qty: 1,
                },
            ],
            processed_by: "clerk-1".to_string(),
        }
    }

    #[test]
    fn test_validate_ok() {
        let order = request().validate().unwrap();
        assert_eq!(
            order.deadline_date,
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
        );
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.stock_ids(), vec!["s-1", "s-2"]);
    }

    #[test]
    fn test_validate_rejects_bad_lines() {
        let mut req = request();
        req.items[1].qty = 0;
        let err = req.validate().unwrap_err();
        assert_eq!(err.field(), "items[1].qty");

        let mut req = request();
        req.items.clear();
        assert_eq!(req.validate().unwrap_err().field(), "items");

        let mut req = request();
        req.items[0].stock_id = "  ".to_string();
        assert_eq!(req.validate().unwrap_err().field(), "items[0].stock_id");
    }

    #[test]
    fn test_validate_rejects_bad_header_fields() {
        let mut req = request();
        req.deadline_date = "2024-13-01".to_string();
        assert_eq!(req.validate().unwrap_err().field(), "deadline_date");

        let mut req = request();
        req.paid_amount = -5;
        assert_eq!(req.validate().unwrap_err().field(), "paid_amount");

        let mut req = request();
        req.processed_by = String::new();
        assert_eq!(req.validate().unwrap_err().field(), "processed_by");
    }

    #[test]
    fn test_requested_by_stock_sums_duplicates() {
        let mut req = request();
        req.items.push(RentalLineRequest {
            stock_id: "s-1".to_string(),
            qty: 4,
        });
        let order = req.validate().unwrap();
        assert_eq!(
            order.requested_by_stock(),
            vec![("s-1".to_string(), 6), ("s-2".to_string(), 1)]
        );
        assert_eq!(order.lines.len(), 3);
    }

    #[test]
    fn test_from_json_rejects_unknown_fields() {
        let body = r#"{
            "customer_id": "c-1",
            "deadline_date": "2024-01-10",
            "items": [{"stock_id": "s-1", "qty": 1}],
            "processed_by": "clerk-1",
            "discount": 100
        }"#;
        assert_eq!(
            CreateRentalRequest::from_json(body).unwrap_err(),
            ValidationError::UnknownField {
                field: "discount".to_string()
            }
        );

        let body = r#"{"rental_id": "r-1", "refund": true}"#;
        assert!(matches!(
            ReturnRentalRequest::from_json(body),
            Err(ValidationError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_from_json_missing_and_malformed() {
        let body = r#"{"customer_id": "c-1"}"#;
        assert!(matches!(
            CreateRentalRequest::from_json(body),
            Err(ValidationError::Required { .. })
        ));

        assert!(matches!(
            ReturnRentalRequest::from_json("not json"),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_new_customer_normalizes() {
        let raw = NewCustomer {
            name: "  Ada Lovelace ".to_string(),
            phone: "0555 010 101".to_string(),
            national_id: Some("   ".to_string()),
        };
        let clean = raw.validate("44").unwrap();
        assert_eq!(clean.name, "Ada Lovelace");
        assert_eq!(clean.phone, "+44555010101");
        assert_eq!(clean.national_id, None);

        let bad = NewCustomer {
            phone: "call me".to_string(),
            ..raw
        };
        assert_eq!(bad.validate("44").unwrap_err().field(), "phone");
    }

    #[test]
    fn test_new_stock_item_rules() {
        let body = r#"{"name": "Tent", "color": " green ", "quantity": 4, "daily_late_fee": 500}"#;
        let item = NewStockItem::from_json(body).unwrap().validate().unwrap();
        assert_eq!(item.color.as_deref(), Some("green"));
        assert_eq!(item.size, None);

        let negative = NewStockItem {
            daily_late_fee: -1,
            ..item.clone()
        };
        assert_eq!(negative.validate().unwrap_err().field(), "daily_late_fee");

        let threshold = NewStockItem {
            reorder_threshold: Some(-2),
            ..item
        };
        assert_eq!(threshold.validate().unwrap_err().field(), "reorder_threshold");
    }

    #[test]
    fn test_return_defaults() {
        let req = ReturnRentalRequest::from_json(r#"{"rental_id": "r-1"}"#).unwrap();
        let order = req.validate().unwrap();
        assert_eq!(order.paid_on_return, 0);
        assert_eq!(order.note, None);

        let req = ReturnRentalRequest {
            rental_id: "r-1".to_string(),
            paid_on_return: Some(-1),
            note: None,
        };
        assert_eq!(req.validate().unwrap_err().field(), "paid_on_return");
    }
}
