//! # Domain Types
//!
//! Core domain types used throughout StockHire.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Customer     │   │     Rental      │   │   StockItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │◄──│  customer_id    │   │  id             │       │
//! │  │  name           │   │  deadline_date  │   │  quantity       │       │
//! │  │  phone (E.164)  │   │  status         │   │  daily_late_fee │       │
//! │  └─────────────────┘   │  items ─────────┼──►│  version        │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! │                                 │                                       │
//! │                                 │ on return (write once)                │
//! │                                 ▼                                       │
//! │                        ┌─────────────────┐                              │
//! │                        │  HistoryRental  │  denormalized snapshots     │
//! │                        │  late_days      │  of customer + items        │
//! │                        │  total_fees     │                              │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! `RentalItem::daily_late_fee_snapshot` freezes the fee rate at creation,
//! and `HistoryRental` freezes customer and stock attributes at return.
//! Later edits to the source records never reach either copy.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Customer
// =============================================================================

/// A customer who can borrow stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: String,

    /// Display name.
    pub name: String,

    /// Canonical phone number, `+` followed by 8 to 15 digits.
    pub phone: String,

    /// Optional national identifier.
    pub national_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Stock Item
// =============================================================================

/// A physical item kept in the stock ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockItem {
    pub id: String,

    pub name: String,
    pub color: Option<String>,
    pub size: Option<String>,

    /// Units currently on the shelf. Never negative.
    pub quantity: i64,

    /// Late fee per unit per day, in minor units.
    pub daily_late_fee: i64,

    /// Quantity at or below which the item counts as low stock.
    pub reorder_threshold: Option<i64>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Incremented on every mutation of the row.
    pub version: i64,
}

impl StockItem {
    /// Returns the daily late fee as Money.
    #[inline]
    pub fn late_fee(&self) -> Money {
        Money::from_minor(self.daily_late_fee)
    }

    /// Checks whether `qty` units can be reserved right now.
    #[inline]
    pub fn can_reserve(&self, qty: i64) -> bool {
        self.quantity >= qty
    }

    /// Checks whether the item is at or below its reorder threshold.
    pub fn is_low(&self) -> bool {
        self.reorder_threshold
            .is_some_and(|threshold| self.quantity <= threshold)
    }
}

// =============================================================================
// Rental Status
// =============================================================================

/// The status of a rental.
///
/// A rental moves `Rented → Returned` exactly once and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum RentalStatus {
    /// Items are out with the customer.
    #[default]
    Rented,
    /// Items are back and the rental is settled.
    Returned,
}

impl RentalStatus {
    /// Returns the stored representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            RentalStatus::Rented => "rented",
            RentalStatus::Returned => "returned",
        }
    }
}

impl fmt::Display for RentalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RentalStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rented" => Ok(RentalStatus::Rented),
            "returned" => Ok(RentalStatus::Returned),
            other => Err(ValidationError::InvalidFormat {
                field: "status".to_string(),
                reason: format!("expected 'rented' or 'returned', got '{}'", other),
            }),
        }
    }
}

// =============================================================================
// Rental
// =============================================================================

/// A line of a rental: one stock item and the quantity reserved for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct RentalItem {
    pub id: String,
    pub rental_id: String,
    pub stock_id: String,
    /// Position of the line in the original request.
    pub position: i64,
    pub qty: i64,
    /// Fee rate captured when the rental was created (frozen).
    pub daily_late_fee_snapshot: i64,
}

/// A rental aggregate with its ordered line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rental {
    pub id: String,
    pub customer_id: String,
    pub deadline_date: NaiveDate,
    /// Accumulated payments. Never decreases.
    pub paid_amount: i64,
    pub status: RentalStatus,
    /// Actor that processed the rental.
    pub processed_by: String,
    pub rented_on: DateTime<Utc>,
    pub returned_on: Option<DateTime<Utc>>,
    pub items: Vec<RentalItem>,
}

impl Rental {
    /// Checks if items are still out.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == RentalStatus::Rented
    }

    /// Checks if the rental is open and past its deadline on `today`.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.is_open() && self.deadline_date < today
    }

    /// Total units reserved across all lines.
    pub fn total_qty(&self) -> i64 {
        self.items.iter().map(|item| item.qty).sum()
    }

    /// Returns accumulated payments as Money.
    #[inline]
    pub fn paid(&self) -> Money {
        Money::from_minor(self.paid_amount)
    }
}

/// Input for persisting a new rental. Ids are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RentalDraft {
    pub customer_id: String,
    pub deadline_date: NaiveDate,
    pub paid_amount: i64,
    pub processed_by: String,
    pub rented_on: DateTime<Utc>,
    pub items: Vec<RentalDraftItem>,
}

/// One line of a [`RentalDraft`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RentalDraftItem {
    pub stock_id: String,
    pub qty: i64,
    pub daily_late_fee_snapshot: i64,
}

/// Guarded state change of a rental.
///
/// The store only applies the patch if the row is still in
/// `expected_status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RentalPatch {
    pub expected_status: RentalStatus,
    pub status: RentalStatus,
    pub returned_on: Option<DateTime<Utc>>,
    pub paid_amount: i64,
}

// =============================================================================
// History
// =============================================================================

/// Customer attributes frozen into a history record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub national_id: Option<String>,
}

impl From<&Customer> for CustomerSnapshot {
    fn from(customer: &Customer) -> Self {
        CustomerSnapshot {
            id: customer.id.clone(),
            name: customer.name.clone(),
            phone: customer.phone.clone(),
            national_id: customer.national_id.clone(),
        }
    }
}

/// A returned line with the stock attributes it had at return time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItemSnapshot {
    pub stock_id: String,
    pub name: String,
    pub color: Option<String>,
    pub size: Option<String>,
    pub qty: i64,
    pub daily_late_fee_snapshot: i64,
    /// Late fee charged for this line.
    pub fee: i64,
}

/// The write-once audit record of a returned rental.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRental {
    pub id: String,
    pub rental_id: String,
    pub customer: CustomerSnapshot,
    pub items: Vec<HistoryItemSnapshot>,
    pub deadline_date: NaiveDate,
    pub rented_on: DateTime<Utc>,
    pub returned_on: DateTime<Utc>,
    pub late_days: i64,
    pub total_fees: i64,
    pub paid_amount: i64,
    pub processed_by: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Settlement
// =============================================================================

/// Result of returning a rental.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub rental_id: String,
    pub late_days: i64,
    pub total_fees: i64,
    /// Accumulated payments after the return.
    pub paid_amount: i64,
    /// Fees not yet covered by payments, never negative.
    pub balance_due: i64,
}

// =============================================================================
// Listing
// =============================================================================

/// Filters for listing rentals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RentalQuery {
    pub status: Option<RentalStatus>,
    /// Only open rentals whose deadline is before today.
    #[serde(default)]
    pub overdue: bool,
    pub customer_id: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// One page of rentals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalPage {
    pub items: Vec<Rental>,
    /// Total matching rentals across all pages.
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

// =============================================================================
// Unit Tests
// =============================================================================
