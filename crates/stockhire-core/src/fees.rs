//! # Late Fees
//!
//! Late-day counting and fee totals for returned rentals.
//!
//! ## Fee Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  late_days  = max(0, date(returned_on) − deadline_date)                 │
//! │  line fee   = late_days × daily_late_fee_snapshot × qty                 │
//! │  total_fees = Σ line fee                                                │
//! │                                                                         │
//! │  deadline 2024-01-10, returned 2024-01-13 09:30 → late_days = 3         │
//! │  qty 2 × snapshot 500 × 3 days                  → 3000                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Days are whole calendar days in UTC; time of day is ignored. There is no
//! grace period and no minimum charge, and the rate is always the snapshot
//! taken when the rental was created.

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::RentalItem;

/// Whole calendar days between the deadline and the return date.
///
/// Never negative: returning early or on the deadline day costs nothing.
pub fn late_days(deadline: NaiveDate, returned_on: DateTime<Utc>) -> i64 {
    (returned_on.date_naive() - deadline).num_days().max(0)
}

/// Fee for a single line.
///
/// Returns `None` if the product does not fit in an `i64`.
pub fn line_fee(late_days: i64, daily_late_fee_snapshot: i64, qty: i64) -> Option<Money> {
    Money::from_minor(daily_late_fee_snapshot)
        .checked_mul(late_days)?
        .checked_mul(qty)
}

/// Fees for a whole rental, line by line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeAssessment {
    pub late_days: i64,
    /// One entry per rental item, in item order.
    pub line_fees: Vec<Money>,
    pub total: Money,
}

/// Computes the fees owed for `items` returned at `returned_on`.
///
/// `rental_id` only labels the overflow error.
pub fn assess(
    rental_id: &str,
    deadline: NaiveDate,
    returned_on: DateTime<Utc>,
    items: &[RentalItem],
) -> CoreResult<FeeAssessment> {
    let days = late_days(deadline, returned_on);
    let overflow = || CoreError::FeeOverflow {
        rental_id: rental_id.to_string(),
    };

    let mut line_fees = Vec::with_capacity(items.len());
    let mut total = Money::zero();

    for item in items {
        let fee = line_fee(days, item.daily_late_fee_snapshot, item.qty).ok_or_else(overflow)?;
        total = total.checked_add(fee).ok_or_else(overflow)?;
        line_fees.push(fee);
    }

    Ok(FeeAssessment {
        late_days: days,
        line_fees,
        total,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
