//! # stockhire-core: Pure Business Logic for StockHire
//!
//! This crate holds the rental rules as pure functions with zero I/O
//! dependencies: what a rental looks like, how a request is validated, and
//! how late fees are computed on return.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        StockHire Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 stockhire-engine (RentalEngine)                 │   │
//! │  │     create_rental, return_rental, list_rentals, get_rental      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ stockhire-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   fees    │  │  request  │  │ validation│  │   │
//! │  │   │  Rental   │  │ late days │  │  Create   │  │  phone    │  │   │
//! │  │   │ StockItem │  │ totals    │  │  Return   │  │  deadline │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 stockhire-db (Database Layer)                   │   │
//! │  │        Stock ledger, customer directory, rental store           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Customer, StockItem, Rental, HistoryRental, ...)
//! - [`request`] - Strictly typed create/return requests
//! - [`fees`] - Late-day and late-fee arithmetic
//! - [`money`] - Integer money type
//! - [`validation`] - Field validators and normalizers
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::{NaiveDate, TimeZone, Utc};
//! use stockhire_core::fees::late_days;
//!
//! let deadline = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
//! let returned = Utc.with_ymd_and_hms(2024, 1, 13, 9, 30, 0).unwrap();
//!
//! assert_eq!(late_days(deadline, returned), 3);
//! ```

pub mod error;
pub mod fees;
pub mod money;
pub mod request;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use request::{
    CreateRentalRequest, NewCustomer, NewStockItem, RentalLineRequest, RentalOrder, ReturnOrder,
    ReturnRentalRequest,
};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of lines in a single rental request.
///
/// Keeps the batch stock lookup bounded; SQLite caps bound parameters per
/// statement.
pub const MAX_RENTAL_LINES: usize = 100;

/// Page size used when a listing does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Upper bound for `limit` in rental listings.
pub const MAX_PAGE_SIZE: u32 = 100;
