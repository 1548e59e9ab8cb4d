//! # Repository Module
//!
//! Database repository implementations for StockHire.
//!
//! ## Two Kinds of Methods
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Pool methods (&self)                 Connection functions (conn)       │
//! │  ─────────────────────                ──────────────────────────        │
//! │  db.stock().low_stock()               StockLedger::reserve(&mut *tx,..) │
//! │  db.rentals().get(id)                 RentalStore::create(&mut *tx,..)  │
//! │                                                                         │
//! │  Each call grabs its own pooled       Run inside the caller's           │
//! │  connection and commits on its own.   transaction; nothing is visible  │
//! │                                       until the caller commits.         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CustomerDirectory`](customer::CustomerDirectory) - Customer lookup and registration
//! - [`StockLedger`](stock::StockLedger) - Stock quantities and reservations
//! - [`RentalStore`](rental::RentalStore) - Rentals, items and history records

pub mod customer;
pub mod rental;
pub mod stock;

use uuid::Uuid;

/// Generates a new entity ID.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
