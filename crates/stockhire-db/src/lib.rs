//! # stockhire-db: Database Layer for StockHire
//!
//! This crate provides database access for StockHire.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        StockHire Data Flow                              │
//! │                                                                         │
//! │  RentalEngine::create_rental                                           │
//! │       │  db.begin()                                                     │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   stockhire-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────────┐  ┌────────────┐  │   │
//! │  │   │   Database    │    │   Repositories     │  │ Migrations │  │   │
//! │  │   │   (pool.rs)   │    │                    │  │ (embedded) │  │   │
//! │  │   │               │    │ CustomerDirectory  │  │            │  │   │
//! │  │   │ SqlitePool    │◄───│ StockLedger        │  │ 001_init   │  │   │
//! │  │   │ Transactions  │    │ RentalStore        │  │            │  │   │
//! │  │   └───────────────┘    └────────────────────┘  └────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Customer directory, stock ledger, rental store
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockhire_db::{Database, DbConfig, StockLedger};
//!
//! let db = Database::new(DbConfig::new("stockhire.db")).await?;
//!
//! let mut tx = db.begin().await?;
//! let outcome = StockLedger::reserve(&mut *tx, "stock-id", 2, Utc::now()).await?;
//! tx.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::customer::CustomerDirectory;
pub use repository::generate_id;
pub use repository::rental::{RentalFilter, RentalStore};
pub use repository::stock::{Reservation, StockLedger, StockLookup};
