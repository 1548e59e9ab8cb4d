//! # stockhire-engine
//!
//! Rental lifecycle for StockHire: rent items out, take them back, settle
//! late fees, and keep an append-only history of closed rentals.
//!
//! ## Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          stockhire-engine                               │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐  ┌────────────┐  │
//! │  │ RentalEngine │  │   Catalog    │  │ EngineConfig │  │   Clock    │  │
//! │  │ create/return│  │ customers +  │  │ TOML + env   │  │ System /   │  │
//! │  │ list/history │  │ stock admin  │  │ overrides    │  │ Fixed      │  │
//! │  └──────┬───────┘  └──────┬───────┘  └──────────────┘  └────────────┘  │
//! │         └────────┬────────┘                                             │
//! │                  ▼                                                      │
//! │          stockhire-db (sqlx / SQLite)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use stockhire_engine::{EngineConfig, RentalEngine};
//! use stockhire_core::CreateRentalRequest;
//!
//! let engine = RentalEngine::open(EngineConfig::load(None)?).await?;
//! let rental = engine
//!     .create_rental(&CreateRentalRequest::from_json(body)?)
//!     .await?;
//! ```

pub mod catalog;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;

pub use catalog::Catalog;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngineConfig;
pub use engine::RentalEngine;
pub use error::{EngineError, EngineResult, ErrorKind};
