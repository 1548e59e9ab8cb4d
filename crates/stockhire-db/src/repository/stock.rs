//! # Stock Ledger
//!
//! Per-item quantities and late-fee rates.
//!
//! ## Conditional Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    How a Reservation Works                              │
//! │                                                                         │
//! │  ❌ WRONG: read, check in Rust, write back                             │
//! │     SELECT quantity → 5;  5 >= 3 ✓;  UPDATE SET quantity = 2           │
//! │     (a concurrent writer between SELECT and UPDATE is lost)            │
//! │                                                                         │
//! │  ✅ CORRECT: check and decrement in one statement                      │
//! │     UPDATE stock_items SET quantity = quantity - 3                     │
//! │     WHERE id = ? AND quantity >= 3                                     │
//! │                                                                         │
//! │  rows_affected = 1 → Reserved                                          │
//! │  rows_affected = 0 → re-read: row gone → Missing                       │
//! │                               row there → Insufficient { available }   │
//! │                                                                         │
//! │  CHECK (quantity >= 0) in the schema backs this up.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use stockhire_core::StockItem;

const STOCK_COLUMNS: &str = "id, name, color, size, quantity, daily_late_fee, \
     reorder_threshold, created_at, updated_at, version";

/// Outcome of a batch lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockLookup {
    /// Items that exist, in no particular order.
    pub found: Vec<StockItem>,
    /// Requested ids with no matching row, in request order.
    pub missing: Vec<String>,
}

impl StockLookup {
    /// Finds a resolved item by id.
    pub fn get(&self, id: &str) -> Option<&StockItem> {
        self.found.iter().find(|item| item.id == id)
    }
}

/// Outcome of a conditional decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    Reserved,
    Insufficient { available: i64 },
    Missing,
}

/// Repository for stock items.
#[derive(Debug, Clone)]
pub struct StockLedger {
    pool: SqlitePool,
}

impl StockLedger {
    /// Creates a new StockLedger.
    pub fn new(pool: SqlitePool) -> Self {
        StockLedger { pool }
    }

    // =========================================================================
    // Transaction-scoped
    // =========================================================================

    /// Resolves many stock ids in a single round trip.
    ///
    /// Duplicate ids are looked up once.
    pub async fn batch_resolve(
        conn: &mut SqliteConnection,
        ids: &[String],
    ) -> DbResult<StockLookup> {
        if ids.is_empty() {
            return Ok(StockLookup::default());
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM stock_items WHERE id IN (",
            STOCK_COLUMNS
        ));
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(id.clone());
        }
        separated.push_unseparated(")");

        let found: Vec<StockItem> = qb.build_query_as().fetch_all(&mut *conn).await?;

        let mut missing: Vec<String> = Vec::new();
        for id in ids {
            if !found.iter().any(|item| &item.id == id) && !missing.contains(id) {
                missing.push(id.clone());
            }
        }

        debug!(
            requested = ids.len(),
            found = found.len(),
            missing = missing.len(),
            "Resolved stock batch"
        );

        Ok(StockLookup { found, missing })
    }

    /// Takes `qty` units off the shelf if that many are available.
    pub async fn reserve(
        conn: &mut SqliteConnection,
        id: &str,
        qty: i64,
        at: DateTime<Utc>,
    ) -> DbResult<Reservation> {
        let result = sqlx::query(
            r#"
            UPDATE stock_items
            SET
                quantity = quantity - ?2,
                updated_at = ?3,
                version = version + 1
            WHERE id = ?1 AND quantity >= ?2
            "#,
        )
        .bind(id)
        .bind(qty)
        .bind(at)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 1 {
            debug!(stock_id = %id, qty = qty, "Reserved stock");
            return Ok(Reservation::Reserved);
        }

        let available: Option<i64> =
            sqlx::query_scalar("SELECT quantity FROM stock_items WHERE id = ?1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;

        Ok(match available {
            Some(available) => Reservation::Insufficient { available },
            None => Reservation::Missing,
        })
    }

    /// Puts `qty` units back on the shelf.
    pub async fn release(
        conn: &mut SqliteConnection,
        id: &str,
        qty: i64,
        at: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE stock_items
            SET
                quantity = quantity + ?2,
                updated_at = ?3,
                version = version + 1
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(qty)
        .bind(at)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("StockItem", id));
        }

        debug!(stock_id = %id, qty = qty, "Released stock");
        Ok(())
    }

    /// Loads a single item on the caller's connection.
    pub async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<StockItem>> {
        let sql = format!("SELECT {} FROM stock_items WHERE id = ?1", STOCK_COLUMNS);
        let item = sqlx::query_as::<_, StockItem>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(item)
    }

    // =========================================================================
    // Pool-scoped
    // =========================================================================

    /// Gets a stock item by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<StockItem>> {
        let mut conn = self.pool.acquire().await?;
        Self::find(&mut conn, id).await
    }

    /// Inserts a new stock item.
    pub async fn insert(&self, item: &StockItem) -> DbResult<StockItem> {
        debug!(id = %item.id, name = %item.name, "Inserting stock item");

        sqlx::query(
            r#"
            INSERT INTO stock_items (
                id, name, color, size, quantity, daily_late_fee,
                reorder_threshold, created_at, updated_at, version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(&item.color)
        .bind(&item.size)
        .bind(item.quantity)
        .bind(item.daily_late_fee)
        .bind(item.reorder_threshold)
        .bind(item.created_at)
        .bind(item.updated_at)
        .bind(item.version)
        .execute(&self.pool)
        .await?;

        Ok(item.clone())
    }

    /// Changes the daily late fee for future rentals.
    ///
    /// Open rentals keep the rate they were created with.
    pub async fn update_late_fee(
        &self,
        id: &str,
        daily_late_fee: i64,
        at: DateTime<Utc>,
    ) -> DbResult<StockItem> {
        debug!(id = %id, daily_late_fee = daily_late_fee, "Updating late fee");

        let result = sqlx::query(
            r#"
            UPDATE stock_items
            SET
                daily_late_fee = ?2,
                updated_at = ?3,
                version = version + 1
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(daily_late_fee)
        .bind(at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("StockItem", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("StockItem", id))
    }

    /// Applies a manual stock correction (restock, write-off).
    ///
    /// ## Returns
    /// * `Err(DbError::CheckViolation)` - the delta would go below zero
    pub async fn adjust_quantity(
        &self,
        id: &str,
        delta: i64,
        at: DateTime<Utc>,
    ) -> DbResult<StockItem> {
        debug!(id = %id, delta = delta, "Adjusting stock");

        let result = sqlx::query(
            r#"
            UPDATE stock_items
            SET
                quantity = quantity + ?2,
                updated_at = ?3,
                version = version + 1
            WHERE id = ?1 AND quantity + ?2 >= 0
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(at)
        .execute(&self.pool)
        .await?;

        let item = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("StockItem", id))?;

        if result.rows_affected() == 0 {
            return Err(DbError::CheckViolation {
                message: format!(
                    "adjusting {} by {} would leave {} units",
                    id,
                    delta,
                    item.quantity + delta
                ),
            });
        }

        Ok(item)
    }

    /// Lists stock items by name.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<StockItem>> {
        let sql = format!(
            "SELECT {} FROM stock_items ORDER BY name, id LIMIT ?1",
            STOCK_COLUMNS
        );
        let items = sqlx::query_as::<_, StockItem>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    /// Items at or below their reorder threshold, emptiest first.
    pub async fn low_stock(&self) -> DbResult<Vec<StockItem>> {
        let sql = format!(
            "SELECT {} FROM stock_items \
             WHERE reorder_threshold IS NOT NULL AND quantity <= reorder_threshold \
             ORDER BY quantity, name, id",
            STOCK_COLUMNS
        );
        let items = sqlx::query_as::<_, StockItem>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    /// Counts stock items (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stock_items")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
