//! # Rental Store
//!
//! Rental aggregates, their line items, and the write-once history table.
//!
//! ## Tables
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  rentals (1) ────────< rental_items (N)      ordered by position        │
//! │     │                                                                   │
//! │     │ on return                                                         │
//! │     ▼                                                                   │
//! │  history_rentals (0..1)                      customer + items as JSON   │
//! │                                              UPDATE/DELETE rejected by  │
//! │                                              triggers                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rentals are never deleted. Status only moves `rented → returned`, and
//! [`RentalStore::update`] refuses to apply a patch unless the row is still
//! in the status the caller read.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;
use stockhire_core::{
    HistoryRental, Rental, RentalDraft, RentalItem, RentalPatch, RentalStatus,
};

const RENTAL_COLUMNS: &str = "id, customer_id, deadline_date, paid_amount, status, \
     processed_by, rented_on, returned_on";

const ITEM_COLUMNS: &str = "id, rental_id, stock_id, position, qty, daily_late_fee_snapshot";

const HISTORY_COLUMNS: &str = "id, rental_id, customer_snapshot, items_snapshot, \
     deadline_date, rented_on, returned_on, late_days, total_fees, paid_amount, \
     processed_by, note, created_at";

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct RentalRow {
    id: String,
    customer_id: String,
    deadline_date: NaiveDate,
    paid_amount: i64,
    status: RentalStatus,
    processed_by: String,
    rented_on: DateTime<Utc>,
    returned_on: Option<DateTime<Utc>>,
}

impl RentalRow {
    fn into_rental(self, items: Vec<RentalItem>) -> Rental {
        Rental {
            id: self.id,
            customer_id: self.customer_id,
            deadline_date: self.deadline_date,
            paid_amount: self.paid_amount,
            status: self.status,
            processed_by: self.processed_by,
            rented_on: self.rented_on,
            returned_on: self.returned_on,
            items,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct HistoryRow {
    id: String,
    rental_id: String,
    customer_snapshot: String,
    items_snapshot: String,
    deadline_date: NaiveDate,
    rented_on: DateTime<Utc>,
    returned_on: DateTime<Utc>,
    late_days: i64,
    total_fees: i64,
    paid_amount: i64,
    processed_by: String,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<HistoryRow> for HistoryRental {
    type Error = DbError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        Ok(HistoryRental {
            id: row.id,
            rental_id: row.rental_id,
            customer: serde_json::from_str(&row.customer_snapshot)?,
            items: serde_json::from_str(&row.items_snapshot)?,
            deadline_date: row.deadline_date,
            rented_on: row.rented_on,
            returned_on: row.returned_on,
            late_days: row.late_days,
            total_fees: row.total_fees,
            paid_amount: row.paid_amount,
            processed_by: row.processed_by,
            note: row.note,
            created_at: row.created_at,
        })
    }
}

// =============================================================================
// Filters
// =============================================================================

/// Store-level listing filter. Paging is already resolved to limit/offset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RentalFilter {
    pub status: Option<RentalStatus>,
    /// When set, only rentals still out whose deadline is before this date.
    pub overdue_on: Option<NaiveDate>,
    pub customer_id: Option<String>,
    pub limit: u32,
    pub offset: i64,
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &RentalFilter) {
    qb.push(" WHERE 1 = 1");

    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(today) = filter.overdue_on {
        qb.push(" AND status = 'rented' AND deadline_date < ")
            .push_bind(today);
    }
    if let Some(customer_id) = &filter.customer_id {
        qb.push(" AND customer_id = ").push_bind(customer_id.clone());
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for rentals and rental history.
#[derive(Debug, Clone)]
pub struct RentalStore {
    pool: SqlitePool,
}

impl RentalStore {
    /// Creates a new RentalStore.
    pub fn new(pool: SqlitePool) -> Self {
        RentalStore { pool }
    }

    // =========================================================================
    // Transaction-scoped
    // =========================================================================

    /// Persists a new rental in status `rented` together with its items.
    ///
    /// Item positions follow the order of `draft.items`.
    pub async fn create(conn: &mut SqliteConnection, draft: &RentalDraft) -> DbResult<Rental> {
        let rental_id = generate_id();

        debug!(
            rental_id = %rental_id,
            customer_id = %draft.customer_id,
            lines = draft.items.len(),
            "Inserting rental"
        );

        sqlx::query(
            r#"
            INSERT INTO rentals (
                id, customer_id, deadline_date, paid_amount, status,
                processed_by, rented_on, returned_on
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL)
            "#,
        )
        .bind(&rental_id)
        .bind(&draft.customer_id)
        .bind(draft.deadline_date)
        .bind(draft.paid_amount)
        .bind(RentalStatus::Rented)
        .bind(&draft.processed_by)
        .bind(draft.rented_on)
        .execute(&mut *conn)
        .await?;

        let mut items = Vec::with_capacity(draft.items.len());
        for (position, line) in draft.items.iter().enumerate() {
            let item = RentalItem {
                id: generate_id(),
                rental_id: rental_id.clone(),
                stock_id: line.stock_id.clone(),
                position: position as i64,
                qty: line.qty,
                daily_late_fee_snapshot: line.daily_late_fee_snapshot,
            };

            sqlx::query(
                r#"
                INSERT INTO rental_items (
                    id, rental_id, stock_id, position, qty, daily_late_fee_snapshot
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(&item.id)
            .bind(&item.rental_id)
            .bind(&item.stock_id)
            .bind(item.position)
            .bind(item.qty)
            .bind(item.daily_late_fee_snapshot)
            .execute(&mut *conn)
            .await?;

            items.push(item);
        }

        Ok(Rental {
            id: rental_id,
            customer_id: draft.customer_id.clone(),
            deadline_date: draft.deadline_date,
            paid_amount: draft.paid_amount,
            status: RentalStatus::Rented,
            processed_by: draft.processed_by.clone(),
            rented_on: draft.rented_on,
            returned_on: None,
            items,
        })
    }

    /// Loads a rental with its items on the caller's connection.
    pub async fn find_by_id(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Rental>> {
        let sql = format!("SELECT {} FROM rentals WHERE id = ?1", RENTAL_COLUMNS);
        let row = sqlx::query_as::<_, RentalRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let sql = format!(
            "SELECT {} FROM rental_items WHERE rental_id = ?1 ORDER BY position",
            ITEM_COLUMNS
        );
        let items = sqlx::query_as::<_, RentalItem>(&sql)
            .bind(id)
            .fetch_all(&mut *conn)
            .await?;

        Ok(Some(row.into_rental(items)))
    }

    /// Applies a status transition if the row is still in `patch.expected_status`.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - no such rental
    /// * `Err(DbError::Stale)` - the rental is no longer in the expected status
    pub async fn update(
        conn: &mut SqliteConnection,
        id: &str,
        patch: &RentalPatch,
    ) -> DbResult<Rental> {
        debug!(
            rental_id = %id,
            from = %patch.expected_status,
            to = %patch.status,
            "Updating rental"
        );

        let result = sqlx::query(
            r#"
            UPDATE rentals
            SET
                status = ?2,
                returned_on = ?3,
                paid_amount = ?4
            WHERE id = ?1 AND status = ?5
            "#,
        )
        .bind(id)
        .bind(patch.status)
        .bind(patch.returned_on)
        .bind(patch.paid_amount)
        .bind(patch.expected_status)
        .execute(&mut *conn)
        .await?;

        let rental = Self::find_by_id(conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Rental", id))?;

        if result.rows_affected() == 0 {
            return Err(DbError::stale("Rental", id));
        }

        Ok(rental)
    }

    /// Writes the history record for a returned rental.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - the rental already has one
    pub async fn append_history(
        conn: &mut SqliteConnection,
        history: &HistoryRental,
    ) -> DbResult<()> {
        debug!(
            rental_id = %history.rental_id,
            late_days = history.late_days,
            total_fees = history.total_fees,
            "Appending rental history"
        );

        let customer_snapshot = serde_json::to_string(&history.customer)?;
        let items_snapshot = serde_json::to_string(&history.items)?;

        sqlx::query(
            r#"
            INSERT INTO history_rentals (
                id, rental_id, customer_id, customer_snapshot, items_snapshot,
                deadline_date, rented_on, returned_on, late_days, total_fees,
                paid_amount, processed_by, note, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&history.id)
        .bind(&history.rental_id)
        .bind(&history.customer.id)
        .bind(customer_snapshot)
        .bind(items_snapshot)
        .bind(history.deadline_date)
        .bind(history.rented_on)
        .bind(history.returned_on)
        .bind(history.late_days)
        .bind(history.total_fees)
        .bind(history.paid_amount)
        .bind(&history.processed_by)
        .bind(&history.note)
        .bind(history.created_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => {
                DbError::duplicate("history_rentals.rental_id", &history.rental_id)
            }
            other => other,
        })?;

        Ok(())
    }

    // =========================================================================
    // Pool-scoped
    // =========================================================================

    /// Gets a rental with its items.
    pub async fn get(&self, id: &str) -> DbResult<Option<Rental>> {
        let mut conn = self.pool.acquire().await?;
        Self::find_by_id(&mut conn, id).await
    }

    /// Lists rentals newest first, with the total count of matches.
    pub async fn list(&self, filter: &RentalFilter) -> DbResult<(Vec<Rental>, i64)> {
        let mut conn = self.pool.acquire().await?;

        let mut count_qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM rentals");
        push_filters(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&mut *conn)
            .await?;

        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM rentals", RENTAL_COLUMNS));
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY rented_on DESC, id DESC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);

        let rows: Vec<RentalRow> = qb.build_query_as().fetch_all(&mut *conn).await?;

        if rows.is_empty() {
            return Ok((Vec::new(), total));
        }

        let mut items_qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM rental_items WHERE rental_id IN (",
            ITEM_COLUMNS
        ));
        let mut separated = items_qb.separated(", ");
        for row in &rows {
            separated.push_bind(row.id.clone());
        }
        separated.push_unseparated(") ORDER BY rental_id, position");

        let items: Vec<RentalItem> = items_qb.build_query_as().fetch_all(&mut *conn).await?;

        let rentals = rows
            .into_iter()
            .map(|row| {
                let mine = items
                    .iter()
                    .filter(|item| item.rental_id == row.id)
                    .cloned()
                    .collect();
                row.into_rental(mine)
            })
            .collect();

        debug!(total = total, "Listed rentals");
        Ok((rentals, total))
    }

    /// Gets the history record of a returned rental.
    pub async fn history_for_rental(&self, rental_id: &str) -> DbResult<Option<HistoryRental>> {
        let sql = format!(
            "SELECT {} FROM history_rentals WHERE rental_id = ?1",
            HISTORY_COLUMNS
        );
        let row = sqlx::query_as::<_, HistoryRow>(&sql)
            .bind(rental_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(HistoryRental::try_from).transpose()
    }

    /// Lists history records newest first, optionally for one customer.
    pub async fn list_history(
        &self,
        customer_id: Option<&str>,
        limit: u32,
        offset: i64,
    ) -> DbResult<Vec<HistoryRental>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM history_rentals", HISTORY_COLUMNS));
        if let Some(customer_id) = customer_id {
            qb.push(" WHERE customer_id = ")
                .push_bind(customer_id.to_string());
        }
        qb.push(" ORDER BY returned_on DESC, id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows: Vec<HistoryRow> = qb.build_query_as().fetch_all(&self.pool).await?;

        rows.into_iter().map(HistoryRental::try_from).collect()
    }

    /// Counts history records for a rental (0 or 1).
    pub async fn history_count(&self, rental_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM history_rentals WHERE rental_id = ?1")
                .bind(rental_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
