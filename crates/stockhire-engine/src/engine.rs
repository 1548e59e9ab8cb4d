//! # Rental Engine
//!
//! Creates and returns rentals, each as one all-or-nothing transaction.
//!
//! ## Create
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate request (no I/O)                                             │
//! │       │                                                                 │
//! │  BEGIN ─────────────────────────────────────────────────────────────┐  │
//! │  │  resolve customer ............................ CustomerNotFound   │  │
//! │  │  batch-resolve stock ids ..................... StockNotFound      │  │
//! │  │  check every line (duplicates summed) ........ InsufficientStock  │  │
//! │  │  conditional decrement per stock id .......... InsufficientStock  │  │
//! │  │  insert rental + items (fee snapshots)                             │  │
//! │  COMMIT ────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Return
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN ─────────────────────────────────────────────────────────────┐  │
//! │  │  load rental + items ......................... RentalNotFound     │  │
//! │  │  status must be `rented` ..................... AlreadyReturned    │  │
//! │  │  late days + fees from the frozen snapshots                        │  │
//! │  │  guarded UPDATE ... WHERE status = 'rented' .. AlreadyReturned    │  │
//! │  │  release every line                                                │  │
//! │  │  append history (customer + stock as they are now)                 │  │
//! │  COMMIT ────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any error drops the transaction, which rolls it back. SQLite write
//! conflicts rerun the whole unit of work with backoff; nothing else is
//! retried.

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use stockhire_core::fees;
use stockhire_core::validation::{validate_required, PageWindow};
use stockhire_core::{
    CoreError, CreateRentalRequest, CustomerSnapshot, HistoryItemSnapshot, HistoryRental, Money,
    Rental, RentalDraft, RentalDraftItem, RentalOrder, RentalPage, RentalPatch, RentalQuery,
    RentalStatus, ReturnOrder, ReturnRentalRequest, Settlement, ValidationError,
};
use stockhire_db::{
    generate_id, CustomerDirectory, Database, DbError, RentalFilter, RentalStore, Reservation,
    StockLedger,
};

use crate::catalog::Catalog;
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};

/// The rental engine.
///
/// Holds no mutable state between calls: a database handle, a clock and
/// its configuration. Cloning is cheap and clones share the pool.
#[derive(Debug, Clone)]
pub struct RentalEngine {
    db: Database,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl RentalEngine {
    /// Creates an engine over an open database.
    pub fn new(db: Database, clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
        RentalEngine { db, clock, config }
    }

    /// Opens the configured database (running migrations) with the system clock.
    pub async fn open(config: EngineConfig) -> EngineResult<Self> {
        let db = Database::new(config.db_config()).await?;
        Ok(Self::new(db, Arc::new(SystemClock), config))
    }

    /// Returns the underlying database handle.
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the customer and stock administration API.
    pub fn catalog(&self) -> Catalog {
        Catalog::new(
            self.db.clone(),
            self.clock.clone(),
            self.config.directory.default_country_code.clone(),
        )
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Rents out the requested items, or nothing at all.
    pub async fn create_rental(&self, request: &CreateRentalRequest) -> EngineResult<Rental> {
        let order = request.validate()?;

        let rental = self
            .with_retry("create_rental", || self.try_create(&order))
            .await?;

        info!(
            rental_id = %rental.id,
            customer_id = %rental.customer_id,
            lines = rental.items.len(),
            units = rental.total_qty(),
            deadline = %rental.deadline_date,
            "Rental created"
        );

        Ok(rental)
    }

    async fn try_create(&self, order: &RentalOrder) -> EngineResult<Rental> {
        let mut tx = self.db.begin().await?;

        if CustomerDirectory::resolve(&mut *tx, &order.customer_id)
            .await?
            .is_none()
        {
            return Err(CoreError::CustomerNotFound(order.customer_id.clone()).into());
        }

        let requested = order.requested_by_stock();
        let stock_ids: Vec<String> = requested.iter().map(|(id, _)| id.clone()).collect();

        let lookup = StockLedger::batch_resolve(&mut *tx, &stock_ids).await?;
        if !lookup.missing.is_empty() {
            return Err(CoreError::StockNotFound {
                ids: lookup.missing,
            }
            .into());
        }

        // Every line is checked before the first decrement.
        for (stock_id, qty) in &requested {
            let item = lookup
                .get(stock_id)
                .ok_or_else(|| stock_not_found(stock_id))?;
            if !item.can_reserve(*qty) {
                return Err(CoreError::InsufficientStock {
                    stock_id: stock_id.clone(),
                    name: item.name.clone(),
                    available: item.quantity,
                    requested: *qty,
                }
                .into());
            }
        }

        let now = self.clock.now();
        for (stock_id, qty) in &requested {
            match StockLedger::reserve(&mut *tx, stock_id, *qty, now).await? {
                Reservation::Reserved => {}
                Reservation::Insufficient { available } => {
                    let name = lookup
                        .get(stock_id)
                        .map(|item| item.name.clone())
                        .unwrap_or_default();
                    return Err(CoreError::InsufficientStock {
                        stock_id: stock_id.clone(),
                        name,
                        available,
                        requested: *qty,
                    }
                    .into());
                }
                Reservation::Missing => return Err(stock_not_found(stock_id).into()),
            }
        }

        let mut items = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            let stock = lookup
                .get(&line.stock_id)
                .ok_or_else(|| stock_not_found(&line.stock_id))?;
            items.push(RentalDraftItem {
                stock_id: line.stock_id.clone(),
                qty: line.qty,
                daily_late_fee_snapshot: stock.daily_late_fee,
            });
        }

        let draft = RentalDraft {
            customer_id: order.customer_id.clone(),
            deadline_date: order.deadline_date,
            paid_amount: order.paid_amount,
            processed_by: order.processed_by.clone(),
            rented_on: now,
            items,
        };

        let rental = RentalStore::create(&mut *tx, &draft).await?;

        tx.commit().await.map_err(DbError::from)?;

        for (stock_id, qty) in &requested {
            if let Some(item) = lookup.get(stock_id) {
                let left = item.quantity - qty;
                if item.reorder_threshold.is_some_and(|t| left <= t) {
                    warn!(
                        stock_id = %stock_id,
                        name = %item.name,
                        quantity = left,
                        "Stock at or below reorder threshold"
                    );
                }
            }
        }

        Ok(rental)
    }

    // =========================================================================
    // Return
    // =========================================================================

    /// Returns every item of a rental and settles late fees.
    pub async fn return_rental(&self, request: &ReturnRentalRequest) -> EngineResult<Settlement> {
        let order = request.validate()?;

        let settlement = self
            .with_retry("return_rental", || self.try_return(&order))
            .await?;

        info!(
            rental_id = %settlement.rental_id,
            late_days = settlement.late_days,
            total_fees = settlement.total_fees,
            balance_due = settlement.balance_due,
            "Rental returned"
        );

        Ok(settlement)
    }

    async fn try_return(&self, order: &ReturnOrder) -> EngineResult<Settlement> {
        let mut tx = self.db.begin().await?;

        let rental = RentalStore::find_by_id(&mut *tx, &order.rental_id)
            .await?
            .ok_or_else(|| CoreError::RentalNotFound(order.rental_id.clone()))?;

        if !rental.is_open() {
            return Err(CoreError::AlreadyReturned(rental.id.clone()).into());
        }

        let now = self.clock.now();
        let assessment = fees::assess(&rental.id, rental.deadline_date, now, &rental.items)?;

        let paid = rental
            .paid()
            .checked_add(Money::from_minor(order.paid_on_return))
            .ok_or_else(|| ValidationError::OutOfRange {
                field: "paid_on_return".to_string(),
                min: 0,
                max: i64::MAX - rental.paid_amount,
            })?;

        let patch = RentalPatch {
            expected_status: RentalStatus::Rented,
            status: RentalStatus::Returned,
            returned_on: Some(now),
            paid_amount: paid.minor(),
        };

        RentalStore::update(&mut *tx, &rental.id, &patch)
            .await
            .map_err(|err| match err {
                DbError::Stale { .. } => CoreError::AlreadyReturned(rental.id.clone()).into(),
                other => EngineError::from(other),
            })?;

        for item in &rental.items {
            StockLedger::release(&mut *tx, &item.stock_id, item.qty, now).await?;
        }

        let customer = CustomerDirectory::resolve(&mut *tx, &rental.customer_id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(rental.customer_id.clone()))?;

        let mut stock_ids: Vec<String> = Vec::new();
        for item in &rental.items {
            if !stock_ids.contains(&item.stock_id) {
                stock_ids.push(item.stock_id.clone());
            }
        }
        let lookup = StockLedger::batch_resolve(&mut *tx, &stock_ids).await?;

        let mut items = Vec::with_capacity(rental.items.len());
        for (item, fee) in rental.items.iter().zip(&assessment.line_fees) {
            let stock = lookup
                .get(&item.stock_id)
                .ok_or_else(|| stock_not_found(&item.stock_id))?;
            items.push(HistoryItemSnapshot {
                stock_id: item.stock_id.clone(),
                name: stock.name.clone(),
                color: stock.color.clone(),
                size: stock.size.clone(),
                qty: item.qty,
                daily_late_fee_snapshot: item.daily_late_fee_snapshot,
                fee: fee.minor(),
            });
        }

        let history = HistoryRental {
            id: generate_id(),
            rental_id: rental.id.clone(),
            customer: CustomerSnapshot::from(&customer),
            items,
            deadline_date: rental.deadline_date,
            rented_on: rental.rented_on,
            returned_on: now,
            late_days: assessment.late_days,
            total_fees: assessment.total.minor(),
            paid_amount: paid.minor(),
            processed_by: rental.processed_by.clone(),
            note: order.note.clone(),
            created_at: now,
        };

        RentalStore::append_history(&mut *tx, &history)
            .await
            .map_err(|err| match err {
                DbError::UniqueViolation { .. } => {
                    CoreError::AlreadyReturned(rental.id.clone()).into()
                }
                other => EngineError::from(other),
            })?;

        tx.commit().await.map_err(DbError::from)?;

        Ok(Settlement {
            rental_id: rental.id,
            late_days: assessment.late_days,
            total_fees: assessment.total.minor(),
            paid_amount: paid.minor(),
            balance_due: assessment.total.saturating_sub_to_zero(paid).minor(),
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets a rental with its items.
    pub async fn get_rental(&self, rental_id: &str) -> EngineResult<Rental> {
        let rental_id = validate_required("rental_id", rental_id)?;

        self.db
            .rentals()
            .get(&rental_id)
            .await?
            .ok_or_else(|| CoreError::RentalNotFound(rental_id).into())
    }

    /// Lists rentals newest first.
    pub async fn list_rentals(&self, query: &RentalQuery) -> EngineResult<RentalPage> {
        let window = PageWindow::new(
            query.page,
            query.limit.or(Some(self.config.engine.default_page_size)),
        );

        let filter = RentalFilter {
            status: query.status,
            overdue_on: query.overdue.then(|| self.clock.today()),
            customer_id: query
                .customer_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string),
            limit: window.limit,
            offset: window.offset(),
        };

        debug!(?filter, "Listing rentals");

        let (items, total) = self.db.rentals().list(&filter).await?;

        Ok(RentalPage {
            items,
            total,
            page: window.page,
            limit: window.limit,
        })
    }

    /// Gets the history record of a returned rental.
    pub async fn get_history(&self, rental_id: &str) -> EngineResult<Option<HistoryRental>> {
        let rental_id = validate_required("rental_id", rental_id)?;
        Ok(self.db.rentals().history_for_rental(&rental_id).await?)
    }

    /// Lists history records newest first, optionally for one customer.
    pub async fn list_history(
        &self,
        customer_id: Option<&str>,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> EngineResult<Vec<HistoryRental>> {
        let window = PageWindow::new(page, limit.or(Some(self.config.engine.default_page_size)));
        let customer_id = customer_id.map(str::trim).filter(|id| !id.is_empty());

        Ok(self
            .db
            .rentals()
            .list_history(customer_id, window.limit, window.offset())
            .await?)
    }

    // =========================================================================
    // Retry
    // =========================================================================

    /// Runs `unit` until it succeeds, fails for a non-conflict reason, or
    /// the retry budget is spent.
    async fn with_retry<T, F, Fut>(&self, op: &'static str, mut unit: F) -> EngineResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = EngineResult<T>>,
    {
        let mut backoff = ExponentialBackoff {
            initial_interval: self.config.retry_backoff(),
            max_interval: self.config.max_backoff(),
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        };
        let max_attempts = self.config.engine.max_retries.saturating_add(1);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            match unit().await {
                Err(err) if err.is_retryable() => {
                    if attempt >= max_attempts {
                        warn!(op, attempts = attempt, error = %err, "Giving up after write conflicts");
                        return Err(EngineError::TransactionConflict { attempts: attempt });
                    }

                    let delay = backoff
                        .next_backoff()
                        .unwrap_or_else(|| self.config.max_backoff());
                    warn!(
                        op,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Write conflict, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }
}

fn stock_not_found(stock_id: &str) -> CoreError {
    CoreError::StockNotFound {
        ids: vec![stock_id.to_string()],
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::error::ErrorKind;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicU32, Ordering};
    use stockhire_db::DbConfig;

    async fn engine(max_retries: u32) -> RentalEngine {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let clock = Arc::new(FixedClock::at(
            Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
        ));
        let mut config = EngineConfig::default();
        config.engine.max_retries = max_retries;
        config.engine.retry_backoff_ms = 1;
        config.engine.max_backoff_ms = 5;
        RentalEngine::new(db, clock, config)
    }

    #[tokio::test]
    async fn test_retry_stops_after_budget() {
        let engine = engine(3).await;
        let calls = AtomicU32::new(0);

        let result: EngineResult<()> = engine
            .with_retry("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(DbError::Conflict("database is locked".into()).into())
            })
            .await;

        assert!(matches!(
            result,
            Err(EngineError::TransactionConflict { attempts: 4 })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_conflict() {
        let engine = engine(3).await;
        let calls = AtomicU32::new(0);

        let result = engine
            .with_retry("test", || async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(DbError::Conflict("database is locked".into()).into())
                } else {
                    Ok(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_domain_errors_are_not_retried() {
        let engine = engine(3).await;
        let calls = AtomicU32::new(0);

        let result: EngineResult<()> = engine
            .with_retry("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CoreError::AlreadyReturned("r-1".into()).into())
            })
            .await;

        assert_eq!(result.unwrap_err().kind(), ErrorKind::AlreadyReturned);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_rental_validates_id() {
        let engine = engine(0).await;

        let err = engine.get_rental("  ").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = engine.get_rental("missing").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
