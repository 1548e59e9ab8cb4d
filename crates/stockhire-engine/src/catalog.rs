//! # Catalog
//!
//! Customer registration and stock administration. None of these writes
//! touch rentals, so each is a single statement against the pool.

use std::sync::Arc;
use tracing::info;

use stockhire_core::validation::{validate_non_negative, validate_required};
use stockhire_core::{CoreError, Customer, NewCustomer, NewStockItem, StockItem, ValidationError};
use stockhire_db::{generate_id, Database, DbError};

use crate::clock::Clock;
use crate::error::{EngineError, EngineResult};

/// Customer and stock administration.
#[derive(Debug, Clone)]
pub struct Catalog {
    db: Database,
    clock: Arc<dyn Clock>,
    default_country_code: String,
}

impl Catalog {
    pub fn new(db: Database, clock: Arc<dyn Clock>, default_country_code: String) -> Self {
        Catalog {
            db,
            clock,
            default_country_code,
        }
    }

    // =========================================================================
    // Customers
    // =========================================================================

    /// Registers a customer. Phones are normalized and must be unique.
    pub async fn register_customer(&self, request: &NewCustomer) -> EngineResult<Customer> {
        let valid = request.validate(&self.default_country_code)?;
        let now = self.clock.now();

        let customer = Customer {
            id: generate_id(),
            name: valid.name,
            phone: valid.phone,
            national_id: valid.national_id,
            created_at: now,
            updated_at: now,
        };

        let customer = self
            .db
            .customers()
            .register(&customer)
            .await
            .map_err(|err| match err {
                DbError::UniqueViolation { .. } => ValidationError::InvalidFormat {
                    field: "phone".to_string(),
                    reason: format!("{} is already registered", customer.phone),
                }
                .into(),
                other => EngineError::from(other),
            })?;

        info!(customer_id = %customer.id, "Customer registered");
        Ok(customer)
    }

    /// Gets a customer by ID.
    pub async fn customer(&self, id: &str) -> EngineResult<Customer> {
        let id = validate_required("customer_id", id)?;
        self.db
            .customers()
            .get_by_id(&id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(id).into())
    }

    /// Looks a customer up by phone, normalizing it first.
    pub async fn customer_by_phone(&self, phone: &str) -> EngineResult<Option<Customer>> {
        let phone = stockhire_core::validation::normalize_phone(phone, &self.default_country_code)?;
        Ok(self.db.customers().find_by_phone(&phone).await?)
    }

    // =========================================================================
    // Stock
    // =========================================================================

    /// Adds a stock item.
    pub async fn add_stock(&self, request: &NewStockItem) -> EngineResult<StockItem> {
        let valid = request.validate()?;
        let now = self.clock.now();

        let item = StockItem {
            id: generate_id(),
            name: valid.name,
            color: valid.color,
            size: valid.size,
            quantity: valid.quantity,
            daily_late_fee: valid.daily_late_fee,
            reorder_threshold: valid.reorder_threshold,
            created_at: now,
            updated_at: now,
            version: 0,
        };

        let item = self.db.stock().insert(&item).await?;
        info!(stock_id = %item.id, name = %item.name, quantity = item.quantity, "Stock added");
        Ok(item)
    }

    /// Gets a stock item by ID.
    pub async fn stock_item(&self, id: &str) -> EngineResult<StockItem> {
        let id = validate_required("stock_id", id)?;
        self.db
            .stock()
            .get_by_id(&id)
            .await?
            .ok_or_else(|| stock_not_found(id).into())
    }

    /// Changes the daily late fee. Open rentals keep the fee they were
    /// created with.
    pub async fn set_late_fee(&self, id: &str, daily_late_fee: i64) -> EngineResult<StockItem> {
        let id = validate_required("stock_id", id)?;
        validate_non_negative("daily_late_fee", daily_late_fee)?;

        let item = self
            .db
            .stock()
            .update_late_fee(&id, daily_late_fee, self.clock.now())
            .await
            .map_err(|err| not_found_as_stock(err, &id))?;

        info!(stock_id = %item.id, daily_late_fee, "Late fee updated");
        Ok(item)
    }

    /// Adds `delta` units on the shelf (negative to write stock off).
    pub async fn adjust_stock(&self, id: &str, delta: i64) -> EngineResult<StockItem> {
        let id = validate_required("stock_id", id)?;

        let item = self
            .db
            .stock()
            .adjust_quantity(&id, delta, self.clock.now())
            .await
            .map_err(|err| match err {
                DbError::CheckViolation { .. } => ValidationError::OutOfRange {
                    field: "delta".to_string(),
                    min: 0,
                    max: i64::MAX,
                }
                .into(),
                other => not_found_as_stock(other, &id),
            })?;

        info!(stock_id = %item.id, delta, quantity = item.quantity, "Stock adjusted");
        Ok(item)
    }

    /// Lists stock items by name.
    pub async fn list_stock(&self, limit: u32) -> EngineResult<Vec<StockItem>> {
        Ok(self.db.stock().list(limit).await?)
    }

    /// Lists items at or below their reorder threshold.
    pub async fn low_stock(&self) -> EngineResult<Vec<StockItem>> {
        Ok(self.db.stock().low_stock().await?)
    }
}

fn stock_not_found(id: String) -> CoreError {
    CoreError::StockNotFound { ids: vec![id] }
}

fn not_found_as_stock(err: DbError, id: &str) -> EngineError {
    match err {
        DbError::NotFound { .. } => stock_not_found(id.to_string()).into(),
        other => other.into(),
    }
}
