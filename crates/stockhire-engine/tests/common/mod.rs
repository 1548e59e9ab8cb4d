//! Common test utilities

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use stockhire_core::{
    CreateRentalRequest, Customer, NewCustomer, NewStockItem, Rental, RentalLineRequest,
    ReturnRentalRequest, StockItem,
};
use stockhire_db::{Database, DbConfig};
use stockhire_engine::{EngineConfig, FixedClock, RentalEngine};

/// An engine over a fresh database with a stopped clock and one customer.
pub struct Harness {
    pub engine: RentalEngine,
    pub clock: Arc<FixedClock>,
    pub customer: Customer,
}

/// 2024-01-08 09:00 UTC, two days before the usual test deadline.
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 8, 9, 0, 0).unwrap()
}

pub fn test_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    // Enough headroom that every contention test resolves to a domain error.
    config.engine.max_retries = 25;
    config.engine.retry_backoff_ms = 2;
    config.engine.max_backoff_ms = 50;
    config.directory.default_country_code = "44".to_string();
    config
}

/// Harness over an isolated in-memory database.
pub async fn setup() -> Harness {
    let db = Database::new(DbConfig::in_memory())
        .await
        .expect("Failed to open in-memory database");
    harness(db).await
}

/// Harness over a real database file with several pooled connections.
pub async fn setup_file(path: &Path, max_connections: u32) -> Harness {
    let db = Database::new(DbConfig::new(path).max_connections(max_connections))
        .await
        .expect("Failed to open database file");
    harness(db).await
}

async fn harness(db: Database) -> Harness {
    let clock = Arc::new(FixedClock::at(start_time()));
    let engine = RentalEngine::new(db, clock.clone(), test_config());

    let customer = engine
        .catalog()
        .register_customer(&NewCustomer {
            name: "Ada Lovelace".to_string(),
            phone: "0555 010 101".to_string(),
            national_id: Some("AL-1815".to_string()),
        })
        .await
        .expect("Failed to register customer");

    Harness {
        engine,
        clock,
        customer,
    }
}

impl Harness {
    pub async fn add_stock(&self, name: &str, quantity: i64, daily_late_fee: i64) -> StockItem {
        self.engine
            .catalog()
            .add_stock(&NewStockItem {
                name: name.to_string(),
                color: Some("green".to_string()),
                size: None,
                quantity,
                daily_late_fee,
                reorder_threshold: None,
            })
            .await
            .expect("Failed to add stock")
    }

    pub async fn quantity(&self, stock_id: &str) -> i64 {
        self.engine
            .catalog()
            .stock_item(stock_id)
            .await
            .expect("Stock item should exist")
            .quantity
    }

    pub fn rent_request(&self, deadline: &str, lines: &[(&str, i64)]) -> CreateRentalRequest {
        rent_request(&self.customer.id, deadline, lines)
    }

    pub async fn rent(&self, deadline: &str, lines: &[(&str, i64)]) -> Rental {
        self.engine
            .create_rental(&self.rent_request(deadline, lines))
            .await
            .expect("Rental should be created")
    }
}

pub fn rent_request(customer_id: &str, deadline: &str, lines: &[(&str, i64)]) -> CreateRentalRequest {
    CreateRentalRequest {
        customer_id: customer_id.to_string(),
        deadline_date: deadline.to_string(),
        paid_amount: 0,
        items: lines
            .iter()
            .map(|(stock_id, qty)| RentalLineRequest {
                stock_id: stock_id.to_string(),
                qty: *qty,
            })
            .collect(),
        processed_by: "desk-1".to_string(),
    }
}

pub fn return_request(rental_id: &str, paid_on_return: Option<i64>) -> ReturnRentalRequest {
    ReturnRentalRequest {
        rental_id: rental_id.to_string(),
        paid_on_return,
        note: None,
    }
}

/// A database file path under the system temp dir, unique per call.
pub fn temp_db_path() -> PathBuf {
    std::env::temp_dir().join(format!("stockhire-test-{}.db", uuid::Uuid::new_v4()))
}

/// Removes a database file and its WAL companions.
pub fn remove_db_files(path: &Path) {
    for suffix in ["", "-wal", "-shm"] {
        let mut file = path.as_os_str().to_owned();
        file.push(suffix);
        let _ = std::fs::remove_file(PathBuf::from(file));
    }
}
