//! # Customer Directory
//!
//! Customers who can borrow stock. The rental engine only ever reads from
//! here; registration and edits come from the catalog side.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use stockhire_core::Customer;

const CUSTOMER_COLUMNS: &str = "id, name, phone, national_id, created_at, updated_at";

/// Repository for customer records.
#[derive(Debug, Clone)]
pub struct CustomerDirectory {
    pool: SqlitePool,
}

impl CustomerDirectory {
    /// Creates a new CustomerDirectory.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerDirectory { pool }
    }

    // =========================================================================
    // Transaction-scoped
    // =========================================================================

    /// Looks up a customer on the caller's connection.
    pub async fn resolve(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Customer>> {
        let sql = format!("SELECT {} FROM customers WHERE id = ?1", CUSTOMER_COLUMNS);
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(customer)
    }

    // =========================================================================
    // Pool-scoped
    // =========================================================================

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let mut conn = self.pool.acquire().await?;
        Self::resolve(&mut conn, id).await
    }

    /// Gets a customer by canonical phone number.
    pub async fn find_by_phone(&self, phone: &str) -> DbResult<Option<Customer>> {
        let sql = format!("SELECT {} FROM customers WHERE phone = ?1", CUSTOMER_COLUMNS);
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(phone)
            .fetch_optional(&self.pool)
            .await?;

        Ok(customer)
    }

    /// Inserts a new customer.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - phone already registered
    pub async fn register(&self, customer: &Customer) -> DbResult<Customer> {
        debug!(id = %customer.id, "Registering customer");

        sqlx::query(
            r#"
            INSERT INTO customers (id, name, phone, national_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.national_id)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("phone", &customer.phone),
            other => other,
        })?;

        Ok(customer.clone())
    }

    /// Updates name, phone and national id. The caller stamps `updated_at`.
    pub async fn update(&self, customer: &Customer) -> DbResult<()> {
        debug!(id = %customer.id, "Updating customer");

        let result = sqlx::query(
            r#"
            UPDATE customers SET
                name = ?2,
                phone = ?3,
                national_id = ?4,
                updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.national_id)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("phone", &customer.phone),
            other => other,
        })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", &customer.id));
        }

        Ok(())
    }

    /// Lists customers by name.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<Customer>> {
        let sql = format!(
            "SELECT {} FROM customers ORDER BY name, id LIMIT ?1",
            CUSTOMER_COLUMNS
        );
        let customers = sqlx::query_as::<_, Customer>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(customers)
    }

    /// Counts customers (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
