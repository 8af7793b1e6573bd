//! # Statistics Repository
//!
//! Loads owner-scoped reservation rows joined with their customer and table,
//! then hands them to `tablebook_core::stats`.
//!
//! Reads run outside a transaction; a result one commit behind is fine.

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::debug;

use tablebook_core::stats::{self, CustomerStats, OverviewStats, TableStats};
use tablebook_core::{Clock, OwnerContext, ReservationDetail};

use crate::error::DbResult;
use crate::repository::customer::CustomerRepository;
use crate::repository::table::TableRepository;

const DETAIL_SELECT: &str = r#"
    SELECT
        r.id,
        r.owner_id,
        r.customer_id,
        r.table_id,
        r.date,
        r.time,
        r.status,
        c.name AS customer_name,
        c.email AS customer_email,
        t.table_number,
        t.capacity AS table_capacity
    FROM reservations r
    INNER JOIN customers c ON c.id = r.customer_id
    INNER JOIN dining_tables t ON t.id = r.table_id
    WHERE r.owner_id = ?1
"#;

/// Repository for statistics queries.
#[derive(Debug, Clone)]
pub struct StatsRepository {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl StatsRepository {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        StatsRepository { pool, clock }
    }

    /// Statistics for one of the owner's customers.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - no such customer for this owner
    pub async fn customer(&self, ctx: &OwnerContext, customer_id: &str) -> DbResult<CustomerStats> {
        let customer = CustomerRepository::new(self.pool.clone())
            .get(ctx, customer_id)
            .await?;

        let sql = format!("{DETAIL_SELECT} AND r.customer_id = ?2");
        let rows = sqlx::query_as::<_, ReservationDetail>(&sql)
            .bind(&ctx.owner_id)
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await?;

        debug!(customer_id = %customer_id, rows = rows.len(), "Customer statistics");
        Ok(stats::customer_stats(&customer, &rows, self.clock.today()))
    }

    /// Statistics for one of the owner's tables.
    pub async fn table(&self, ctx: &OwnerContext, table_id: &str) -> DbResult<TableStats> {
        let table = TableRepository::new(self.pool.clone()).get(ctx, table_id).await?;

        let sql = format!("{DETAIL_SELECT} AND r.table_id = ?2");
        let rows = sqlx::query_as::<_, ReservationDetail>(&sql)
            .bind(&ctx.owner_id)
            .bind(table_id)
            .fetch_all(&self.pool)
            .await?;

        debug!(table_id = %table_id, rows = rows.len(), "Table statistics");
        Ok(stats::table_stats(&table, &rows, self.clock.today()))
    }

    /// Statistics across all of the owner's reservations.
    pub async fn overview(&self, ctx: &OwnerContext) -> DbResult<OverviewStats> {
        let rows = sqlx::query_as::<_, ReservationDetail>(DETAIL_SELECT)
            .bind(&ctx.owner_id)
            .fetch_all(&self.pool)
            .await?;

        debug!(owner_id = %ctx.owner_id, rows = rows.len(), "Overview statistics");
        Ok(stats::overview(&rows, self.clock.today()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
