//! # Table Repository
//!
//! Database operations for dining tables.
//!
//! Table numbers are unique per owner. Deleting a table removes its
//! reservations in the same transaction.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use tablebook_core::validation::{validate_new_table, validate_table_update};
use tablebook_core::{DiningTable, NewTable, OwnerContext, TableUpdate, ValidationError, ValidationErrors};

use crate::error::{is_unique_violation, DbError, DbResult};
use crate::repository::begin_write;

const TABLE_COLUMNS: &str =
    "id, owner_id, table_number, capacity, is_active, created_at, updated_at";

/// Repository for dining table database operations.
#[derive(Debug, Clone)]
pub struct TableRepository {
    pool: SqlitePool,
}

impl TableRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TableRepository { pool }
    }

    /// Lists the owner's tables ordered by table number.
    pub async fn list(&self, ctx: &OwnerContext) -> DbResult<Vec<DiningTable>> {
        let sql = format!(
            "SELECT {TABLE_COLUMNS} FROM dining_tables WHERE owner_id = ?1 ORDER BY table_number"
        );
        let tables = sqlx::query_as::<_, DiningTable>(&sql)
            .bind(&ctx.owner_id)
            .fetch_all(&self.pool)
            .await?;

        debug!(owner_id = %ctx.owner_id, count = tables.len(), "Listed tables");
        Ok(tables)
    }

    /// Gets one of the owner's tables.
    pub async fn get(&self, ctx: &OwnerContext, id: &str) -> DbResult<DiningTable> {
        let mut conn = self.pool.acquire().await?;
        fetch_scoped(&mut conn, ctx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Table", id))
    }

    /// Creates a table.
    ///
    /// ## Errors
    /// * `DbError::Validation` - number ≤ 0, capacity outside 1..=20, or
    ///   number already used by this owner
    pub async fn create(&self, ctx: &OwnerContext, input: &NewTable) -> DbResult<DiningTable> {
        validate_new_table(input)?;

        let now = Utc::now();
        let table = DiningTable {
            id: Uuid::new_v4().to_string(),
            owner_id: ctx.owner_id.clone(),
            table_number: input.table_number,
            capacity: input.capacity,
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %table.id, number = table.table_number, "Creating table");

        let mut tx = begin_write(&self.pool).await?;

        if number_in_use(&mut tx, ctx, table.table_number, None).await? {
            return Err(number_taken(table.table_number));
        }

        sqlx::query(
            r#"
            INSERT INTO dining_tables
                (id, owner_id, table_number, capacity, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&table.id)
        .bind(&table.owner_id)
        .bind(table.table_number)
        .bind(table.capacity)
        .bind(table.is_active)
        .bind(table.created_at)
        .bind(table.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_number_conflict(e, table.table_number))?;

        tx.commit().await?;
        Ok(table)
    }

    /// Applies a partial update.
    pub async fn update(
        &self,
        ctx: &OwnerContext,
        id: &str,
        patch: &TableUpdate,
    ) -> DbResult<DiningTable> {
        validate_table_update(patch)?;

        let mut tx = begin_write(&self.pool).await?;

        let existing = fetch_scoped(&mut tx, ctx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Table", id))?;

        let updated = DiningTable {
            table_number: patch.table_number.unwrap_or(existing.table_number),
            capacity: patch.capacity.unwrap_or(existing.capacity),
            is_active: patch.is_active.unwrap_or(existing.is_active),
            updated_at: Utc::now(),
            ..existing.clone()
        };

        if updated.table_number != existing.table_number
            && number_in_use(&mut tx, ctx, updated.table_number, Some(id)).await?
        {
            return Err(number_taken(updated.table_number));
        }

        debug!(id = %id, "Updating table");

        sqlx::query(
            r#"
            UPDATE dining_tables
            SET table_number = ?1, capacity = ?2, is_active = ?3, updated_at = ?4
            WHERE id = ?5 AND owner_id = ?6
            "#,
        )
        .bind(updated.table_number)
        .bind(updated.capacity)
        .bind(updated.is_active)
        .bind(updated.updated_at)
        .bind(id)
        .bind(&ctx.owner_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_number_conflict(e, updated.table_number))?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Deletes a table and every reservation on it.
    ///
    /// ## Returns
    /// Number of reservations removed with the table.
    pub async fn delete(&self, ctx: &OwnerContext, id: &str) -> DbResult<u64> {
        let mut tx = begin_write(&self.pool).await?;

        if fetch_scoped(&mut tx, ctx, id).await?.is_none() {
            return Err(DbError::not_found("Table", id));
        }

        let removed = sqlx::query("DELETE FROM reservations WHERE table_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM dining_tables WHERE id = ?1 AND owner_id = ?2")
            .bind(id)
            .bind(&ctx.owner_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(id = %id, reservations = removed, "Deleted table");
        Ok(removed)
    }
}

// =============================================================================
// Connection-level helpers
// =============================================================================

/// Loads a table regardless of owner.
pub(crate) async fn fetch_any(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<DiningTable>> {
    let sql = format!("SELECT {TABLE_COLUMNS} FROM dining_tables WHERE id = ?1");
    let table = sqlx::query_as::<_, DiningTable>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(table)
}

async fn fetch_scoped(
    conn: &mut SqliteConnection,
    ctx: &OwnerContext,
    id: &str,
) -> DbResult<Option<DiningTable>> {
    let sql = format!("SELECT {TABLE_COLUMNS} FROM dining_tables WHERE id = ?1 AND owner_id = ?2");
    let table = sqlx::query_as::<_, DiningTable>(&sql)
        .bind(id)
        .bind(&ctx.owner_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(table)
}

async fn number_in_use(
    conn: &mut SqliteConnection,
    ctx: &OwnerContext,
    number: u32,
    exclude_id: Option<&str>,
) -> DbResult<bool> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM dining_tables
        WHERE owner_id = ?1 AND table_number = ?2 AND (?3 IS NULL OR id <> ?3)
        "#,
    )
    .bind(&ctx.owner_id)
    .bind(number)
    .bind(exclude_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count > 0)
}

fn number_taken(number: u32) -> DbError {
    ValidationErrors::single(
        "table_number",
        ValidationError::UniquenessViolation {
            value: number.to_string(),
        },
    )
    .into()
}

fn map_number_conflict(err: sqlx::Error, number: u32) -> DbError {
    if is_unique_violation(&err) {
        number_taken(number)
    } else {
        DbError::from(err)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    async fn setup() -> (Database, OwnerContext) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let owner = db.owners().provision("owner_one", "one@resto.cl").await.unwrap();
        (db, owner.context())
    }

    fn input(number: u32, capacity: u32) -> NewTable {
        NewTable {
            table_number: number,
            capacity,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_create_and_list_by_number() {
        let (db, ctx) = setup().await;
        db.tables().create(&ctx, &input(3, 2)).await.unwrap();
        db.tables().create(&ctx, &input(1, 4)).await.unwrap();
        db.tables().create(&ctx, &input(2, 6)).await.unwrap();

        let numbers: Vec<u32> = db
            .tables()
            .list(&ctx)
            .await
            .unwrap()
            .iter()
            .map(|t| t.table_number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_capacity_bounds() {
        let (db, ctx) = setup().await;
        assert!(db.tables().create(&ctx, &input(1, 1)).await.is_ok());
        assert!(db.tables().create(&ctx, &input(2, 20)).await.is_ok());

        for capacity in [0, 21] {
            let err = db.tables().create(&ctx, &input(3, capacity)).await.unwrap_err();
            assert_eq!(err.validation_errors().unwrap().for_field("capacity").count(), 1);
        }

        let err = db.tables().create(&ctx, &input(0, 4)).await.unwrap_err();
        assert_eq!(
            err.validation_errors()
                .unwrap()
                .for_field("table_number")
                .collect::<Vec<_>>(),
            vec![&ValidationError::MustBePositive]
        );
    }

    #[tokio::test]
    async fn test_duplicate_number_per_owner() {
        let (db, ctx) = setup().await;
        db.tables().create(&ctx, &input(1, 4)).await.unwrap();

        let err = db.tables().create(&ctx, &input(1, 2)).await.unwrap_err();
        assert!(err
            .validation_errors()
            .unwrap()
            .contains(|e| matches!(e, ValidationError::UniquenessViolation { .. })));

        let other = db.owners().provision("owner_two", "two@resto.cl").await.unwrap();
        assert!(db.tables().create(&other.context(), &input(1, 2)).await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_creates_report_number_taken() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("tables.db")).max_connections(6))
            .await
            .unwrap();
        let ctx = db
            .owners()
            .provision("owner_race", "race@resto.cl")
            .await
            .unwrap()
            .context();

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let repo = db.tables();
                let ctx = ctx.clone();
                tokio::spawn(async move { repo.create(&ctx, &input(7, 4)).await })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(err) => assert_eq!(
                    err.validation_errors()
                        .unwrap_or_else(|| panic!("expected UniquenessViolation, got {err}"))
                        .for_field("table_number")
                        .collect::<Vec<_>>(),
                    vec![&ValidationError::UniquenessViolation {
                        value: "7".to_string()
                    }]
                ),
            }
        }

        assert_eq!(created, 1);
        assert_eq!(db.tables().list(&ctx).await.unwrap().len(), 1);
        db.close().await;
    }

    #[tokio::test]
    async fn test_update_and_renumber_conflict() {
        let (db, ctx) = setup().await;
        let one = db.tables().create(&ctx, &input(1, 4)).await.unwrap();
        db.tables().create(&ctx, &input(2, 4)).await.unwrap();

        let bigger = db
            .tables()
            .update(
                &ctx,
                &one.id,
                &TableUpdate {
                    capacity: Some(8),
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(bigger.capacity, 8);
        assert!(!bigger.is_active);
        assert_eq!(db.tables().get(&ctx, &one.id).await.unwrap(), bigger);

        let err = db
            .tables()
            .update(
                &ctx,
                &one.id,
                &TableUpdate {
                    table_number: Some(2),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(err.validation_errors().is_some());
    }

    #[tokio::test]
    async fn test_foreign_table_not_found() {
        let (db, ctx) = setup().await;
        let table = db.tables().create(&ctx, &input(1, 4)).await.unwrap();
        let other = db.owners().provision("owner_two", "two@resto.cl").await.unwrap();

        assert!(db.tables().get(&other.context(), &table.id).await.unwrap_err().is_not_found());
        assert!(db
            .tables()
            .update(&other.context(), &table.id, &TableUpdate::default())
            .await
            .unwrap_err()
            .is_not_found());
    }
}
