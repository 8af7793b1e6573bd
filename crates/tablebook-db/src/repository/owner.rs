//! # Owner Repository
//!
//! Tenant accounts.
//!
//! Provisioning an owner also creates the owner's own customer record (same
//! name and email, no phone), so staff can book tables for themselves. Both
//! rows are written in one transaction.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use tablebook_core::validation::{validate_customer_name, validate_email};
use tablebook_core::{Owner, OwnerContext, ValidationError, ValidationErrors};

use crate::error::{is_unique_violation, DbError, DbResult};
use crate::repository::begin_write;

/// Row counts for one owner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OwnerCounts {
    pub customers: u64,
    pub tables: u64,
    pub reservations: u64,
}

impl OwnerCounts {
    pub fn is_empty(&self) -> bool {
        self.customers == 0 && self.tables == 0 && self.reservations == 0
    }
}

/// Repository for owner database operations.
#[derive(Debug, Clone)]
pub struct OwnerRepository {
    pool: SqlitePool,
}

impl OwnerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OwnerRepository { pool }
    }

    /// Creates an owner and its implicit customer.
    ///
    /// ## Errors
    /// * `DbError::Validation` - bad username/email, or username taken
    pub async fn provision(&self, username: &str, email: &str) -> DbResult<Owner> {
        let mut errors = ValidationErrors::new();
        let username = errors.check("username", validate_customer_name(username));
        let email = errors.check("email", validate_email(email));
        let (Some(username), Some(email)) = (username, email) else {
            return Err(errors.into());
        };

        let now = Utc::now();
        let owner = Owner {
            id: Uuid::new_v4().to_string(),
            username,
            email,
            created_at: now,
        };

        debug!(id = %owner.id, username = %owner.username, "Provisioning owner");

        let mut tx = begin_write(&self.pool).await?;

        let taken: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM owners WHERE username = ?1")
            .bind(&owner.username)
            .fetch_one(&mut *tx)
            .await?;
        if taken > 0 {
            return Err(username_taken(&owner.username));
        }

        sqlx::query(
            r#"
            INSERT INTO owners (id, username, email, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&owner.id)
        .bind(&owner.username)
        .bind(&owner.email)
        .bind(owner.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                username_taken(&owner.username)
            } else {
                DbError::from(e)
            }
        })?;

        sqlx::query(
            r#"
            INSERT INTO customers (id, owner_id, name, email, phone, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, '', ?5, ?5)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&owner.id)
        .bind(&owner.username)
        .bind(&owner.email)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(id = %owner.id, "Owner provisioned");
        Ok(owner)
    }

    /// Gets an owner by ID.
    pub async fn get(&self, id: &str) -> DbResult<Owner> {
        sqlx::query_as::<_, Owner>(
            "SELECT id, username, email, created_at FROM owners WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Owner", id))
    }

    /// Finds an owner by username.
    pub async fn find_by_username(&self, username: &str) -> DbResult<Option<Owner>> {
        let owner = sqlx::query_as::<_, Owner>(
            "SELECT id, username, email, created_at FROM owners WHERE username = ?1",
        )
        .bind(username.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(owner)
    }

    /// Counts the owner's customers, tables and reservations.
    pub async fn counts(&self, ctx: &OwnerContext) -> DbResult<OwnerCounts> {
        let (customers, tables, reservations): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM customers WHERE owner_id = ?1),
                (SELECT COUNT(*) FROM dining_tables WHERE owner_id = ?1),
                (SELECT COUNT(*) FROM reservations WHERE owner_id = ?1)
            "#,
        )
        .bind(&ctx.owner_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(OwnerCounts {
            customers: customers.max(0) as u64,
            tables: tables.max(0) as u64,
            reservations: reservations.max(0) as u64,
        })
    }

    /// Deletes the owner's reservations, tables and customers, keeping the
    /// owner's implicit customer.
    ///
    /// ## Returns
    /// What was removed.
    pub async fn clear_data(&self, ctx: &OwnerContext) -> DbResult<OwnerCounts> {
        info!(owner_id = %ctx.owner_id, "Clearing owner data");

        let mut tx = begin_write(&self.pool).await?;

        let reservations = sqlx::query("DELETE FROM reservations WHERE owner_id = ?1")
            .bind(&ctx.owner_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let tables = sqlx::query("DELETE FROM dining_tables WHERE owner_id = ?1")
            .bind(&ctx.owner_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let customers = sqlx::query(
            r#"
            DELETE FROM customers
            WHERE owner_id = ?1
            AND email <> (SELECT email FROM owners WHERE id = ?1)
            "#,
        )
        .bind(&ctx.owner_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        Ok(OwnerCounts {
            customers,
            tables,
            reservations,
        })
    }
}

fn username_taken(username: &str) -> DbError {
    ValidationErrors::single(
        "username",
        ValidationError::UniquenessViolation {
            value: username.to_string(),
        },
    )
    .into()
}

// =============================================================================
// Unit Tests
// =============================================================================
