//! # Customer Repository
//!
//! Database operations for customers.
//!
//! ## Key Operations
//! - Owner-scoped CRUD
//! - Email uniqueness per owner (case-insensitive, stored lowercased)
//! - Delete cascades to the customer's reservations, in one transaction

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use tablebook_core::validation::{validate_customer_update, validate_new_customer};
use tablebook_core::{
    Customer, CustomerUpdate, NewCustomer, OwnerContext, ValidationError, ValidationErrors,
};

use crate::error::{is_unique_violation, DbError, DbResult};
use crate::repository::begin_write;

const CUSTOMER_COLUMNS: &str = "id, owner_id, name, email, phone, created_at, updated_at";

/// Repository for customer database operations.
///
/// ## Usage
/// ```rust,ignore
/// let customer = db.customers().create(&ctx, &input).await?;
/// let all = db.customers().list(&ctx).await?;
/// ```
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Lists the owner's customers, newest first.
    pub async fn list(&self, ctx: &OwnerContext) -> DbResult<Vec<Customer>> {
        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE owner_id = ?1 \
             ORDER BY created_at DESC, rowid DESC"
        );
        let customers = sqlx::query_as::<_, Customer>(&sql)
            .bind(&ctx.owner_id)
            .fetch_all(&self.pool)
            .await?;

        debug!(owner_id = %ctx.owner_id, count = customers.len(), "Listed customers");
        Ok(customers)
    }

    /// Gets one of the owner's customers.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - No such customer, or another owner's
    pub async fn get(&self, ctx: &OwnerContext, id: &str) -> DbResult<Customer> {
        let mut conn = self.pool.acquire().await?;
        fetch_scoped(&mut conn, ctx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", id))
    }

    /// Creates a customer.
    ///
    /// ## Errors
    /// * `DbError::Validation` - bad fields, or email already used by this owner
    pub async fn create(&self, ctx: &OwnerContext, input: &NewCustomer) -> DbResult<Customer> {
        let input = validate_new_customer(input)?;
        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            owner_id: ctx.owner_id.clone(),
            name: input.name,
            email: input.email,
            phone: input.phone,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %customer.id, owner_id = %ctx.owner_id, "Creating customer");

        let mut tx = begin_write(&self.pool).await?;

        if email_in_use(&mut tx, ctx, &customer.email, None).await? {
            return Err(email_taken(&customer.email));
        }

        sqlx::query(
            r#"
            INSERT INTO customers (id, owner_id, name, email, phone, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.owner_id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_email_conflict(e, &customer.email))?;

        tx.commit().await?;
        Ok(customer)
    }

    /// Applies a partial update.
    pub async fn update(
        &self,
        ctx: &OwnerContext,
        id: &str,
        patch: &CustomerUpdate,
    ) -> DbResult<Customer> {
        let patch = validate_customer_update(patch)?;

        let mut tx = begin_write(&self.pool).await?;

        let existing = fetch_scoped(&mut tx, ctx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", id))?;

        let updated = Customer {
            name: patch.name.unwrap_or_else(|| existing.name.clone()),
            email: patch.email.unwrap_or_else(|| existing.email.clone()),
            phone: patch.phone.unwrap_or_else(|| existing.phone.clone()),
            updated_at: Utc::now(),
            ..existing.clone()
        };

        if updated.email != existing.email
            && email_in_use(&mut tx, ctx, &updated.email, Some(id)).await?
        {
            return Err(email_taken(&updated.email));
        }

        debug!(id = %id, "Updating customer");

        sqlx::query(
            r#"
            UPDATE customers
            SET name = ?1, email = ?2, phone = ?3, updated_at = ?4
            WHERE id = ?5 AND owner_id = ?6
            "#,
        )
        .bind(&updated.name)
        .bind(&updated.email)
        .bind(&updated.phone)
        .bind(updated.updated_at)
        .bind(id)
        .bind(&ctx.owner_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_email_conflict(e, &updated.email))?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Deletes a customer and every reservation referencing it.
    ///
    /// ## Returns
    /// Number of reservations removed with the customer.
    pub async fn delete(&self, ctx: &OwnerContext, id: &str) -> DbResult<u64> {
        let mut tx = begin_write(&self.pool).await?;

        if fetch_scoped(&mut tx, ctx, id).await?.is_none() {
            return Err(DbError::not_found("Customer", id));
        }

        let removed = sqlx::query("DELETE FROM reservations WHERE customer_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM customers WHERE id = ?1 AND owner_id = ?2")
            .bind(id)
            .bind(&ctx.owner_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(id = %id, reservations = removed, "Deleted customer");
        Ok(removed)
    }
}

// =============================================================================
// Connection-level helpers (shared with the reservation repository)
// =============================================================================

/// Loads a customer regardless of owner.
pub(crate) async fn fetch_any(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Customer>> {
    let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1");
    let customer = sqlx::query_as::<_, Customer>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(customer)
}

async fn fetch_scoped(
    conn: &mut SqliteConnection,
    ctx: &OwnerContext,
    id: &str,
) -> DbResult<Option<Customer>> {
    let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1 AND owner_id = ?2");
    let customer = sqlx::query_as::<_, Customer>(&sql)
        .bind(id)
        .bind(&ctx.owner_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(customer)
}

async fn email_in_use(
    conn: &mut SqliteConnection,
    ctx: &OwnerContext,
    email: &str,
    exclude_id: Option<&str>,
) -> DbResult<bool> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM customers
        WHERE owner_id = ?1 AND email = ?2 AND (?3 IS NULL OR id <> ?3)
        "#,
    )
    .bind(&ctx.owner_id)
    .bind(email)
    .bind(exclude_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count > 0)
}

fn email_taken(email: &str) -> DbError {
    ValidationErrors::single(
        "email",
        ValidationError::UniquenessViolation {
            value: email.to_string(),
        },
    )
    .into()
}

fn map_email_conflict(err: sqlx::Error, email: &str) -> DbError {
    if is_unique_violation(&err) {
        email_taken(email)
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

    fn input(name: &str, email: &str) -> NewCustomer {
        NewCustomer {
            name: name.to_string(),
            email: email.to_string(),
            phone: "+56 9 1234 5678".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_normalizes_fields() {
        let (db, ctx) = setup().await;

        let customer = db
            .customers()
            .create(&ctx, &input("  Ana Pérez ", "Ana@Mail.CL"))
            .await
            .unwrap();

        assert_eq!(customer.name, "Ana Pérez");
        assert_eq!(customer.email, "ana@mail.cl");
        assert_eq!(customer.phone, "+56912345678");
        assert_eq!(db.customers().get(&ctx, &customer.id).await.unwrap(), customer);
    }

    #[tokio::test]
    async fn test_duplicate_email_per_owner() {
        let (db, ctx) = setup().await;
        db.customers().create(&ctx, &input("Ana", "ana@mail.cl")).await.unwrap();

        let err = db
            .customers()
            .create(&ctx, &input("Ana Bis", "ANA@mail.cl"))
            .await
            .unwrap_err();
        let errors = err.validation_errors().unwrap();
        assert_eq!(
            errors.for_field("email").collect::<Vec<_>>(),
            vec![&ValidationError::UniquenessViolation {
                value: "ana@mail.cl".to_string()
            }]
        );

        // Another owner may reuse the address
        let other = db.owners().provision("owner_two", "two@resto.cl").await.unwrap();
        assert!(db
            .customers()
            .create(&other.context(), &input("Ana", "ana@mail.cl"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_invalid_fields_collected() {
        let (db, ctx) = setup().await;
        let bad = NewCustomer {
            name: "A".to_string(),
            email: "nope".to_string(),
            phone: "123".to_string(),
        };
        let err = db.customers().create(&ctx, &bad).await.unwrap_err();
        assert_eq!(err.validation_errors().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_list_is_scoped_and_newest_first() {
        let (db, ctx) = setup().await;
        let first = db.customers().create(&ctx, &input("Ana", "ana@mail.cl")).await.unwrap();
        let second = db.customers().create(&ctx, &input("Beto", "beto@mail.cl")).await.unwrap();

        let other = db.owners().provision("owner_two", "two@resto.cl").await.unwrap();
        db.customers()
            .create(&other.context(), &input("Carla", "carla@mail.cl"))
            .await
            .unwrap();

        let ids: Vec<String> = db
            .customers()
            .list(&ctx)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(ids[0], second.id);
        assert_eq!(ids[1], first.id);
    }

    #[tokio::test]
    async fn test_other_owner_sees_not_found() {
        let (db, ctx) = setup().await;
        let customer = db.customers().create(&ctx, &input("Ana", "ana@mail.cl")).await.unwrap();
        let other = db.owners().provision("owner_two", "two@resto.cl").await.unwrap();

        let err = db.customers().get(&other.context(), &customer.id).await.unwrap_err();
        assert!(err.is_not_found());
        let err = db.customers().delete(&other.context(), &customer.id).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_patch_and_email_conflict() {
        let (db, ctx) = setup().await;
        let ana = db.customers().create(&ctx, &input("Ana", "ana@mail.cl")).await.unwrap();
        db.customers().create(&ctx, &input("Beto", "beto@mail.cl")).await.unwrap();

        let renamed = db
            .customers()
            .update(
                &ctx,
                &ana.id,
                &CustomerUpdate {
                    name: Some("Ana María".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Ana María");
        assert_eq!(renamed.email, "ana@mail.cl");

        let err = db
            .customers()
            .update(
                &ctx,
                &ana.id,
                &CustomerUpdate {
                    email: Some("Beto@mail.cl".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(err
            .validation_errors()
            .unwrap()
            .contains(|e| matches!(e, ValidationError::UniquenessViolation { .. })));
    }
}
