//! # Reservation Repository
//!
//! Booking writes run validate-then-write inside one transaction.
//!
//! ## Create / Update Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN IMMEDIATE  (write lock held from the first read)                 │
//! │    │                                                                    │
//! │    ├── load previous row (update only, owner-scoped) ─► NotFound        │
//! │    ├── load customer + table by id (any owner)       ─► NotFound        │
//! │    ├── load slot holders (table_id, date, time)                         │
//! │    ├── ReservationValidator::validate                ─► Validation      │
//! │    ├── INSERT / UPDATE                                                  │
//! │    │     └── idx_reservations_live_slot violated     ─► SlotConflict    │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Writers queue on the SQLite write lock, so a request that loses a race
//! for a slot reads the winner's committed row and its validator reports
//! `SlotConflict`. The partial unique index stays as the last guard against
//! writers that skip this path; its violation maps to the same
//! `SlotConflict`. Nothing is retried.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use tablebook_core::availability::is_available;
use tablebook_core::{
    normalize_notes, BookingPolicy, Clock, NewReservation, OwnerContext, Reservation,
    ReservationCandidate, ReservationStatus, ReservationUpdate, ReservationValidator, Slot,
    ValidationError, ValidationErrors,
};

use crate::error::{is_unique_violation, DbError, DbResult};
use crate::repository::{begin_write, customer, table};

const RESERVATION_COLUMNS: &str =
    "id, owner_id, date, time, customer_id, table_id, status, notes, created_at, updated_at";

/// Optional filters for [`ReservationRepository::list`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationFilter {
    pub date: Option<NaiveDate>,
    pub status: Option<ReservationStatus>,
    pub customer_id: Option<String>,
    pub table_id: Option<String>,
}

/// Repository for reservation database operations.
#[derive(Debug, Clone)]
pub struct ReservationRepository {
    pool: SqlitePool,
    policy: BookingPolicy,
    clock: Arc<dyn Clock>,
}

impl ReservationRepository {
    pub fn new(pool: SqlitePool, policy: BookingPolicy, clock: Arc<dyn Clock>) -> Self {
        ReservationRepository {
            pool,
            policy,
            clock,
        }
    }

    /// Lists the owner's reservations, latest date and time first.
    pub async fn list(
        &self,
        ctx: &OwnerContext,
        filter: &ReservationFilter,
    ) -> DbResult<Vec<Reservation>> {
        let sql = format!(
            r#"
            SELECT {RESERVATION_COLUMNS} FROM reservations
            WHERE owner_id = ?1
            AND (?2 IS NULL OR date = ?2)
            AND (?3 IS NULL OR status = ?3)
            AND (?4 IS NULL OR customer_id = ?4)
            AND (?5 IS NULL OR table_id = ?5)
            ORDER BY date DESC, time DESC, created_at DESC
            "#
        );
        let reservations = sqlx::query_as::<_, Reservation>(&sql)
            .bind(&ctx.owner_id)
            .bind(filter.date)
            .bind(filter.status)
            .bind(filter.customer_id.as_deref())
            .bind(filter.table_id.as_deref())
            .fetch_all(&self.pool)
            .await?;

        debug!(owner_id = %ctx.owner_id, count = reservations.len(), "Listed reservations");
        Ok(reservations)
    }

    /// Gets one of the owner's reservations.
    pub async fn get(&self, ctx: &OwnerContext, id: &str) -> DbResult<Reservation> {
        let mut conn = self.pool.acquire().await?;
        fetch_scoped(&mut conn, ctx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Reservation", id))
    }

    /// Books a table. New reservations start pending.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - customer or table id does not exist
    /// * `DbError::Validation` - any reservation rule failed, including a
    ///   `SlotConflict` lost to a concurrent booking
    pub async fn create(&self, ctx: &OwnerContext, input: &NewReservation) -> DbResult<Reservation> {
        let now = Utc::now();
        let proposed = Reservation {
            id: Uuid::new_v4().to_string(),
            owner_id: ctx.owner_id.clone(),
            date: input.date,
            time: input.time,
            customer_id: input.customer_id.clone(),
            table_id: input.table_id.clone(),
            status: ReservationStatus::Pending,
            notes: input.notes.as_deref().and_then(normalize_notes),
            created_at: now,
            updated_at: now,
        };

        debug!(
            id = %proposed.id,
            table_id = %proposed.table_id,
            date = %proposed.date,
            time = %proposed.time,
            "Creating reservation"
        );

        let mut tx = begin_write(&self.pool).await?;

        let table_number = self.check(&mut tx, ctx, &proposed, None).await?;

        sqlx::query(
            r#"
            INSERT INTO reservations (
                id, owner_id, date, time, customer_id, table_id,
                status, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&proposed.id)
        .bind(&proposed.owner_id)
        .bind(proposed.date)
        .bind(proposed.time)
        .bind(&proposed.customer_id)
        .bind(&proposed.table_id)
        .bind(proposed.status)
        .bind(&proposed.notes)
        .bind(proposed.created_at)
        .bind(proposed.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_slot_conflict(e, table_number, &proposed))?;

        tx.commit().await?;
        Ok(proposed)
    }

    /// Applies a partial update.
    ///
    /// Date and time rules only re-run for the fields that change, so a
    /// past reservation can still be confirmed, completed or cancelled.
    pub async fn update(
        &self,
        ctx: &OwnerContext,
        id: &str,
        patch: &ReservationUpdate,
    ) -> DbResult<Reservation> {
        let mut tx = begin_write(&self.pool).await?;

        let existing = fetch_scoped(&mut tx, ctx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Reservation", id))?;

        let mut proposed = patch.apply_to(&existing);
        proposed.updated_at = Utc::now();

        debug!(id = %id, status = %proposed.status, "Updating reservation");

        let table_number = self.check(&mut tx, ctx, &proposed, Some(&existing)).await?;

        sqlx::query(
            r#"
            UPDATE reservations
            SET date = ?1, time = ?2, customer_id = ?3, table_id = ?4,
                status = ?5, notes = ?6, updated_at = ?7
            WHERE id = ?8 AND owner_id = ?9
            "#,
        )
        .bind(proposed.date)
        .bind(proposed.time)
        .bind(&proposed.customer_id)
        .bind(&proposed.table_id)
        .bind(proposed.status)
        .bind(&proposed.notes)
        .bind(proposed.updated_at)
        .bind(id)
        .bind(&ctx.owner_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_slot_conflict(e, table_number, &proposed))?;

        tx.commit().await?;
        Ok(proposed)
    }

    /// Moves a reservation to `status`.
    pub async fn set_status(
        &self,
        ctx: &OwnerContext,
        id: &str,
        status: ReservationStatus,
    ) -> DbResult<Reservation> {
        self.update(ctx, id, &ReservationUpdate::status(status)).await
    }

    /// Deletes a reservation.
    pub async fn delete(&self, ctx: &OwnerContext, id: &str) -> DbResult<()> {
        let deleted = sqlx::query("DELETE FROM reservations WHERE id = ?1 AND owner_id = ?2")
            .bind(id)
            .bind(&ctx.owner_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(DbError::not_found("Reservation", id));
        }

        debug!(id = %id, "Deleted reservation");
        Ok(())
    }

    /// Whether the slot is free among the owner's reservations.
    ///
    /// A table id the owner does not have reports `true`: no visible
    /// reservation holds it.
    pub async fn check_availability(
        &self,
        ctx: &OwnerContext,
        table_id: &str,
        date: NaiveDate,
        time: NaiveTime,
        exclude_id: Option<&str>,
    ) -> DbResult<bool> {
        let slot = Slot {
            table_id: table_id.to_string(),
            date,
            time,
        };

        let sql = format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations \
             WHERE owner_id = ?1 AND table_id = ?2 AND date = ?3 AND time = ?4"
        );
        let holders = sqlx::query_as::<_, Reservation>(&sql)
            .bind(&ctx.owner_id)
            .bind(&slot.table_id)
            .bind(slot.date)
            .bind(slot.time)
            .fetch_all(&self.pool)
            .await?;

        Ok(is_available(&holders, &slot, exclude_id))
    }

    /// Loads what the validator needs and runs it.
    ///
    /// ## Returns
    /// The table's number, for the conflict message if the write loses a race.
    async fn check(
        &self,
        conn: &mut SqliteConnection,
        ctx: &OwnerContext,
        proposed: &Reservation,
        previous: Option<&Reservation>,
    ) -> DbResult<u32> {
        let customer = customer::fetch_any(conn, &proposed.customer_id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", &proposed.customer_id))?;
        let table = table::fetch_any(conn, &proposed.table_id)
            .await?
            .ok_or_else(|| DbError::not_found("Table", &proposed.table_id))?;
        let holders = slot_holders(conn, &proposed.slot()).await?;

        let candidate = ReservationCandidate {
            owner: ctx,
            proposed,
            customer: &customer,
            table: &table,
            previous,
        };

        let today = self.clock.today();
        if let Err(errors) = ReservationValidator::new(&self.policy, today).validate(&candidate, &holders) {
            warn!(
                owner_id = %ctx.owner_id,
                reservation_id = %proposed.id,
                errors = %errors,
                "Reservation rejected"
            );
            return Err(errors.into());
        }

        Ok(table.table_number)
    }
}

// =============================================================================
// Connection-level helpers
// =============================================================================

async fn fetch_scoped(
    conn: &mut SqliteConnection,
    ctx: &OwnerContext,
    id: &str,
) -> DbResult<Option<Reservation>> {
    let sql =
        format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = ?1 AND owner_id = ?2");
    let reservation = sqlx::query_as::<_, Reservation>(&sql)
        .bind(id)
        .bind(&ctx.owner_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(reservation)
}

/// Every reservation on the slot, cancelled ones included.
async fn slot_holders(conn: &mut SqliteConnection, slot: &Slot) -> DbResult<Vec<Reservation>> {
    let sql = format!(
        "SELECT {RESERVATION_COLUMNS} FROM reservations \
         WHERE table_id = ?1 AND date = ?2 AND time = ?3"
    );
    let holders = sqlx::query_as::<_, Reservation>(&sql)
        .bind(&slot.table_id)
        .bind(slot.date)
        .bind(slot.time)
        .fetch_all(&mut *conn)
        .await?;
    Ok(holders)
}

/// Turns a live-slot index violation into the validator's `SlotConflict`.
fn map_slot_conflict(err: sqlx::Error, table_number: u32, proposed: &Reservation) -> DbError {
    if is_unique_violation(&err) {
        warn!(
            table_id = %proposed.table_id,
            date = %proposed.date,
            time = %proposed.time,
            "Slot taken by a concurrent booking"
        );
        ValidationErrors::single(
            "table",
            ValidationError::SlotConflict {
                table_number,
                date: proposed.date,
                time: proposed.time,
            },
        )
        .into()
    } else {
        DbError::from(err)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
