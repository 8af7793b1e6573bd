//! # Repository Module
//!
//! Owner-scoped database access for Tablebook.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Web handler                                                           │
//! │       │                                                                 │
//! │       │  db.reservations().create(&ctx, &input)                        │
//! │       ▼                                                                 │
//! │  ReservationRepository                                                 │
//! │  ├── BEGIN IMMEDIATE                                                   │
//! │  ├── load customer, table, slot holders                                │
//! │  ├── ReservationValidator::validate  (tablebook-core)                  │
//! │  ├── INSERT                                                            │
//! │  └── COMMIT                                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Every read filters on owner_id = ctx.owner_id. A row owned by         │
//! │  someone else looks exactly like a row that does not exist.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Write Transactions
//! Validate-then-write units open with `BEGIN IMMEDIATE`: the write lock is
//! taken before the first read, so concurrent writers queue on the busy
//! timeout and each validator sees every row committed ahead of it.
//!
//! ## Available Repositories
//!
//! - [`OwnerRepository`](owner::OwnerRepository) - Tenant provisioning
//! - [`CustomerRepository`](customer::CustomerRepository) - Customer CRUD
//! - [`TableRepository`](table::TableRepository) - Table CRUD
//! - [`ReservationRepository`](reservation::ReservationRepository) - Booking
//! - [`StatsRepository`](stats::StatsRepository) - Statistics

pub mod customer;
pub mod owner;
pub mod reservation;
pub mod stats;
pub mod table;

use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::DbResult;

/// Starts a transaction holding the database write lock.
pub(crate) async fn begin_write(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}
