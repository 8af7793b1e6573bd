//! # tablebook-db: Database Layer for Tablebook
//!
//! SQLite storage for owners, customers, tables and reservations, plus the
//! transactions that run the booking rules from `tablebook-core`.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tablebook Data Flow                              │
//! │                                                                         │
//! │  Web handler (create_reservation, stats_overview, ...)                 │
//! │       │   + OwnerContext                                                │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  tablebook-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐ │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │ │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │ │   │
//! │  │   │               │    │ OwnerRepo      │    │              │ │   │
//! │  │   │ SqlitePool    │◄───│ CustomerRepo   │    │ 001_initial  │ │   │
//! │  │   │ BookingPolicy │    │ TableRepo      │    │ _schema.sql  │ │   │
//! │  │   │ Clock         │    │ ReservationRepo│    │              │ │   │
//! │  │   │               │    │ StatsRepo      │    │              │ │   │
//! │  │   └───────────────┘    └───────┬────────┘    └──────────────┘ │   │
//! │  │                                │ validate / aggregate          │   │
//! │  │                                ▼                               │   │
//! │  │                       tablebook-core                           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │                  $TABLEBOOK_DATABASE_PATH                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`config`] - Environment configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Owner-scoped repositories
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tablebook_db::{AppConfig, Database};
//!
//! let config = AppConfig::from_env()?;
//! let db = Database::from_app_config(&config).await?;
//!
//! let owner = db.owners().provision("trattoria", "chef@trattoria.cl").await?;
//! let ctx = owner.context();
//!
//! let reservation = db.reservations().create(&ctx, &input).await?;
//! let overview = db.stats().overview(&ctx).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{AppConfig, ConfigError};
pub use error::{DbError, DbResult};
pub use migrations::MigrationStatus;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::customer::CustomerRepository;
pub use repository::owner::{OwnerCounts, OwnerRepository};
pub use repository::reservation::{ReservationFilter, ReservationRepository};
pub use repository::stats::StatsRepository;
pub use repository::table::TableRepository;
