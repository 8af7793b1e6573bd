//! # Database Handle
//!
//! Opens the SQLite pool and hands out the repositories.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  AppConfig::from_env()                                                  │
//! │       │  DbConfig          BookingPolicy                                │
//! │       ▼                         │                                       │
//! │  Database::new(DbConfig) ───────┼──► SqlitePool (WAL, foreign keys)     │
//! │       │                         │        │                              │
//! │       │  migrations::run        │        ▼                              │
//! │       ▼                         ▼    001_initial_schema ...             │
//! │  Database { pool, policy, clock }                                       │
//! │       │                                                                 │
//! │       ├── owners()        OwnerRepository                              │
//! │       ├── customers()     CustomerRepository                           │
//! │       ├── tables()        TableRepository                              │
//! │       ├── reservations()  ReservationRepository (policy + clock)       │
//! │       └── stats()         StatsRepository (clock)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repositories are cheap to build: each one clones the pool handle, which
//! is reference counted.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::{debug, info};

use tablebook_core::{BookingPolicy, Clock, SystemClock};

use crate::config::AppConfig;
use crate::error::{DbError, DbResult};
use crate::migrations::{self, MigrationStatus};
use crate::repository::customer::CustomerRepository;
use crate::repository::owner::OwnerRepository;
use crate::repository::reservation::ReservationRepository;
use crate::repository::stats::StatsRepository;
use crate::repository::table::TableRepository;

const IN_MEMORY: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Pool settings.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("./data/tablebook.db")
///     .max_connections(8)
///     .connect_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, created on first connect. `:memory:` for a private
    /// in-memory database.
    pub database_path: PathBuf,

    pub max_connections: u32,
    pub min_connections: u32,

    /// How long a caller waits for a free connection.
    pub connect_timeout: Duration,

    pub idle_timeout: Duration,

    /// Apply pending migrations while connecting.
    pub run_migrations: bool,
}

impl DbConfig {
    /// File-backed database with 5 connections and a 30s acquire timeout.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
        }
    }

    /// In-memory database for tests.
    ///
    /// Every connection to `:memory:` opens its own empty database, so the
    /// pool is pinned to a single connection that never idles out.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(3600),
            ..DbConfig::new(IN_MEMORY)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path == Path::new(IN_MEMORY)
    }

    /// SQLite options: foreign keys on, WAL for files, NORMAL sync.
    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        if self.is_in_memory() {
            let options = SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
            return Ok(options
                .journal_mode(SqliteJournalMode::Memory)
                .foreign_keys(true));
        }

        Ok(SqliteConnectOptions::new()
            .filename(&self.database_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(self.connect_timeout)
            .foreign_keys(true))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Pool plus the booking policy and clock the repositories judge by.
///
/// ## Usage in a Handler
/// ```rust,ignore
/// async fn create_reservation(
///     db: &Database,
///     ctx: OwnerContext,
///     input: NewReservation,
/// ) -> Result<Reservation, ApiError> {
///     Ok(db.reservations().create(&ctx, &input).await?)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    policy: BookingPolicy,
    clock: Arc<dyn Clock>,
}

impl Database {
    /// Connects, and migrates when `config.run_migrations` is set.
    ///
    /// Starts with [`BookingPolicy::default`] and the system clock.
    ///
    /// ## Errors
    /// * `DbError::ConnectionFailed` - the file can't be opened or created
    /// * `DbError::MigrationFailed` - a migration failed to apply
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening database");

        let options = config.connect_options()?;
        debug!(in_memory = config.is_in_memory(), "Connect options ready");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(max_connections = config.max_connections, "Database pool created");

        let db = Database {
            pool,
            policy: BookingPolicy::default(),
            clock: Arc::new(SystemClock),
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Opens the database described by `config` with its booking policy.
    pub async fn from_app_config(config: &AppConfig) -> DbResult<Self> {
        Ok(Database::new(config.db_config())
            .await?
            .with_policy(config.policy.clone()))
    }

    pub fn with_policy(mut self, policy: BookingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the clock.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let db = Database::new(DbConfig::in_memory())
    ///     .await?
    ///     .with_clock(FixedClock::on(date));
    /// ```
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    pub async fn migration_status(&self) -> DbResult<MigrationStatus> {
        migrations::migration_status(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn policy(&self) -> &BookingPolicy {
        &self.policy
    }

    /// Today's date according to the configured clock.
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn owners(&self) -> OwnerRepository {
        OwnerRepository::new(self.pool.clone())
    }

    pub fn customers(&self) -> CustomerRepository {
        CustomerRepository::new(self.pool.clone())
    }

    pub fn tables(&self) -> TableRepository {
        TableRepository::new(self.pool.clone())
    }

    /// Reservation writes, judged by this handle's policy and clock.
    pub fn reservations(&self) -> ReservationRepository {
        ReservationRepository::new(self.pool.clone(), self.policy.clone(), Arc::clone(&self.clock))
    }

    pub fn stats(&self) -> StatsRepository {
        StatsRepository::new(self.pool.clone(), Arc::clone(&self.clock))
    }

    /// Waits for checked-out connections and closes the pool. Later
    /// repository calls fail with `ConnectionFailed`.
    pub async fn close(&self) {
        info!("Closing database pool");
        self.pool.close().await;
    }

    /// Whether a trivial query succeeds.
    pub async fn health_check(&self) -> bool {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tablebook_core::FixedClock;

    #[tokio::test]
    async fn test_in_memory_database_is_migrated() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert!(db.health_check().await);
        let status = db.migration_status().await.unwrap();
        assert!(status.embedded >= 1);
        assert!(status.is_current());

        // Second run is a no-op
        db.run_migrations().await.unwrap();
        assert_eq!(db.migration_status().await.unwrap(), status);
    }

    #[tokio::test]
    async fn test_unmigrated_database_reports_pending() {
        let db = Database::new(DbConfig::in_memory().run_migrations(false))
            .await
            .unwrap();

        let status = db.migration_status().await.unwrap();
        assert_eq!(status.applied, 0);
        assert_eq!(status.pending(), status.embedded);
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/test.db")
            .max_connections(10)
            .min_connections(2)
            .connect_timeout(Duration::from_secs(3));

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }

    #[tokio::test]
    async fn test_closed_pool_fails_health_check() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.close().await;
        assert!(!db.health_check().await);
    }

    #[tokio::test]
    async fn test_clock_and_policy_overrides() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let policy = BookingPolicy {
            max_advance_days: 7,
            ..BookingPolicy::default()
        };
        let db = Database::new(DbConfig::in_memory())
            .await
            .unwrap()
            .with_clock(FixedClock::on(date))
            .with_policy(policy.clone());

        assert_eq!(db.today(), date);
        assert_eq!(db.policy(), &policy);
    }
}
