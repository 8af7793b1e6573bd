//! # Database Migrations
//!
//! The schema lives in `migrations/sqlite/` at the workspace root and is
//! compiled into the binary.
//!
//! ```text
//! 001_initial_schema.sql
//!   owners ─┬─< customers      UNIQUE (owner_id, email)
//!           ├─< dining_tables  UNIQUE (owner_id, table_number), capacity 1..=20
//!           └─< reservations   UNIQUE (table_id, date, time) WHERE status <> 'cancelled'
//! ```
//!
//! Applied versions are tracked by sqlx in `_sqlx_migrations`. Ship schema
//! changes as a new `NNN_description.sql`; applied files are checksummed and
//! must not be edited.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// How far the database schema is behind the embedded migrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationStatus {
    pub embedded: usize,
    pub applied: usize,
}

impl MigrationStatus {
    pub fn pending(&self) -> usize {
        self.embedded.saturating_sub(self.applied)
    }

    pub fn is_current(&self) -> bool {
        self.pending() == 0
    }
}

/// Applies every embedded migration the database has not seen yet.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    let before = migration_status(pool).await?;
    if before.is_current() {
        debug!(applied = before.applied, "Schema up to date");
        return Ok(());
    }

    MIGRATOR.run(pool).await?;

    info!(applied = before.pending(), "Schema migrated");
    Ok(())
}

/// Compares the embedded migrations with the `_sqlx_migrations` ledger.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<MigrationStatus> {
    let ledger_exists: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?;

    let applied: i64 = if ledger_exists > 0 {
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await?
    } else {
        0
    };

    Ok(MigrationStatus {
        embedded: MIGRATOR.migrations.len(),
        applied: usize::try_from(applied).unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_never_underflows() {
        let status = MigrationStatus {
            embedded: 1,
            applied: 2,
        };
        assert_eq!(status.pending(), 0);
        assert!(status.is_current());

        let behind = MigrationStatus {
            embedded: 3,
            applied: 1,
        };
        assert_eq!(behind.pending(), 2);
        assert!(!behind.is_current());
    }
}
