//! # Database Error Types
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sqlx::Error                      ValidationErrors (tablebook-core)     │
//! │       │                                  │                              │
//! │       │  From<sqlx::Error>               │  #[from]                     │
//! │       ▼                                  ▼                              │
//! │  ┌──────────────────────────────────────────────────────────────┐      │
//! │  │ DbError                                                      │      │
//! │  │   NotFound ─────────────► web layer 404                      │      │
//! │  │   Validation ───────────► web layer 400 { field, code, msg } │      │
//! │  │   Constraint / Conn ... ► web layer 500                      │      │
//! │  └──────────────────────────────────────────────────────────────┘      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repositories claim the unique violations they expect (email, table
//! number, live slot) and turn them into `Validation`. Whatever reaches
//! `UniqueViolation` is a constraint nobody anticipated.

use tablebook_core::ValidationErrors;
use thiserror::Error;

const UNIQUE_FAILED: &str = "UNIQUE constraint failed: ";
const FOREIGN_KEY_FAILED: &str = "FOREIGN KEY constraint failed";

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found, or not visible to the caller's owner.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// One or more business rules rejected the write.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// Unclaimed UNIQUE failure; `columns` as SQLite reports them
    /// (`customers.owner_id, customers.email`).
    #[error("Duplicate value for {columns}")]
    UniqueViolation { columns: String },

    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// The database file can't be opened, or the pool is closed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// No connection freed up within the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// The rule failures, when this is a validation error.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            DbError::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound { .. })
    }
}

/// Whether `err` is a UNIQUE constraint failure.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.is_unique_violation() || db_err.message().starts_with(UNIQUE_FAILED)
        }
        _ => false,
    }
}

/// ## Mapping
/// ```text
/// RowNotFound                 → NotFound
/// Database, UNIQUE            → UniqueViolation { columns }
/// Database, FOREIGN KEY       → ForeignKeyViolation
/// Database, anything else     → QueryFailed
/// PoolTimedOut                → PoolExhausted
/// PoolClosed                  → ConnectionFailed
/// other                       → Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        if is_unique_violation(&err) {
            let columns = match &err {
                sqlx::Error::Database(db_err) => db_err
                    .message()
                    .strip_prefix(UNIQUE_FAILED)
                    .unwrap_or("unknown")
                    .to_string(),
                _ => "unknown".to_string(),
            };
            return DbError::UniqueViolation { columns };
        }

        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                if db_err.is_foreign_key_violation()
                    || db_err.message().starts_with(FOREIGN_KEY_FAILED)
                {
                    DbError::ForeignKeyViolation {
                        message: db_err.message().to_string(),
                    }
                } else {
                    DbError::QueryFailed(db_err.message().to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),

            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
