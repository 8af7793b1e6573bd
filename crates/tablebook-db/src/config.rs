//! Application configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! | Variable                       | Default          |
//! |--------------------------------|------------------|
//! | `TABLEBOOK_DATABASE_PATH`      | `./tablebook.db` |
//! | `TABLEBOOK_MAX_CONNECTIONS`    | `5`              |
//! | `TABLEBOOK_OPENING_HOUR`       | `12`             |
//! | `TABLEBOOK_CLOSING_HOUR`       | `23`             |
//! | `TABLEBOOK_SLOT_MINUTES`       | `30`             |
//! | `TABLEBOOK_MAX_ADVANCE_DAYS`   | `90`             |

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use tablebook_core::BookingPolicy;

use crate::pool::DbConfig;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub max_connections: u32,

    /// Opening hours, slot length and booking horizon
    pub policy: BookingPolicy,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// ## Example
    /// ```rust
    /// use tablebook_db::AppConfig;
    ///
    /// let config = AppConfig::from_lookup(|key| match key {
    ///     "TABLEBOOK_OPENING_HOUR" => Some("13".to_string()),
    ///     _ => None,
    /// })
    /// .unwrap();
    /// assert_eq!(config.policy.opening_hour, 13);
    /// assert_eq!(config.policy.closing_hour, 23);
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = BookingPolicy::default();

        let config = AppConfig {
            database_path: lookup("TABLEBOOK_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./tablebook.db")),

            max_connections: parse_or(&lookup, "TABLEBOOK_MAX_CONNECTIONS", 5)?,

            policy: BookingPolicy {
                opening_hour: parse_or(&lookup, "TABLEBOOK_OPENING_HOUR", defaults.opening_hour)?,
                closing_hour: parse_or(&lookup, "TABLEBOOK_CLOSING_HOUR", defaults.closing_hour)?,
                slot_minutes: parse_or(&lookup, "TABLEBOOK_SLOT_MINUTES", defaults.slot_minutes)?,
                max_advance_days: parse_or(
                    &lookup,
                    "TABLEBOOK_MAX_ADVANCE_DAYS",
                    defaults.max_advance_days,
                )?,
            },
        };

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue("TABLEBOOK_MAX_CONNECTIONS".to_string()));
        }

        let policy = &config.policy;
        if policy.closing_hour > 24 || policy.opening_hour >= policy.closing_hour {
            return Err(ConfigError::InvalidValue("TABLEBOOK_CLOSING_HOUR".to_string()));
        }
        if policy.slot_minutes == 0 || 60 % policy.slot_minutes != 0 {
            return Err(ConfigError::InvalidValue("TABLEBOOK_SLOT_MINUTES".to_string()));
        }

        Ok(config)
    }

    /// Pool configuration for [`crate::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path.clone()).max_connections(self.max_connections)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.database_path, PathBuf::from("./tablebook.db"));
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.policy, BookingPolicy::default());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("TABLEBOOK_DATABASE_PATH", "/tmp/tb.db"),
            ("TABLEBOOK_SLOT_MINUTES", "15"),
            ("TABLEBOOK_MAX_ADVANCE_DAYS", "30"),
        ])
        .unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/tb.db"));
        assert_eq!(config.policy.slot_minutes, 15);
        assert_eq!(config.policy.max_advance_days, 30);
        assert_eq!(config.db_config().database_path, PathBuf::from("/tmp/tb.db"));
    }

    #[test]
    fn test_unparsable_value_is_rejected() {
        let err = load(&[("TABLEBOOK_OPENING_HOUR", "noon")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key) if key == "TABLEBOOK_OPENING_HOUR"));
    }

    #[test]
    fn test_inconsistent_policy_is_rejected() {
        assert!(load(&[("TABLEBOOK_OPENING_HOUR", "23")]).is_err());
        assert!(load(&[("TABLEBOOK_SLOT_MINUTES", "0")]).is_err());
        assert!(load(&[("TABLEBOOK_SLOT_MINUTES", "25")]).is_err());
        assert!(load(&[("TABLEBOOK_MAX_CONNECTIONS", "0")]).is_err());
    }
}
