use std::str::FromStr;

use history::{RETENTION_WINDOW_DAYS, RetentionPolicy};

use crate::error::TrackerError;

#[derive(Clone, Debug)]
pub struct TrackerConfig {
    /// Database connection string. `None` keeps histories in process memory,
    /// which is only useful for replays and tests.
    pub database_url: Option<String>,

    /// Maximum span between the start anchor and the latest observation.
    ///
    /// Defaults to 180 days. Shrinking it on an existing database is safe:
    /// every history is re-anchored the next time its product is observed.
    pub retention: RetentionPolicy,

    /// Pool size for the SQL repository.
    pub db_max_connections: u32,

    /// Repository calls slower than this are reported on the `performance`
    /// target.
    pub slow_storage_ms: u64,

    /// Emit JSON logs (production) instead of the human-readable format.
    pub json_logs: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            retention: RetentionPolicy::default(),
            db_max_connections: 16,
            slow_storage_ms: 100,
            json_logs: false,
        }
    }
}

impl TrackerConfig {
    pub fn from_env() -> Result<Self, TrackerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source; unset keys keep their
    /// defaults, unparsable ones are rejected.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TrackerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let window_days = parse_or(&lookup, "RETENTION_WINDOW_DAYS", RETENTION_WINDOW_DAYS)?;
        let retention = RetentionPolicy::new(window_days).ok_or_else(|| {
            TrackerError::Config(format!(
                "RETENTION_WINDOW_DAYS must be at least 1, got {window_days}"
            ))
        })?;

        let db_max_connections =
            parse_or(&lookup, "DB_MAX_CONNECTIONS", defaults.db_max_connections)?;
        if db_max_connections == 0 {
            return Err(TrackerError::Config(
                "DB_MAX_CONNECTIONS must be positive".to_string(),
            ));
        }

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            retention,
            db_max_connections,
            slow_storage_ms: parse_or(&lookup, "SLOW_STORAGE_MS", defaults.slow_storage_ms)?,
            json_logs: lookup("APP_ENV").is_some_and(|env| env == "production"),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, TrackerError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| TrackerError::Config(format!("{key}={raw:?}: {e}"))),
    }
}
