//! Connection pool settings for the PostgreSQL store.

use std::env;
use std::str::FromStr;

use crate::tournament::{TournamentError, TournamentResult};

/// Pool settings for [`Database`](super::Database)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub database_url: String,

    /// Upper bound on pooled connections
    pub max_connections: u32,

    /// Connections kept open while idle
    pub min_connections: u32,

    /// Seconds to wait when acquiring a connection
    pub connection_timeout_secs: u64,

    /// Seconds before an unused connection is dropped
    pub idle_timeout_secs: u64,

    /// Seconds before any connection is recycled
    pub max_lifetime_secs: u64,
}

fn var_or<T: FromStr>(name: &str, default: T) -> TournamentResult<T> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| TournamentError::Configuration(format!("{name} is not valid: {raw}"))),
        Err(_) => Ok(default),
    }
}

impl DatabaseConfig {
    /// Read `DATABASE_URL` plus the pool settings of [`with_url`](Self::with_url).
    ///
    /// A missing URL is a configuration error rather than a fallback to the
    /// development database.
    pub fn from_env() -> TournamentResult<Self> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| TournamentError::Configuration("DATABASE_URL must be set".to_string()))?;
        Self::with_url(database_url)
    }

    /// Pool settings from the environment around an explicit URL
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `DB_MAX_CONNECTIONS` | 10 |
    /// | `DB_MIN_CONNECTIONS` | 1 |
    /// | `DB_CONNECTION_TIMEOUT` | 10 |
    /// | `DB_IDLE_TIMEOUT` | 600 |
    /// | `DB_MAX_LIFETIME` | 1800 |
    ///
    /// Unparsable values are errors; unset ones take the default.
    pub fn with_url(database_url: impl Into<String>) -> TournamentResult<Self> {
        let config = Self {
            database_url: database_url.into(),
            max_connections: var_or("DB_MAX_CONNECTIONS", 10)?,
            min_connections: var_or("DB_MIN_CONNECTIONS", 1)?,
            connection_timeout_secs: var_or("DB_CONNECTION_TIMEOUT", 10)?,
            idle_timeout_secs: var_or("DB_IDLE_TIMEOUT", 600)?,
            max_lifetime_secs: var_or("DB_MAX_LIFETIME", 1800)?,
        };

        if config.min_connections > config.max_connections {
            return Err(TournamentError::Configuration(format!(
                "DB_MIN_CONNECTIONS ({}) exceeds DB_MAX_CONNECTIONS ({})",
                config.min_connections, config.max_connections
            )));
        }
        Ok(config)
    }

    /// Local `darts_db` database with small pool limits
    pub fn development() -> Self {
        Self {
            database_url: "postgres://postgres@localhost/darts_db".to_string(),
            max_connections: 10,
            min_connections: 1,
            connection_timeout_secs: 10,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::development()
    }
}
