//! Storage for tournaments, matches, boards and the player roster.
//!
//! The engine talks to storage through the traits in [`repository`].
//! [`MemoryStore`] keeps everything in process; [`PgStore`] persists to
//! PostgreSQL through the pool managed by [`Database`].

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::tournament::TournamentResult;

pub mod config;
pub mod memory;
pub mod postgres;
pub mod repository;

pub use config::DatabaseConfig;
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use repository::{
    BatchRepository, BoardRepository, MatchRepository, PlayerRepository, Store,
    TournamentRepository, WriteBatch,
};

/// Shared PostgreSQL pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Open the pool and wait for the first connection.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use darts_engine::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let config = DatabaseConfig::from_env()?;
    ///     let db = Database::new(&config).await?;
    ///     db.store().migrate().await?;
    ///     db.health_check().await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> TournamentResult<Self> {
        let seconds = Duration::from_secs;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(seconds(config.connection_timeout_secs))
            .idle_timeout(seconds(config.idle_timeout_secs))
            .max_lifetime(seconds(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Repository implementation sharing this pool
    pub fn store(&self) -> PgStore {
        PgStore::new(self.pool.clone())
    }

    /// Round-trip a trivial query
    pub async fn health_check(&self) -> TournamentResult<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }

    /// Wait for checked-out connections to return, then close them
    pub async fn close(self) {
        self.pool.close().await;
    }
}
