//! Connection pool management, grounded in the teacher's
//! `storage::database::SqlitePool` (sqlite-only here: spec's Non-goals leave
//! the store engine unspecified and sqlite is sufficient for the
//! transactional contract of §4.1).

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous};
use sqlx::{Pool, Sqlite, Transaction};
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::error::{CellarError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout_secs: u64,
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 10,
            connection_timeout_secs: 30,
            run_migrations: true,
        }
    }
}

impl DatabaseConfig {
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(CellarError::validation("database url cannot be empty"));
        }
        if self.max_connections == 0 {
            return Err(CellarError::validation(
                "max_connections must be greater than 0",
            ));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct Db {
    pool: Pool<Sqlite>,
}

impl Db {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        config.validate()?;
        info!(url = %config.url, "connecting to sqlite pool");

        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| CellarError::internal(format!("invalid database url: {e}")))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(config.connection_timeout_secs))
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        let db = Self { pool };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| CellarError::internal(format!("migration failed: {e}")))?;
        Ok(())
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Implements `withTransaction` (§4.1): runs `f` against a single
    /// transaction, committing on `Ok` and rolling back on `Err`.
    pub async fn with_transaction<'a, F, Fut, T>(&'a self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Transaction<'a, Sqlite>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut tx = self.pool.begin().await?;
        match f(&mut tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                let _ = tx.rollback().await;
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_pool_connects_and_migrates() {
        let db = Db::connect(&DatabaseConfig::default()).await.unwrap();
        assert!(db.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn transaction_rolls_back_on_error() {
        let db = Db::connect(&DatabaseConfig::default()).await.unwrap();
        let result: Result<()> = db
            .with_transaction(|tx| {
                Box::pin(async move {
                    sqlx::query("INSERT INTO suppliers (id, name, active, rating) VALUES ('s1', 'Test', 1, 5)")
                        .execute(&mut **tx)
                        .await?;
                    Err(CellarError::internal("forced failure"))
                })
            })
            .await;
        assert!(result.is_err());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM suppliers")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
