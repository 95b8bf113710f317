use chrono::{Duration, Utc};
use sqlx::{Pool, Sqlite};

use crate::error::Result;
use crate::storage::models::IdempotencyRow;

/// 24h-retention idempotency key store for agent tool invocations (§4.9
/// mutation protocol, §6). A hit on `(tool_name, idempotency_key, actor)`
/// replays the stored result instead of re-running the handler.
#[derive(Clone)]
pub struct IdempotencyRepository {
    pool: Pool<Sqlite>,
}

impl IdempotencyRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn lookup(
        &self,
        tool_name: &str,
        idempotency_key: &str,
        actor: &str,
    ) -> Result<Option<serde_json::Value>> {
        let row = sqlx::query_as::<_, IdempotencyRow>(
            "SELECT * FROM idempotency_records WHERE tool_name = ? AND idempotency_key = ? AND actor = ?",
        )
        .bind(tool_name)
        .bind(idempotency_key)
        .bind(actor)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(r) => Ok(Some(serde_json::from_str(&r.result_json)?)),
            None => Ok(None),
        }
    }

    pub async fn record(
        &self,
        tool_name: &str,
        idempotency_key: &str,
        actor: &str,
        result: &serde_json::Value,
    ) -> Result<()> {
        let result_json = serde_json::to_string(result)?;
        sqlx::query(
            "INSERT INTO idempotency_records (tool_name, idempotency_key, actor, result_json, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (tool_name, idempotency_key, actor) DO NOTHING",
        )
        .bind(tool_name)
        .bind(idempotency_key)
        .bind(actor)
        .bind(result_json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn purge_expired(&self) -> Result<u64> {
        let cutoff = Utc::now() - Duration::hours(24);
        let result = sqlx::query("DELETE FROM idempotency_records WHERE created_at <= ?")
            .bind(cutoff.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
