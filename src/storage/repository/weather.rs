use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite};

use crate::domain::WeatherAnalysis;
use crate::error::Result;
use crate::storage::models::WeatherCacheRow;

/// Cached weather analyses keyed by `(region_token, year, vineyard_alias)`
/// (§3, §4.3 step 5). An empty alias is stored as `''` to participate in the
/// primary key; callers normalize `None` to that sentinel.
#[derive(Clone)]
pub struct WeatherCacheRepository {
    pool: Pool<Sqlite>,
}

impl WeatherCacheRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn get(
        &self,
        region_token: &str,
        year: i32,
        vineyard_alias: Option<&str>,
    ) -> Result<Option<WeatherAnalysis>> {
        let alias = vineyard_alias.unwrap_or("");
        let row = sqlx::query_as::<_, WeatherCacheRow>(
            "SELECT * FROM weather_cache
             WHERE region_token = ? AND year = ? AND vineyard_alias = ? AND expires_at > ?",
        )
        .bind(region_token)
        .bind(year as i64)
        .bind(alias)
        .bind(Utc::now().to_rfc3339())
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| r.into_domain()).transpose().map(|o| o.map(|e| e.payload))
    }

    /// Regional fallback: the most recent non-expired analysis for the
    /// region/year ignoring vineyard-level specificity, used when a
    /// vineyard-specific entry is absent (§4.3 step 4 region fallback).
    pub async fn get_region_fallback(
        &self,
        region_token: &str,
        year: i32,
    ) -> Result<Option<WeatherAnalysis>> {
        let row = sqlx::query_as::<_, WeatherCacheRow>(
            "SELECT * FROM weather_cache
             WHERE region_token = ? AND year = ? AND expires_at > ?
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(region_token)
        .bind(year as i64)
        .bind(Utc::now().to_rfc3339())
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| r.into_domain()).transpose().map(|o| o.map(|e| e.payload))
    }

    pub async fn upsert(
        &self,
        region_token: &str,
        year: i32,
        vineyard_alias: Option<&str>,
        payload: &WeatherAnalysis,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let alias = vineyard_alias.unwrap_or("");
        let payload_json = serde_json::to_string(payload)?;
        sqlx::query(
            "INSERT INTO weather_cache (region_token, year, vineyard_alias, payload, created_at, expires_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT (region_token, year, vineyard_alias) DO UPDATE SET
                payload = excluded.payload,
                created_at = excluded.created_at,
                expires_at = excluded.expires_at",
        )
        .bind(region_token)
        .bind(year as i64)
        .bind(alias)
        .bind(payload_json)
        .bind(Utc::now().to_rfc3339())
        .bind(expires_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn purge_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM weather_cache WHERE expires_at <= ?")
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
