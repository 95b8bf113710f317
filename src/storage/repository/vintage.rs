use chrono::Utc;
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::domain::Vintage;
use crate::error::Result;
use crate::storage::models::VintageRow;

#[derive(Clone)]
pub struct VintageRepository {
    pool: Pool<Sqlite>,
}

impl VintageRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Vintage>> {
        let row = sqlx::query_as::<_, VintageRow>("SELECT * FROM vintages WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| r.into_domain()).transpose()
    }

    pub async fn get_by_wine_year(&self, wine_id: Uuid, year: i32) -> Result<Option<Vintage>> {
        let row = sqlx::query_as::<_, VintageRow>(
            "SELECT * FROM vintages WHERE wine_id = ? AND year = ?",
        )
        .bind(wine_id.to_string())
        .bind(year as i64)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| r.into_domain()).transpose()
    }

    /// Creates the vintage on first inventory receipt (§3), idempotently.
    pub async fn get_or_create(&self, wine_id: Uuid, year: i32) -> Result<Vintage> {
        if let Some(existing) = self.get_by_wine_year(wine_id, year).await? {
            return Ok(existing);
        }
        let vintage = Vintage::new(wine_id, year);
        sqlx::query(
            "INSERT INTO vintages (id, wine_id, year, created_at) VALUES (?, ?, ?, ?)
             ON CONFLICT (wine_id, year) DO NOTHING",
        )
        .bind(vintage.id.to_string())
        .bind(wine_id.to_string())
        .bind(year as i64)
        .bind(vintage.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        // Another writer may have won the race; re-read authoritatively.
        self.get_by_wine_year(wine_id, year)
            .await?
            .ok_or_else(|| crate::error::CellarError::internal("vintage disappeared after insert"))
    }

    /// Idempotently persists enrichment results (§4.4 step 7).
    pub async fn update_enrichment(
        &self,
        vintage_id: Uuid,
        quality_score: f64,
        weather_score: f64,
        weather_json: &serde_json::Value,
        procurement_json: &serde_json::Value,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE vintages SET quality_score = ?, weather_score = ?, weather_json = ?,
             procurement_json = ?, enriched_at = ? WHERE id = ?",
        )
        .bind(quality_score)
        .bind(weather_score)
        .bind(weather_json.to_string())
        .bind(procurement_json.to_string())
        .bind(Utc::now().to_rfc3339())
        .bind(vintage_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
