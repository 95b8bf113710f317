use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::domain::Wine;
use crate::error::Result;
use crate::storage::models::WineRow;

#[derive(Clone)]
pub struct WineRepository {
    pool: Pool<Sqlite>,
}

impl WineRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn create(&self, wine: &Wine) -> Result<()> {
        let grapes = serde_json::to_string(&wine.grape_varieties)?;
        sqlx::query(
            "INSERT INTO wines (id, name, producer, region, country, wine_type, grape_varieties, style, tasting_notes, storage_hints)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(wine.id.to_string())
        .bind(&wine.name)
        .bind(&wine.producer)
        .bind(&wine.region)
        .bind(&wine.country)
        .bind(wine.wine_type.as_str())
        .bind(grapes)
        .bind(&wine.style)
        .bind(&wine.tasting_notes)
        .bind(&wine.storage_hints)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Wine>> {
        let row = sqlx::query_as::<_, WineRow>("SELECT * FROM wines WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| r.into_domain()).transpose()
    }

    pub async fn add_alias(&self, wine_id: Uuid, alias: &str) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO wine_aliases (wine_id, alias) VALUES (?, ?)")
            .bind(wine_id.to_string())
            .bind(alias)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn aliases(&self, wine_id: Uuid) -> Result<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT alias FROM wine_aliases WHERE wine_id = ?")
                .bind(wine_id.to_string())
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(a,)| a).collect())
    }

    /// Wines with available stock (`quantity > 0`), optionally filtered by
    /// region/type, per §4.7 step 3.
    pub async fn list_available(
        &self,
        region: Option<&str>,
        wine_type: Option<&str>,
    ) -> Result<Vec<Wine>> {
        let mut sql = String::from(
            "SELECT DISTINCT w.* FROM wines w
             JOIN vintages v ON v.wine_id = w.id
             JOIN stock s ON s.vintage_id = v.id
             WHERE (s.quantity - s.reserved_quantity) > 0",
        );
        if region.is_some() {
            sql.push_str(" AND w.region = ?");
        }
        if wine_type.is_some() {
            sql.push_str(" AND w.wine_type = ?");
        }

        let mut query = sqlx::query_as::<_, WineRow>(&sql);
        if let Some(r) = region {
            query = query.bind(r);
        }
        if let Some(t) = wine_type {
            query = query.bind(t);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(|r| r.into_domain()).collect()
    }
}
