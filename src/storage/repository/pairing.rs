use sqlx::{Pool, Sqlite, Transaction};
use uuid::Uuid;

use crate::domain::PairingRecommendation;
use crate::error::Result;

/// Persists a pairing session and its recommendations (§4.7 step 9). Session
/// writes are atomic with their recommendations: both land within the
/// caller's transaction or neither does.
#[derive(Clone)]
pub struct PairingSessionRepository {
    pool: Pool<Sqlite>,
}

impl PairingSessionRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn persist_session(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        session_id: Uuid,
        dish_json: &serde_json::Value,
        context_json: &serde_json::Value,
        preferences_json: &serde_json::Value,
        cache_key: &str,
        ai_enhanced: bool,
        quick: bool,
        recommendations: &[PairingRecommendation],
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO pairing_sessions
             (id, dish_json, context_json, preferences_json, cache_key, ai_enhanced, quick, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(session_id.to_string())
        .bind(dish_json.to_string())
        .bind(context_json.to_string())
        .bind(preferences_json.to_string())
        .bind(cache_key)
        .bind(ai_enhanced)
        .bind(quick)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&mut **tx)
        .await?;

        for rec in recommendations {
            let sub_scores_json = serde_json::to_string(&rec.sub_scores)?;
            sqlx::query(
                "INSERT INTO pairing_recommendations
                 (id, session_id, wine_id, ordinal, sub_scores_json, total, confidence, reasoning, ai_enhanced, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(rec.id.to_string())
            .bind(session_id.to_string())
            .bind(rec.wine_id.to_string())
            .bind(rec.ordinal as i64)
            .bind(sub_scores_json)
            .bind(rec.total)
            .bind(rec.confidence)
            .bind(&rec.reasoning)
            .bind(rec.ai_enhanced)
            .bind(chrono::Utc::now().to_rfc3339())
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }

    /// The wine a persisted recommendation row pointed at, used by user
    /// profile aggregation (§4.8) to join feedback back to wine attributes.
    pub async fn wine_id_for_recommendation(&self, recommendation_id: Uuid) -> Result<Option<Uuid>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT wine_id FROM pairing_recommendations WHERE id = ?")
                .bind(recommendation_id.to_string())
                .fetch_optional(&self.pool)
                .await?;
        match row {
            Some((id,)) => Ok(Some(Uuid::parse_str(&id).map_err(|e| {
                crate::error::CellarError::internal(format!("bad uuid in pairing_recommendations: {e}"))
            })?)),
            None => Ok(None),
        }
    }
}
