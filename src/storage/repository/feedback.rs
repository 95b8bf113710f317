use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::domain::Feedback;
use crate::error::Result;
use crate::storage::models::FeedbackRow;

#[derive(Clone)]
pub struct FeedbackRepository {
    pool: Pool<Sqlite>,
}

impl FeedbackRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn create(&self, feedback: &Feedback) -> Result<()> {
        sqlx::query(
            "INSERT INTO feedback
             (id, recommendation_id, user_id, overall_rating, flavor_harmony, texture_balance,
              acidity_match, tannin_balance, body_match, regional_tradition, selected,
              time_to_decision_ms, notes, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(feedback.id.to_string())
        .bind(feedback.recommendation_id.to_string())
        .bind(&feedback.user_id)
        .bind(feedback.overall_rating as i64)
        .bind(feedback.flavor_harmony.map(|v| v as i64))
        .bind(feedback.texture_balance.map(|v| v as i64))
        .bind(feedback.acidity_match.map(|v| v as i64))
        .bind(feedback.tannin_balance.map(|v| v as i64))
        .bind(feedback.body_match.map(|v| v as i64))
        .bind(feedback.regional_tradition.map(|v| v as i64))
        .bind(feedback.selected)
        .bind(feedback.time_to_decision_ms.map(|v| v as i64))
        .bind(&feedback.notes)
        .bind(feedback.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn for_recommendation(&self, recommendation_id: Uuid) -> Result<Vec<Feedback>> {
        let rows = sqlx::query_as::<_, FeedbackRow>(
            "SELECT * FROM feedback WHERE recommendation_id = ? ORDER BY created_at ASC",
        )
        .bind(recommendation_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(|r| r.into_domain()).collect()
    }

    /// All feedback recorded since `since`, used by weight re-derivation
    /// (§4.8 weight estimator).
    pub async fn since(&self, since: chrono::DateTime<chrono::Utc>) -> Result<Vec<Feedback>> {
        let rows = sqlx::query_as::<_, FeedbackRow>(
            "SELECT * FROM feedback WHERE created_at >= ? ORDER BY created_at ASC",
        )
        .bind(since.to_rfc3339())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(|r| r.into_domain()).collect()
    }

    /// Feedback submitted by a given user, most recent first, used by
    /// user profile aggregation (§4.8 "User profile").
    pub async fn for_user(&self, user_id: &str, limit: u32) -> Result<Vec<Feedback>> {
        let rows = sqlx::query_as::<_, FeedbackRow>(
            "SELECT * FROM feedback WHERE user_id = ? ORDER BY created_at DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(|r| r.into_domain()).collect()
    }
}
