use sqlx::{Pool, Sqlite, Transaction};

use crate::domain::{Explanation, ExplanationEntityType};
use crate::error::Result;
use crate::storage::models::{explanation_entity_type_str, ExplanationRow};

/// Append-only explainability log (§3, §4.7 step 9).
#[derive(Clone)]
pub struct ExplanationRepository {
    pool: Pool<Sqlite>,
}

impl ExplanationRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn append(&self, explanation: &Explanation) -> Result<()> {
        let factors = serde_json::to_string(&explanation.factors)?;
        sqlx::query(
            "INSERT INTO explanations (id, entity_type, entity_id, summary, factors, created_at, actor_role)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(explanation.id.to_string())
        .bind(explanation_entity_type_str(explanation.entity_type))
        .bind(&explanation.entity_id)
        .bind(&explanation.summary)
        .bind(factors)
        .bind(explanation.created_at.to_rfc3339())
        .bind(&explanation.actor_role)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Same as [`Self::append`], scoped to an open transaction so it can be
    /// committed atomically alongside other writes (§4.7 step 9).
    pub async fn append_in_tx(&self, tx: &mut Transaction<'_, Sqlite>, explanation: &Explanation) -> Result<()> {
        let factors = serde_json::to_string(&explanation.factors)?;
        sqlx::query(
            "INSERT INTO explanations (id, entity_type, entity_id, summary, factors, created_at, actor_role)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(explanation.id.to_string())
        .bind(explanation_entity_type_str(explanation.entity_type))
        .bind(&explanation.entity_id)
        .bind(&explanation.summary)
        .bind(factors)
        .bind(explanation.created_at.to_rfc3339())
        .bind(&explanation.actor_role)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn for_entity(
        &self,
        entity_type: ExplanationEntityType,
        entity_id: &str,
    ) -> Result<Vec<Explanation>> {
        let rows = sqlx::query_as::<_, ExplanationRow>(
            "SELECT * FROM explanations WHERE entity_type = ? AND entity_id = ? ORDER BY created_at DESC",
        )
        .bind(explanation_entity_type_str(entity_type))
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(|r| r.into_domain()).collect()
    }
}
