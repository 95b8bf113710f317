use chrono::Utc;
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::domain::{
    AllocationUnit, Experiment, ExperimentAssignment, ExperimentEvent, ExperimentStatus,
    ExperimentVariant,
};
use crate::error::{CellarError, Result};
use crate::storage::models::{
    allocation_unit_str, experiment_event_type_str, experiment_status_str,
    ExperimentAssignmentRow, ExperimentEventRow, ExperimentRow, ExperimentVariantRow,
};

/// Experiments, variants, assignments and events (§3, §4.8).
#[derive(Clone)]
pub struct ExperimentRepository {
    pool: Pool<Sqlite>,
}

impl ExperimentRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn create(&self, experiment: &Experiment) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO experiments
             (id, name, status, target_metric, guardrail_metrics, allocation_unit,
              start_date, end_date, winner_variant_id, conclusion)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(experiment.id.to_string())
        .bind(&experiment.name)
        .bind(experiment_status_str(experiment.status))
        .bind(&experiment.target_metric)
        .bind(serde_json::to_string(&experiment.guardrail_metrics)?)
        .bind(allocation_unit_str(experiment.allocation_unit))
        .bind(experiment.start_date.map(|d| d.to_rfc3339()))
        .bind(experiment.end_date.map(|d| d.to_rfc3339()))
        .bind(experiment.winner_variant_id.map(|v| v.to_string()))
        .bind(&experiment.conclusion)
        .execute(&mut *tx)
        .await?;

        for variant in &experiment.variants {
            sqlx::query(
                "INSERT INTO experiment_variants (id, experiment_id, name, is_control, allocation_pct)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(variant.id.to_string())
            .bind(variant.experiment_id.to_string())
            .bind(&variant.name)
            .bind(variant.is_control)
            .bind(variant.allocation_pct)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn variants_for(&self, experiment_id: Uuid) -> Result<Vec<ExperimentVariant>> {
        let rows = sqlx::query_as::<_, ExperimentVariantRow>(
            "SELECT * FROM experiment_variants WHERE experiment_id = ?",
        )
        .bind(experiment_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(|r| r.into_domain()).collect()
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Experiment>> {
        let row = sqlx::query_as::<_, ExperimentRow>("SELECT * FROM experiments WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(r) => {
                let variants = self.variants_for(id).await?;
                Ok(Some(r.into_domain(variants)?))
            }
            None => Ok(None),
        }
    }

    pub async fn list_running(&self) -> Result<Vec<Experiment>> {
        let rows = sqlx::query_as::<_, ExperimentRow>(
            "SELECT * FROM experiments WHERE status = 'running'",
        )
        .fetch_all(&self.pool)
        .await?;
        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            let id = Uuid::parse_str(&r.id)
                .map_err(|e| CellarError::internal(format!("bad uuid: {e}")))?;
            let variants = self.variants_for(id).await?;
            out.push(r.into_domain(variants)?);
        }
        Ok(out)
    }

    pub async fn update_status(
        &self,
        id: Uuid,
        status: ExperimentStatus,
        start_date: Option<chrono::DateTime<Utc>>,
        end_date: Option<chrono::DateTime<Utc>>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE experiments SET status = ?, start_date = COALESCE(?, start_date),
             end_date = COALESCE(?, end_date) WHERE id = ?",
        )
        .bind(experiment_status_str(status))
        .bind(start_date.map(|d| d.to_rfc3339()))
        .bind(end_date.map(|d| d.to_rfc3339()))
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_winner(
        &self,
        id: Uuid,
        winner_variant_id: Uuid,
        conclusion: &str,
    ) -> Result<()> {
        sqlx::query("UPDATE experiments SET winner_variant_id = ?, conclusion = ? WHERE id = ?")
            .bind(winner_variant_id.to_string())
            .bind(conclusion)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Sticky assignment lookup/insert. Returns the existing assignment if
    /// present; callers compute the variant via the deterministic hash
    /// (§4.8 step 2) before calling [`Self::assign`] for a new allocation
    /// unit.
    pub async fn get_assignment(
        &self,
        experiment_id: Uuid,
        allocation_unit_id: &str,
    ) -> Result<Option<ExperimentAssignment>> {
        let row = sqlx::query_as::<_, ExperimentAssignmentRow>(
            "SELECT * FROM experiment_assignments WHERE experiment_id = ? AND allocation_unit_id = ?",
        )
        .bind(experiment_id.to_string())
        .bind(allocation_unit_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| r.into_domain()).transpose()
    }

    pub async fn assign(&self, assignment: &ExperimentAssignment) -> Result<()> {
        sqlx::query(
            "INSERT INTO experiment_assignments (experiment_id, allocation_unit_id, variant_id, assigned_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT (experiment_id, allocation_unit_id) DO NOTHING",
        )
        .bind(assignment.experiment_id.to_string())
        .bind(&assignment.allocation_unit_id)
        .bind(assignment.variant_id.to_string())
        .bind(assignment.assigned_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Batched event ingestion (§4.8 step 5: up to 100 events per call,
    /// deduped by `(experiment, allocation_unit, event_type, timestamp)`).
    pub async fn record_events(&self, events: &[ExperimentEvent]) -> Result<u64> {
        if events.len() > 100 {
            return Err(CellarError::validation(
                "at most 100 experiment events may be submitted per batch",
            ));
        }
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;
        for event in events {
            let result = sqlx::query(
                "INSERT INTO experiment_events
                 (id, experiment_id, variant_id, allocation_unit_id, event_type, value, timestamp, context)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT DO NOTHING",
            )
            .bind(event.id.to_string())
            .bind(event.experiment_id.to_string())
            .bind(event.variant_id.to_string())
            .bind(&event.allocation_unit_id)
            .bind(experiment_event_type_str(event.event_type))
            .bind(event.value)
            .bind(event.timestamp.to_rfc3339())
            .bind(event.context.to_string())
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }

    pub async fn events_for(&self, experiment_id: Uuid) -> Result<Vec<ExperimentEvent>> {
        let rows = sqlx::query_as::<_, ExperimentEventRow>(
            "SELECT * FROM experiment_events WHERE experiment_id = ? ORDER BY timestamp ASC",
        )
        .bind(experiment_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(|r| r.into_domain()).collect()
    }

    pub async fn store_analysis(
        &self,
        experiment_id: Uuid,
        metric_name: &str,
        analysis_type: &str,
        result_json: &serde_json::Value,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO experiment_analysis (id, experiment_id, metric_name, analysis_type, result_json, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(experiment_id.to_string())
        .bind(metric_name)
        .bind(analysis_type)
        .bind(result_json.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
