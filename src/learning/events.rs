//! Experiment event ingestion (§4.8 "Event ingestion"): single or batched
//! (<=100) impressions, clicks, conversions, and ratings, ingested with
//! at-least-once semantics. Deduplication by `(experiment, allocation_unit,
//! event_type, timestamp)` is enforced at the storage layer (see migration
//! `0003_experiment_event_dedup`); this service owns batch-size validation
//! and construction of the domain rows.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{ExperimentEvent, ExperimentEventType};
use crate::error::{CellarError, Result};
use crate::storage::repository::ExperimentRepository;

const MAX_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExperimentEvent {
    pub experiment_id: Uuid,
    pub variant_id: Uuid,
    pub allocation_unit_id: String,
    pub event_type: ExperimentEventType,
    pub value: Option<f64>,
    pub timestamp: Option<chrono::DateTime<Utc>>,
    pub context: serde_json::Value,
}

#[derive(Clone)]
pub struct EventIngestionService {
    repo: Arc<ExperimentRepository>,
}

impl EventIngestionService {
    pub fn new(repo: Arc<ExperimentRepository>) -> Self {
        Self { repo }
    }

    pub async fn ingest_one(&self, event: NewExperimentEvent) -> Result<u64> {
        self.ingest_batch(vec![event]).await
    }

    /// Returns the number of rows actually inserted (a replayed duplicate
    /// within the batch or across retries contributes 0).
    pub async fn ingest_batch(&self, events: Vec<NewExperimentEvent>) -> Result<u64> {
        if events.is_empty() {
            return Ok(0);
        }
        if events.len() > MAX_BATCH_SIZE {
            return Err(CellarError::validation(format!(
                "at most {MAX_BATCH_SIZE} experiment events may be submitted per batch, got {}",
                events.len()
            )));
        }

        let now = Utc::now();
        let rows: Vec<ExperimentEvent> = events
            .into_iter()
            .map(|e| ExperimentEvent {
                id: Uuid::new_v4(),
                experiment_id: e.experiment_id,
                variant_id: e.variant_id,
                allocation_unit_id: e.allocation_unit_id,
                event_type: e.event_type,
                value: e.value,
                timestamp: e.timestamp.unwrap_or(now),
                context: e.context,
            })
            .collect();

        self.repo.record_events(&rows).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AllocationUnit, Experiment, ExperimentStatus, ExperimentVariant};
    use crate::storage::database::DatabaseConfig;
    use crate::storage::Db;

    async fn experiment_with_variant() -> (EventIngestionService, Experiment) {
        let db = Db::connect(&DatabaseConfig::default()).await.unwrap();
        let repo = Arc::new(ExperimentRepository::new(db.pool().clone()));
        let experiment = Experiment {
            id: Uuid::new_v4(),
            name: "banner-test".to_string(),
            status: ExperimentStatus::Running,
            target_metric: "click_rate".to_string(),
            guardrail_metrics: vec![],
            allocation_unit: AllocationUnit::Session,
            start_date: None,
            end_date: None,
            variants: vec![ExperimentVariant {
                id: Uuid::new_v4(),
                experiment_id: Uuid::new_v4(),
                name: "control".to_string(),
                is_control: true,
                allocation_pct: 100.0,
            }],
            winner_variant_id: None,
            conclusion: None,
        };
        repo.create(&experiment).await.unwrap();
        (EventIngestionService::new(repo), experiment)
    }

    #[tokio::test]
    async fn rejects_batches_over_the_limit() {
        let (service, experiment) = experiment_with_variant().await;
        let variant_id = experiment.variants[0].id;
        let events: Vec<NewExperimentEvent> = (0..101)
            .map(|_| NewExperimentEvent {
                experiment_id: experiment.id,
                variant_id,
                allocation_unit_id: "session-1".to_string(),
                event_type: ExperimentEventType::Impression,
                value: None,
                timestamp: None,
                context: serde_json::json!({}),
            })
            .collect();
        assert!(service.ingest_batch(events).await.is_err());
    }

    #[tokio::test]
    async fn duplicate_timestamped_events_are_deduplicated() {
        let (service, experiment) = experiment_with_variant().await;
        let variant_id = experiment.variants[0].id;
        let ts = Utc::now();
        let event = |variant_id: Uuid| NewExperimentEvent {
            experiment_id: experiment.id,
            variant_id,
            allocation_unit_id: "session-1".to_string(),
            event_type: ExperimentEventType::Click,
            value: None,
            timestamp: Some(ts),
            context: serde_json::json!({}),
        };

        let inserted_first = service.ingest_one(event(variant_id)).await.unwrap();
        let inserted_second = service.ingest_one(event(variant_id)).await.unwrap();
        assert_eq!(inserted_first, 1);
        assert_eq!(inserted_second, 0);
    }
}
