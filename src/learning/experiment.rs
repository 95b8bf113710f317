//! Experiment CRUD and lifecycle transitions (§4.8): `draft -> running ->
//! paused <-> running -> completed -> archived`, all idempotent.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{Experiment, ExperimentStatus};
use crate::error::{CellarError, Result};
use crate::storage::repository::ExperimentRepository;

#[derive(Clone)]
pub struct ExperimentManager {
    repo: Arc<ExperimentRepository>,
}

impl ExperimentManager {
    pub fn new(repo: Arc<ExperimentRepository>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, experiment: &Experiment) -> Result<()> {
        self.repo.create(experiment).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Experiment> {
        self.repo.get(id).await?.ok_or_else(|| CellarError::not_found(format!("experiment {id}")))
    }

    /// `draft -> running`. Requires >= 2 variants, exactly one control, and
    /// allocations summing to 100 +/- 0.01 (validated on the domain type).
    /// Idempotent: calling start on an already-running experiment is a
    /// no-op success.
    pub async fn start(&self, id: Uuid) -> Result<Experiment> {
        let experiment = self.get(id).await?;
        match experiment.status {
            ExperimentStatus::Running => Ok(experiment),
            ExperimentStatus::Draft => {
                experiment.validate_for_start()?;
                self.repo
                    .update_status(id, ExperimentStatus::Running, Some(chrono::Utc::now()), None)
                    .await?;
                self.get(id).await
            }
            other => Err(invalid_transition(other, ExperimentStatus::Running)),
        }
    }

    /// `running -> paused`. Idempotent on an already-paused experiment.
    pub async fn pause(&self, id: Uuid) -> Result<Experiment> {
        let experiment = self.get(id).await?;
        match experiment.status {
            ExperimentStatus::Paused => Ok(experiment),
            ExperimentStatus::Running => {
                self.repo.update_status(id, ExperimentStatus::Paused, None, None).await?;
                self.get(id).await
            }
            other => Err(invalid_transition(other, ExperimentStatus::Paused)),
        }
    }

    /// `paused -> running`. Idempotent on an already-running experiment.
    pub async fn resume(&self, id: Uuid) -> Result<Experiment> {
        let experiment = self.get(id).await?;
        match experiment.status {
            ExperimentStatus::Running => Ok(experiment),
            ExperimentStatus::Paused => {
                self.repo.update_status(id, ExperimentStatus::Running, None, None).await?;
                self.get(id).await
            }
            other => Err(invalid_transition(other, ExperimentStatus::Running)),
        }
    }

    /// `running|paused -> completed`, recording an optional winner and a
    /// conclusion string. Idempotent on an already-completed experiment.
    pub async fn complete(
        &self,
        id: Uuid,
        winner_variant_id: Option<Uuid>,
        conclusion: &str,
    ) -> Result<Experiment> {
        let experiment = self.get(id).await?;
        match experiment.status {
            ExperimentStatus::Completed => Ok(experiment),
            ExperimentStatus::Running | ExperimentStatus::Paused => {
                if let Some(winner) = winner_variant_id {
                    if !experiment.variants.iter().any(|v| v.id == winner) {
                        return Err(CellarError::validation(format!(
                            "winner variant {winner} does not belong to experiment {id}"
                        )));
                    }
                    self.repo.set_winner(id, winner, conclusion).await?;
                } else {
                    self.repo.set_winner(id, Uuid::nil(), conclusion).await?;
                }
                self.repo
                    .update_status(id, ExperimentStatus::Completed, None, Some(chrono::Utc::now()))
                    .await?;
                self.get(id).await
            }
            other => Err(invalid_transition(other, ExperimentStatus::Completed)),
        }
    }

    /// `completed -> archived`. Idempotent on an already-archived experiment.
    pub async fn archive(&self, id: Uuid) -> Result<Experiment> {
        let experiment = self.get(id).await?;
        match experiment.status {
            ExperimentStatus::Archived => Ok(experiment),
            ExperimentStatus::Completed => {
                self.repo.update_status(id, ExperimentStatus::Archived, None, None).await?;
                self.get(id).await
            }
            other => Err(invalid_transition(other, ExperimentStatus::Archived)),
        }
    }
}

fn invalid_transition(from: ExperimentStatus, to: ExperimentStatus) -> CellarError {
    CellarError::conflict(format!("cannot transition experiment from {from:?} to {to:?}"))
}
