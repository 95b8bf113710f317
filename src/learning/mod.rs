//! Online Learning & Experimentation (spec §4.8): feedback ingestion, user
//! profile aggregation, derived pairing weights, experiment CRUD/lifecycle,
//! sticky assignment, event ingestion, and frequentist/Bayesian analysis.

pub mod analysis;
mod assignment;
mod events;
mod experiment;
mod feedback;
mod user_profile;
mod weights;

pub use assignment::AssignmentService;
pub use events::{EventIngestionService, NewExperimentEvent};
pub use experiment::ExperimentManager;
pub use feedback::FeedbackIngestion;
pub use user_profile::UserProfileService;
pub use weights::derive_weights;

use std::sync::Arc;

use parking_lot::RwLock;

use crate::pairing::{PairingWeightsSource, ScoreWeights};
use crate::storage::repository::FeedbackRepository;

/// Supplies [`PairingWeightsSource`] to the Pairing Engine from weights
/// derived offline (by [`derive_weights`]) and cached here. The trait's
/// `weights()` is synchronous, so the derivation itself — which reads
/// recent feedback from storage — runs out of band via
/// [`WeightsCache::refresh`] and publishes into this cache.
pub struct WeightsCache {
    feedback: Arc<FeedbackRepository>,
    current: RwLock<Option<ScoreWeights>>,
}

impl WeightsCache {
    pub fn new(feedback: Arc<FeedbackRepository>) -> Self {
        Self { feedback, current: RwLock::new(None) }
    }

    /// Re-derives weights from feedback recorded since `since` and
    /// publishes them for subsequent [`PairingWeightsSource::weights`]
    /// calls.
    pub async fn refresh(&self, since: chrono::DateTime<chrono::Utc>) -> crate::error::Result<ScoreWeights> {
        let rows = self.feedback.since(since).await?;
        let weights = derive_weights(&rows);
        *self.current.write() = Some(weights);
        Ok(weights)
    }
}

impl PairingWeightsSource for WeightsCache {
    fn weights(&self) -> Option<ScoreWeights> {
        self.current.read().clone()
    }
}
