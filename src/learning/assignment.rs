//! Sticky variant assignment (§4.8 "Assignment"): hash `(allocation_unit_id
//! || experiment_id)` to a 32-bit integer and map into cumulative
//! allocation intervals.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{ExperimentAssignment, ExperimentStatus, ExperimentVariant};
use crate::error::{CellarError, Result};
use crate::storage::repository::ExperimentRepository;

/// FNV-1a, chosen for a simple, dependency-free, well-distributed 32-bit
/// hash that does not require a crypto primitive for a non-adversarial
/// bucketing decision.
fn hash32(input: &str) -> u32 {
    const FNV_OFFSET: u32 = 0x811c_9dc5;
    const FNV_PRIME: u32 = 0x0100_0193;
    let mut hash = FNV_OFFSET;
    for byte in input.as_bytes() {
        hash ^= *byte as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Deterministically picks a variant for `allocation_unit_id` given the
/// experiment's variants and their allocation percentages. Variants are
/// walked in their stored order so the mapping is stable across calls.
pub fn pick_variant<'a>(
    experiment_id: &str,
    allocation_unit_id: &str,
    variants: &'a [ExperimentVariant],
) -> Result<&'a ExperimentVariant> {
    if variants.is_empty() {
        return Err(CellarError::not_found("experiment has no variants to assign"));
    }

    let hash = hash32(&format!("{allocation_unit_id}{experiment_id}"));
    let point = (hash as f64 / u32::MAX as f64) * 100.0;

    let mut cumulative = 0.0;
    for variant in variants {
        cumulative += variant.allocation_pct;
        if point < cumulative {
            return Ok(variant);
        }
    }
    // Floating point rounding can leave `point` just past the last
    // cumulative boundary; fall back to the last variant rather than error.
    Ok(variants.last().expect("checked non-empty above"))
}

/// Persists sticky assignments behind the pure [`pick_variant`] hash,
/// converging concurrent racers on a single winning row via the
/// repository's `ON CONFLICT DO NOTHING` insert followed by a re-read.
#[derive(Clone)]
pub struct AssignmentService {
    repo: Arc<ExperimentRepository>,
}

impl AssignmentService {
    pub fn new(repo: Arc<ExperimentRepository>) -> Self {
        Self { repo }
    }

    /// `assign(user_id, experiment_id, attributes)` (§4.8): sticky lookup,
    /// falling back to a fresh hash-based draw stored under a transaction.
    /// Guests without a `user_id` pass a session-derived id as
    /// `allocation_unit_id` instead; the function itself is agnostic to
    /// which kind of id it was handed.
    pub async fn assign(&self, experiment_id: Uuid, allocation_unit_id: &str) -> Result<ExperimentAssignment> {
        if let Some(existing) = self.repo.get_assignment(experiment_id, allocation_unit_id).await? {
            return Ok(existing);
        }

        let experiment = self
            .repo
            .get(experiment_id)
            .await?
            .ok_or_else(|| CellarError::not_found(format!("experiment {experiment_id}")))?;
        if experiment.status != ExperimentStatus::Running {
            return Err(CellarError::conflict(format!(
                "experiment {experiment_id} is not running"
            )));
        }

        let variant = pick_variant(&experiment_id.to_string(), allocation_unit_id, &experiment.variants)?;
        let draw = ExperimentAssignment {
            experiment_id,
            allocation_unit_id: allocation_unit_id.to_string(),
            variant_id: variant.id,
            assigned_at: chrono::Utc::now(),
        };
        self.repo.assign(&draw).await?;

        // A concurrent racer may have won the insert; re-read rather than
        // trust `draw` so every caller converges on the same row (§8
        // "Assignment stickiness").
        self.repo
            .get_assignment(experiment_id, allocation_unit_id)
            .await?
            .ok_or_else(|| CellarError::internal("assignment vanished immediately after insert"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(name: &str, pct: f64) -> ExperimentVariant {
        ExperimentVariant {
            id: Uuid::new_v4(),
            experiment_id: Uuid::new_v4(),
            name: name.to_string(),
            is_control: name == "control",
            allocation_pct: pct,
        }
    }

    #[test]
    fn same_allocation_unit_always_gets_the_same_variant() {
        let variants = vec![variant("control", 50.0), variant("treatment", 50.0)];
        let first = pick_variant("exp-1", "user-42", &variants).unwrap().id;
        for _ in 0..20 {
            let again = pick_variant("exp-1", "user-42", &variants).unwrap().id;
            assert_eq!(first, again);
        }
    }

    #[test]
    fn different_experiments_can_diverge_for_the_same_unit() {
        let variants = vec![variant("control", 50.0), variant("treatment", 50.0)];
        let mut saw_divergence = false;
        for i in 0..50 {
            let a = pick_variant(&format!("exp-a-{i}"), "user-42", &variants).unwrap().id;
            let b = pick_variant(&format!("exp-b-{i}"), "user-42", &variants).unwrap().id;
            if a != b {
                saw_divergence = true;
                break;
            }
        }
        assert!(saw_divergence);
    }

    #[test]
    fn assignment_respects_skewed_allocations() {
        let variants = vec![variant("control", 90.0), variant("treatment", 10.0)];
        let mut control_count = 0;
        let total = 2000;
        for i in 0..total {
            let v = pick_variant("exp-skew", &format!("user-{i}"), &variants).unwrap();
            if v.name == "control" {
                control_count += 1;
            }
        }
        let ratio = control_count as f64 / total as f64;
        assert!(ratio > 0.8 && ratio < 1.0);
    }

    #[test]
    fn empty_variants_is_an_error() {
        assert!(pick_variant("exp", "user", &[]).is_err());
    }

    #[tokio::test]
    async fn assignment_service_is_sticky_across_repeated_calls() {
        use crate::domain::{AllocationUnit, Experiment, ExperimentStatus};
        use crate::storage::database::DatabaseConfig;
        use crate::storage::Db;

        let db = Db::connect(&DatabaseConfig::default()).await.unwrap();
        let repo = Arc::new(ExperimentRepository::new(db.pool().clone()));

        let experiment = Experiment {
            id: Uuid::new_v4(),
            name: "hero-copy".to_string(),
            status: ExperimentStatus::Running,
            target_metric: "conversion_rate".to_string(),
            guardrail_metrics: vec![],
            allocation_unit: AllocationUnit::User,
            start_date: Some(chrono::Utc::now()),
            end_date: None,
            variants: vec![variant("control", 50.0), variant("treatment", 50.0)],
            winner_variant_id: None,
            conclusion: None,
        };
        repo.create(&experiment).await.unwrap();

        let service = AssignmentService::new(repo);
        let first = service.assign(experiment.id, "user-42").await.unwrap();
        for _ in 0..5 {
            let again = service.assign(experiment.id, "user-42").await.unwrap();
            assert_eq!(again.variant_id, first.variant_id);
        }
    }

    #[tokio::test]
    async fn assignment_rejects_non_running_experiments() {
        use crate::domain::{AllocationUnit, Experiment, ExperimentStatus};
        use crate::storage::database::DatabaseConfig;
        use crate::storage::Db;

        let db = Db::connect(&DatabaseConfig::default()).await.unwrap();
        let repo = Arc::new(ExperimentRepository::new(db.pool().clone()));

        let experiment = Experiment {
            id: Uuid::new_v4(),
            name: "draft-only".to_string(),
            status: ExperimentStatus::Draft,
            target_metric: "conversion_rate".to_string(),
            guardrail_metrics: vec![],
            allocation_unit: AllocationUnit::User,
            start_date: None,
            end_date: None,
            variants: vec![variant("control", 50.0), variant("treatment", 50.0)],
            winner_variant_id: None,
            conclusion: None,
        };
        repo.create(&experiment).await.unwrap();

        let service = AssignmentService::new(repo);
        assert!(service.assign(experiment.id, "user-1").await.is_err());
    }
}
