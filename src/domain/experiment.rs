use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentStatus {
    Draft,
    Running,
    Paused,
    Completed,
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationUnit {
    User,
    Session,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentVariant {
    pub id: Uuid,
    pub experiment_id: Uuid,
    pub name: String,
    pub is_control: bool,
    pub allocation_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experiment {
    pub id: Uuid,
    pub name: String,
    pub status: ExperimentStatus,
    pub target_metric: String,
    pub guardrail_metrics: Vec<String>,
    pub allocation_unit: AllocationUnit,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub variants: Vec<ExperimentVariant>,
    pub winner_variant_id: Option<Uuid>,
    pub conclusion: Option<String>,
}

impl Experiment {
    /// §4.8: starting requires >=2 variants, exactly one control, and
    /// allocations summing to 100 +/- 0.01.
    pub fn validate_for_start(&self) -> crate::error::Result<()> {
        use crate::error::CellarError;

        if self.variants.len() < 2 {
            return Err(CellarError::validation(
                "experiment requires at least 2 variants to start",
            ));
        }
        let controls = self.variants.iter().filter(|v| v.is_control).count();
        if controls != 1 {
            return Err(CellarError::validation(format!(
                "experiment requires exactly one control variant, found {controls}"
            )));
        }
        let total: f64 = self.variants.iter().map(|v| v.allocation_pct).sum();
        if (total - 100.0).abs() > 0.01 {
            return Err(CellarError::validation(format!(
                "variant allocations must sum to 100, got {total}"
            )));
        }
        Ok(())
    }
}

/// Sticky mapping `(allocation_unit_id, experiment)` -> variant (§3, §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentAssignment {
    pub experiment_id: Uuid,
    pub allocation_unit_id: String,
    pub variant_id: Uuid,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentEventType {
    Impression,
    Click,
    Conversion,
    Rating,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentEvent {
    pub id: Uuid,
    pub experiment_id: Uuid,
    pub variant_id: Uuid,
    pub allocation_unit_id: String,
    pub event_type: ExperimentEventType,
    pub value: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub context: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(name: &str, control: bool, pct: f64) -> ExperimentVariant {
        ExperimentVariant {
            id: Uuid::new_v4(),
            experiment_id: Uuid::new_v4(),
            name: name.to_string(),
            is_control: control,
            allocation_pct: pct,
        }
    }

    fn base_experiment(variants: Vec<ExperimentVariant>) -> Experiment {
        Experiment {
            id: Uuid::new_v4(),
            name: "test".to_string(),
            status: ExperimentStatus::Draft,
            target_metric: "conversion_rate".to_string(),
            guardrail_metrics: vec![],
            allocation_unit: AllocationUnit::User,
            start_date: None,
            end_date: None,
            variants,
            winner_variant_id: None,
            conclusion: None,
        }
    }

    #[test]
    fn requires_exactly_one_control() {
        let exp = base_experiment(vec![
            variant("control", true, 50.0),
            variant("control2", true, 50.0),
        ]);
        assert!(exp.validate_for_start().is_err());
    }

    #[test]
    fn requires_allocations_sum_to_100() {
        let exp = base_experiment(vec![variant("a", true, 40.0), variant("b", false, 40.0)]);
        assert!(exp.validate_for_start().is_err());
    }

    #[test]
    fn accepts_valid_two_variant_experiment() {
        let exp = base_experiment(vec![variant("a", true, 50.0), variant("b", false, 50.0)]);
        assert!(exp.validate_for_start().is_ok());
    }

    #[test]
    fn tolerates_rounding_within_epsilon() {
        let exp = base_experiment(vec![
            variant("a", true, 33.34),
            variant("b", false, 33.33),
            variant("c", false, 33.33),
        ]);
        assert!(exp.validate_for_start().is_ok());
    }
}
