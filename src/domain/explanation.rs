use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplanationEntityType {
    PairingRecommendation,
    Procurement,
    Weather,
    VintageAdjustment,
}

/// Append-only per-entity explainability record (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    pub id: Uuid,
    pub entity_type: ExplanationEntityType,
    pub entity_id: String,
    pub summary: String,
    pub factors: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub actor_role: String,
}

impl Explanation {
    pub fn new(
        entity_type: ExplanationEntityType,
        entity_id: impl Into<String>,
        summary: impl Into<String>,
        factors: Vec<String>,
        actor_role: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity_type,
            entity_id: entity_id.into(),
            summary: summary.into(),
            factors,
            created_at: Utc::now(),
            actor_role: actor_role.into(),
        }
    }
}
