use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-user aggregate preferences derived from feedback history (§4.8).
/// Computed on demand from [`Feedback`](super::Feedback) rows rather than
/// persisted, so it is always refreshed against the latest submissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub modal_wine_types: Vec<String>,
    pub modal_regions: Vec<String>,
    pub facet_sensitivity: HashMap<String, f64>,
    pub sample_size: u32,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            modal_wine_types: Vec::new(),
            modal_regions: Vec::new(),
            facet_sensitivity: HashMap::new(),
            sample_size: 0,
            updated_at: Utc::now(),
        }
    }
}
