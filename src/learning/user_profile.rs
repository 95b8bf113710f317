//! Per-user profile aggregation (§4.8 "User profile"): modal wine types,
//! modal regions, and facet sensitivity derived from a user's feedback
//! history. Computed on demand rather than persisted, so "refreshable
//! incrementally" (spec wording) means calling [`UserProfileService::build`]
//! again rather than applying a delta to stored state — the underlying
//! query is cheap enough at the feedback volumes this system expects that
//! a true incremental merge would add complexity without a measured need.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::UserProfile;
use crate::error::Result;
use crate::storage::repository::{FeedbackRepository, PairingSessionRepository, WineRepository};

/// Feedback rows considered per profile build; bounds the join fan-out
/// against `pairing_recommendations`/`wines`.
const PROFILE_FEEDBACK_LIMIT: u32 = 200;

#[derive(Clone)]
pub struct UserProfileService {
    feedback: Arc<FeedbackRepository>,
    pairing_sessions: Arc<PairingSessionRepository>,
    wines: Arc<WineRepository>,
}

impl UserProfileService {
    pub fn new(
        feedback: Arc<FeedbackRepository>,
        pairing_sessions: Arc<PairingSessionRepository>,
        wines: Arc<WineRepository>,
    ) -> Self {
        Self { feedback, pairing_sessions, wines }
    }

    pub async fn build(&self, user_id: &str) -> Result<UserProfile> {
        let history = self.feedback.for_user(user_id, PROFILE_FEEDBACK_LIMIT).await?;
        if history.is_empty() {
            return Ok(UserProfile::empty(user_id));
        }

        let mut type_counts: HashMap<String, u32> = HashMap::new();
        let mut region_counts: HashMap<String, u32> = HashMap::new();
        let mut facet_sums: HashMap<&'static str, (f64, u32)> = HashMap::new();

        for row in &history {
            if let Some(wine_id) = self.pairing_sessions.wine_id_for_recommendation(row.recommendation_id).await? {
                if let Some(wine) = self.wines.get(wine_id).await? {
                    *type_counts.entry(wine.wine_type.as_str().to_string()).or_insert(0) += 1;
                    *region_counts.entry(wine.region.clone()).or_insert(0) += 1;
                }
            }
            for (facet, value) in row.facet_ratings() {
                let entry = facet_sums.entry(facet).or_insert((0.0, 0));
                entry.0 += value as f64;
                entry.1 += 1;
            }
        }

        let facet_sensitivity = facet_sums
            .into_iter()
            .map(|(facet, (sum, count))| (facet.to_string(), sum / count as f64))
            .collect();

        Ok(UserProfile {
            user_id: user_id.to_string(),
            modal_wine_types: top_keys(&type_counts, 3),
            modal_regions: top_keys(&region_counts, 3),
            facet_sensitivity,
            sample_size: history.len() as u32,
            updated_at: chrono::Utc::now(),
        })
    }
}

/// The `n` most frequent keys, ties broken alphabetically for determinism.
fn top_keys(counts: &HashMap<String, u32>, n: usize) -> Vec<String> {
    let mut entries: Vec<(&String, &u32)> = counts.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    entries.into_iter().take(n).map(|(k, _)| k.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_keys_breaks_ties_alphabetically() {
        let mut counts = HashMap::new();
        counts.insert("Red".to_string(), 3u32);
        counts.insert("White".to_string(), 3u32);
        counts.insert("Rosé".to_string(), 1u32);
        let top = top_keys(&counts, 2);
        assert_eq!(top, vec!["Red".to_string(), "White".to_string()]);
    }

    #[test]
    fn top_keys_respects_limit() {
        let mut counts = HashMap::new();
        for label in ["a", "b", "c", "d"] {
            counts.insert(label.to_string(), 1u32);
        }
        assert_eq!(top_keys(&counts, 2).len(), 2);
    }
}
