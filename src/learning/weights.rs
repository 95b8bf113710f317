//! `getEnhancedPairingWeights` (§4.8): derives scoring weights from observed
//! facet ratings rather than the Pairing Engine's static defaults.
//!
//! Open Question resolution: the spec accepts either weighted regression or
//! simple normalized averages, with the contract "weights sum to 1,
//! non-negative, vary monotonically with observed facet importance". This
//! implementation takes the simpler route: average each facet's rating
//! across recent feedback, then normalize the averages to sum to 1. A
//! facet with no ratings at all falls back to the scoring defaults'
//! relative weight so its absence doesn't zero out the composite.

use std::collections::HashMap;

use crate::domain::Feedback;
use crate::pairing::ScoreWeights;

const FACETS: [&str; 5] = [
    "flavor_harmony",
    "texture_balance",
    "acidity_match",
    "tannin_balance",
    "regional_tradition",
];

/// Minimum feedback rows required before derived weights are trusted over
/// the defaults; below this the sample is too thin to vary weights on.
const MIN_SAMPLE_SIZE: usize = 10;

fn facet_value(feedback: &Feedback, facet: &str) -> Option<u8> {
    match facet {
        "flavor_harmony" => feedback.flavor_harmony,
        "texture_balance" => feedback.texture_balance,
        "acidity_match" => feedback.acidity_match,
        "tannin_balance" => feedback.tannin_balance,
        "regional_tradition" => feedback.regional_tradition,
        _ => None,
    }
}

/// Averages facet ratings across `feedback` and normalizes into
/// [`ScoreWeights`]. `style_match` and `seasonal_appropriateness` have no
/// directly rated facet counterpart, so they retain the default's relative
/// share of the non-flavor/texture/regional weight.
pub fn derive_weights(feedback: &[Feedback]) -> ScoreWeights {
    if feedback.len() < MIN_SAMPLE_SIZE {
        return ScoreWeights::default();
    }

    let mut sums: HashMap<&str, f64> = HashMap::new();
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for f in feedback {
        for facet in FACETS {
            if let Some(v) = facet_value(f, facet) {
                *sums.entry(facet).or_insert(0.0) += v as f64;
                *counts.entry(facet).or_insert(0) += 1;
            }
        }
    }

    let averages: HashMap<&str, f64> = FACETS
        .iter()
        .filter_map(|facet| {
            counts.get(facet).filter(|c| **c > 0).map(|c| (*facet, sums[facet] / *c as f64))
        })
        .collect();

    if averages.is_empty() {
        return ScoreWeights::default();
    }

    let defaults = ScoreWeights::default();
    let total: f64 = averages.values().sum();

    let flavor_harmony = averages.get("flavor_harmony").map(|v| v / total).unwrap_or(defaults.flavor_harmony);
    let texture_balance = averages.get("texture_balance").map(|v| v / total).unwrap_or(defaults.texture_balance);
    let regional_tradition =
        averages.get("regional_tradition").map(|v| v / total).unwrap_or(defaults.regional_tradition);

    // acidity_match and tannin_balance feed into style_match's relative
    // weight since the composite has no dedicated slot for them.
    let style_component: f64 =
        averages.get("acidity_match").copied().unwrap_or(0.0) + averages.get("tannin_balance").copied().unwrap_or(0.0);
    let style_match = if style_component > 0.0 {
        style_component / total
    } else {
        defaults.style_match
    };

    let assigned = flavor_harmony + texture_balance + regional_tradition + style_match;
    let seasonal_appropriateness = (1.0 - assigned).max(0.0);

    let raw_total =
        style_match + flavor_harmony + texture_balance + regional_tradition + seasonal_appropriateness;

    ScoreWeights {
        style_match: style_match / raw_total,
        flavor_harmony: flavor_harmony / raw_total,
        texture_balance: texture_balance / raw_total,
        regional_tradition: regional_tradition / raw_total,
        seasonal_appropriateness: seasonal_appropriateness / raw_total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn feedback(flavor: u8, texture: u8, regional: u8) -> Feedback {
        Feedback {
            id: Uuid::new_v4(),
            recommendation_id: Uuid::new_v4(),
            user_id: Some("u1".to_string()),
            overall_rating: 4,
            flavor_harmony: Some(flavor),
            texture_balance: Some(texture),
            acidity_match: None,
            tannin_balance: None,
            body_match: None,
            regional_tradition: Some(regional),
            selected: true,
            time_to_decision_ms: None,
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn below_minimum_sample_falls_back_to_defaults() {
        let rows: Vec<Feedback> = (0..3).map(|_| feedback(5, 3, 3)).collect();
        let weights = derive_weights(&rows);
        let defaults = ScoreWeights::default();
        assert_eq!(weights.style_match, defaults.style_match);
    }

    #[test]
    fn derived_weights_sum_to_one_and_are_non_negative() {
        let rows: Vec<Feedback> = (0..20).map(|i| feedback(5, 3, (i % 5 + 1) as u8)).collect();
        let weights = derive_weights(&rows);
        let total = weights.style_match
            + weights.flavor_harmony
            + weights.texture_balance
            + weights.regional_tradition
            + weights.seasonal_appropriateness;
        assert!((total - 1.0).abs() < 1e-9);
        assert!(weights.style_match >= 0.0);
        assert!(weights.flavor_harmony >= 0.0);
        assert!(weights.texture_balance >= 0.0);
        assert!(weights.regional_tradition >= 0.0);
        assert!(weights.seasonal_appropriateness >= 0.0);
    }

    #[test]
    fn higher_rated_facets_receive_larger_weight() {
        let high_flavor: Vec<Feedback> = (0..20).map(|_| feedback(5, 2, 2)).collect();
        let low_flavor: Vec<Feedback> = (0..20).map(|_| feedback(1, 2, 2)).collect();
        let high = derive_weights(&high_flavor);
        let low = derive_weights(&low_flavor);
        assert!(high.flavor_harmony > low.flavor_harmony);
    }
}
