//! Traditional sub-score computation (§4.7 step 5): five factors in
//! `[0, 1]` per candidate wine, combined into a weighted composite.

use crate::domain::{SubScores, Wine, WineType};
use crate::pairing::dish::Dish;

/// Weights for the five sub-scores, summing to 1. Defaults are used unless
/// the Learning component (§4.8) supplies derived weights.
#[derive(Debug, Clone, Copy)]
pub struct ScoreWeights {
    pub style_match: f64,
    pub flavor_harmony: f64,
    pub texture_balance: f64,
    pub regional_tradition: f64,
    pub seasonal_appropriateness: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            style_match: 0.3,
            flavor_harmony: 0.25,
            texture_balance: 0.2,
            regional_tradition: 0.15,
            seasonal_appropriateness: 0.1,
        }
    }
}

fn style_match(wine: &Wine, dish: &Dish) -> f64 {
    match (wine.wine_type, dish.intensity.as_deref()) {
        (WineType::Red, Some("bold") | Some("rich")) => 0.9,
        (WineType::Red, Some("light")) => 0.4,
        (WineType::White, Some("light")) => 0.9,
        (WineType::White, Some("bold")) => 0.4,
        (WineType::Sparkling, _) => 0.7,
        (WineType::Rose, _) => 0.65,
        (WineType::Dessert, _) => 0.5,
        (WineType::Fortified, Some("rich")) => 0.8,
        _ => 0.5,
    }
}

fn flavor_harmony(wine: &Wine, dish: &Dish) -> f64 {
    if dish.dominant_flavors.is_empty() {
        return 0.5;
    }
    let notes = wine.tasting_notes.clone().unwrap_or_default().to_lowercase();
    let matches = dish
        .dominant_flavors
        .iter()
        .filter(|flavor| notes.contains(flavor.as_str()))
        .count();
    (matches as f64 / dish.dominant_flavors.len() as f64).clamp(0.0, 1.0).max(0.3)
}

fn texture_balance(wine: &Wine, dish: &Dish) -> f64 {
    match (wine.wine_type, dish.texture.as_deref()) {
        (WineType::Red, Some("tender") | Some("chewy")) => 0.85,
        (WineType::White, Some("crispy") | Some("flaky")) => 0.85,
        (WineType::Sparkling, Some("crispy")) => 0.9,
        _ if dish.texture.is_none() => 0.5,
        _ => 0.55,
    }
}

fn regional_tradition(wine: &Wine, dish: &Dish) -> f64 {
    match &dish.cuisine {
        Some(cuisine) if wine.region.to_lowercase().contains(&cuisine.to_lowercase()) => 0.9,
        Some(_) => 0.5,
        None => 0.5,
    }
}

fn seasonal_appropriateness(wine: &Wine, dish: &Dish) -> f64 {
    match (dish.season.as_deref(), wine.wine_type) {
        (Some("summer"), WineType::White | WineType::Sparkling | WineType::Rose) => 0.85,
        (Some("winter"), WineType::Red | WineType::Fortified) => 0.85,
        (Some(_), _) => 0.5,
        (None, _) => 0.5,
    }
}

pub fn compute_sub_scores(wine: &Wine, dish: &Dish) -> SubScores {
    SubScores {
        style_match: style_match(wine, dish),
        flavor_harmony: flavor_harmony(wine, dish),
        texture_balance: texture_balance(wine, dish),
        regional_tradition: regional_tradition(wine, dish),
        seasonal_appropriateness: seasonal_appropriateness(wine, dish),
        ai_score: None,
    }
}

/// Weighted composite, per §4.7 step 5, in `[0, 1]`.
pub fn composite(sub_scores: &SubScores, weights: ScoreWeights) -> f64 {
    let mut total = sub_scores.style_match * weights.style_match
        + sub_scores.flavor_harmony * weights.flavor_harmony
        + sub_scores.texture_balance * weights.texture_balance
        + sub_scores.regional_tradition * weights.regional_tradition
        + sub_scores.seasonal_appropriateness * weights.seasonal_appropriateness;

    if let Some(ai_score) = sub_scores.ai_score {
        total = (total + ai_score) / 2.0;
    }
    total.clamp(0.0, 1.0)
}

/// `1 - variance(subScores)`, clipped to `[0, 1]` (§4.7 step 5).
pub fn confidence(sub_scores: &SubScores) -> f64 {
    let values = sub_scores.values();
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    (1.0 - variance).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn wine(wine_type: WineType, tasting_notes: &str, region: &str) -> Wine {
        Wine {
            id: Uuid::new_v4(),
            name: "Test".to_string(),
            producer: "Test Producer".to_string(),
            region: region.to_string(),
            country: "France".to_string(),
            wine_type,
            grape_varieties: vec![],
            style: None,
            tasting_notes: Some(tasting_notes.to_string()),
            storage_hints: None,
        }
    }

    #[test]
    fn bold_red_dishes_favor_red_wine_style_match() {
        let dish = Dish {
            name: "steak".to_string(),
            cuisine: None,
            preparation: None,
            intensity: Some("bold".to_string()),
            dominant_flavors: vec![],
            texture: None,
            season: None,
        };
        assert!(style_match(&wine(WineType::Red, "", ""), &dish) > style_match(&wine(WineType::White, "", ""), &dish));
    }

    #[test]
    fn flavor_harmony_rewards_matching_tasting_notes() {
        let dish = Dish {
            name: "curry".to_string(),
            cuisine: None,
            preparation: None,
            intensity: None,
            dominant_flavors: vec!["spicy".to_string(), "smoky".to_string()],
            texture: None,
            season: None,
        };
        let matching = flavor_harmony(&wine(WineType::Red, "notes of spicy pepper and smoky oak", ""), &dish);
        let non_matching = flavor_harmony(&wine(WineType::Red, "delicate floral notes", ""), &dish);
        assert!(matching > non_matching);
    }

    #[test]
    fn confidence_is_one_when_all_subscores_are_equal() {
        let sub_scores = SubScores {
            style_match: 0.6,
            flavor_harmony: 0.6,
            texture_balance: 0.6,
            regional_tradition: 0.6,
            seasonal_appropriateness: 0.6,
            ai_score: None,
        };
        assert_eq!(confidence(&sub_scores), 1.0);
    }

    #[test]
    fn composite_blends_ai_score_with_equal_weight() {
        let mut sub_scores = SubScores {
            style_match: 1.0,
            flavor_harmony: 1.0,
            texture_balance: 1.0,
            regional_tradition: 1.0,
            seasonal_appropriateness: 1.0,
            ai_score: None,
        };
        let traditional_only = composite(&sub_scores, ScoreWeights::default());
        assert_eq!(traditional_only, 1.0);

        sub_scores.ai_score = Some(0.0);
        let blended = composite(&sub_scores, ScoreWeights::default());
        assert_eq!(blended, 0.5);
    }
}
