//! Procurement recommendation engine (§4.4 step 6).

use serde::{Deserialize, Serialize};

use crate::domain::{WeatherAnalysis, WeatherConfidence};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcurementAction {
    Buy,
    Hold,
    Avoid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcurementPriority {
    High,
    Medium,
    Low,
}

impl ProcurementPriority {
    /// Confidence = Low demotes priority by one tier.
    fn demote(self) -> Self {
        match self {
            ProcurementPriority::High => ProcurementPriority::Medium,
            ProcurementPriority::Medium => ProcurementPriority::Low,
            ProcurementPriority::Low => ProcurementPriority::Low,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcurementRecommendation {
    pub action: ProcurementAction,
    pub priority: ProcurementPriority,
    pub reasoning: String,
    pub suggested_quantity: String,
    pub considerations: Vec<String>,
}

/// Derives a procurement action, priority, and reasoning from a vintage's
/// weather analysis.
pub fn recommend(analysis: &WeatherAnalysis) -> ProcurementRecommendation {
    let (action, mut priority, suggested_quantity) = if analysis.overall_score >= 88.0 {
        let priority = if analysis.confidence == WeatherConfidence::High {
            ProcurementPriority::High
        } else {
            ProcurementPriority::Medium
        };
        (ProcurementAction::Buy, priority, "Increase")
    } else if analysis.overall_score >= 75.0 {
        (ProcurementAction::Buy, ProcurementPriority::Medium, "Standard")
    } else if analysis.overall_score >= 60.0 {
        (ProcurementAction::Hold, ProcurementPriority::Medium, "Standard")
    } else {
        (ProcurementAction::Avoid, ProcurementPriority::Low, "Minimal or none")
    };

    if analysis.confidence == WeatherConfidence::Low {
        priority = priority.demote();
    }

    let mut considerations = Vec::new();
    if analysis.ripeness < 3.0 {
        considerations.push("underripe".to_string());
    }
    if analysis.disease_pressure < 2.5 {
        considerations.push("disease pressure".to_string());
    }
    if analysis.heatwave_days > 10 {
        considerations.push("heat stress".to_string());
    }

    let reasoning = format!(
        "Overall growing-season score of {:.0}/100 ({:?} confidence) for {} {}.",
        analysis.overall_score, analysis.confidence, analysis.region_token, analysis.year
    );

    ProcurementRecommendation {
        action,
        priority,
        reasoning,
        suggested_quantity: suggested_quantity.to_string(),
        considerations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(overall: f64, confidence: WeatherConfidence) -> WeatherAnalysis {
        WeatherAnalysis {
            region_token: "bordeaux".to_string(),
            vineyard_alias: None,
            year: 2015,
            mean_temp_c: 18.0,
            max_temp_c: 28.0,
            min_temp_c: 8.0,
            gdd: 1400.0,
            total_rainfall_mm: 400.0,
            heatwave_days: 2,
            frost_days: 0,
            sunshine_hours: 1700.0,
            diurnal_range_avg_c: 13.0,
            overall_score: overall,
            confidence,
            ripeness: 4.0,
            acidity: 4.0,
            disease_pressure: 1.5,
            sample_completeness: 0.95,
        }
    }

    #[test]
    fn excellent_high_confidence_vintage_is_a_high_priority_buy() {
        let rec = recommend(&analysis(92.0, WeatherConfidence::High));
        assert_eq!(rec.action, ProcurementAction::Buy);
        assert_eq!(rec.priority, ProcurementPriority::High);
        assert_eq!(rec.suggested_quantity, "Increase");
    }

    #[test]
    fn excellent_low_confidence_vintage_is_downgraded_to_standard_buy() {
        let rec = recommend(&analysis(92.0, WeatherConfidence::Low));
        assert_eq!(rec.action, ProcurementAction::Buy);
        assert_eq!(rec.priority, ProcurementPriority::Medium);
    }

    #[test]
    fn excellent_medium_confidence_vintage_is_still_a_buy() {
        let rec = recommend(&analysis(90.0, WeatherConfidence::Medium));
        assert_eq!(rec.action, ProcurementAction::Buy);
        assert_eq!(rec.priority, ProcurementPriority::Medium);
    }

    #[test]
    fn boundary_scores_fall_through_to_the_nearest_lower_tier_not_avoid() {
        assert_eq!(recommend(&analysis(87.5, WeatherConfidence::Medium)).action, ProcurementAction::Buy);
        assert_eq!(recommend(&analysis(74.5, WeatherConfidence::Medium)).action, ProcurementAction::Hold);
    }

    #[test]
    fn poor_vintage_is_avoided() {
        let rec = recommend(&analysis(45.0, WeatherConfidence::Medium));
        assert_eq!(rec.action, ProcurementAction::Avoid);
        assert_eq!(rec.priority, ProcurementPriority::Low);
    }

    #[test]
    fn marginal_vintage_is_held() {
        let rec = recommend(&analysis(65.0, WeatherConfidence::Medium));
        assert_eq!(rec.action, ProcurementAction::Hold);
    }

    #[test]
    fn considerations_flag_underripe_disease_and_heat_stress() {
        let mut a = analysis(80.0, WeatherConfidence::Medium);
        a.ripeness = 2.5;
        a.disease_pressure = 2.0;
        a.heatwave_days = 12;
        let rec = recommend(&a);
        assert_eq!(rec.considerations.len(), 3);
        assert!(rec.considerations.contains(&"underripe".to_string()));
        assert!(rec.considerations.contains(&"disease pressure".to_string()));
        assert!(rec.considerations.contains(&"heat stress".to_string()));
    }
}
