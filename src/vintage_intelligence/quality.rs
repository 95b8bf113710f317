//! Weather-adjusted quality formula (§4.4 step 4).

use crate::domain::WeatherAnalysis;

const RIPE_ACID_THRESHOLD: f64 = 4.5;
const POOR_FACTOR_THRESHOLD: f64 = 2.5;
const POOR_OVERALL_THRESHOLD: f64 = 60.0;
const EXCELLENT_OVERALL_THRESHOLD: f64 = 85.0;

/// Adjusts a base critic/quality score by the vintage's weather analysis,
/// clamped to `[50, 100]`.
pub fn weather_adjusted_quality(base_score: f64, analysis: &WeatherAnalysis) -> f64 {
    let excellent_conditions = analysis.overall_score >= EXCELLENT_OVERALL_THRESHOLD
        && analysis.ripeness >= RIPE_ACID_THRESHOLD
        && analysis.acidity >= RIPE_ACID_THRESHOLD;

    let mut bonus = 0.0;
    if excellent_conditions {
        bonus += 10.0;
    } else {
        if analysis.acidity >= RIPE_ACID_THRESHOLD {
            bonus += 2.0;
        }
        if analysis.ripeness >= RIPE_ACID_THRESHOLD {
            bonus += 2.0;
        }
    }

    let any_factor_poor = [analysis.ripeness, analysis.acidity, analysis.disease_pressure]
        .iter()
        .any(|&f| f <= POOR_FACTOR_THRESHOLD);
    let poor_conditions = analysis.overall_score <= POOR_OVERALL_THRESHOLD || any_factor_poor;
    let penalty = if poor_conditions { 10.0 } else { 0.0 };

    (base_score + bonus - penalty).clamp(50.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WeatherConfidence;

    fn analysis(overall: f64, ripeness: f64, acidity: f64, disease: f64) -> WeatherAnalysis {
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
            confidence: WeatherConfidence::High,
            ripeness,
            acidity,
            disease_pressure: disease,
            sample_completeness: 0.95,
        }
    }

    #[test]
    fn excellent_conditions_grant_the_max_bonus() {
        let a = analysis(90.0, 4.8, 4.8, 1.0);
        assert_eq!(weather_adjusted_quality(80.0, &a), 90.0);
    }

    #[test]
    fn partial_excellence_grants_additive_bonuses() {
        let a = analysis(70.0, 4.8, 4.8, 1.0);
        assert_eq!(weather_adjusted_quality(80.0, &a), 84.0);
    }

    #[test]
    fn poor_conditions_apply_the_penalty() {
        let a = analysis(55.0, 3.0, 3.0, 1.0);
        assert_eq!(weather_adjusted_quality(80.0, &a), 70.0);
    }

    #[test]
    fn result_is_always_clamped_to_50_100() {
        let a = analysis(30.0, 1.0, 1.0, 5.0);
        assert_eq!(weather_adjusted_quality(40.0, &a), 50.0);
        let a2 = analysis(99.0, 5.0, 5.0, 0.0);
        assert_eq!(weather_adjusted_quality(99.0, &a2), 100.0);
    }
}
