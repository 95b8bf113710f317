//! Processing of a raw daily weather series into the composite
//! [`WeatherAnalysis`] (§4.3 step 5).

use crate::domain::{WeatherAnalysis, WeatherConfidence};

/// Raw daily series as returned by the weather endpoint, one entry per
/// calendar day of the requested growing-season window.
#[derive(Debug, Clone, Default)]
pub struct DailySeries {
    pub temp_max_c: Vec<f64>,
    pub temp_min_c: Vec<f64>,
    pub temp_mean_c: Vec<f64>,
    pub precipitation_mm: Vec<f64>,
    pub sunshine_hours: Vec<f64>,
    /// Number of days the series was expected to cover (growing season
    /// length); used to compute `sample_completeness`.
    pub expected_days: usize,
}

const GDD_BASE_C: f64 = 10.0;
const HEATWAVE_THRESHOLD_C: f64 = 35.0;
const FROST_THRESHOLD_C: f64 = 0.0;

pub fn process_daily_series(region_token: &str, vineyard_alias: Option<&str>, year: i32, series: &DailySeries) -> WeatherAnalysis {
    let n = series.temp_mean_c.len().max(1) as f64;

    let mean_temp_c = series.temp_mean_c.iter().sum::<f64>() / n;
    let max_temp_c = series.temp_max_c.iter().cloned().fold(f64::MIN, f64::max);
    let min_temp_c = series.temp_min_c.iter().cloned().fold(f64::MAX, f64::min);

    let gdd: f64 = series
        .temp_mean_c
        .iter()
        .map(|t| (t - GDD_BASE_C).max(0.0))
        .sum();

    let total_rainfall_mm: f64 = series.precipitation_mm.iter().sum();

    let heatwave_days = series
        .temp_max_c
        .iter()
        .filter(|&&t| t >= HEATWAVE_THRESHOLD_C)
        .count() as u32;

    let frost_days = series
        .temp_min_c
        .iter()
        .filter(|&&t| t <= FROST_THRESHOLD_C)
        .count() as u32;

    let sunshine_hours: f64 = series.sunshine_hours.iter().sum();

    let diurnal_range_avg_c = series
        .temp_max_c
        .iter()
        .zip(series.temp_min_c.iter())
        .map(|(max, min)| max - min)
        .sum::<f64>()
        / n;

    let sample_completeness = if series.expected_days == 0 {
        1.0
    } else {
        (series.temp_mean_c.len() as f64 / series.expected_days as f64).min(1.0)
    };

    let confidence = if sample_completeness >= 0.9 {
        WeatherConfidence::High
    } else if sample_completeness >= 0.6 {
        WeatherConfidence::Medium
    } else {
        WeatherConfidence::Low
    };

    // GDD proximity to the "ideal" 1200-1600 band, rewarding moderate
    // diurnal range and penalizing heat/frost stress days.
    let gdd_component = if gdd < 1200.0 {
        (gdd / 1200.0) * 40.0
    } else if gdd <= 1600.0 {
        40.0
    } else {
        (40.0 - ((gdd - 1600.0) / 40.0)).max(10.0)
    };
    let diurnal_component = (diurnal_range_avg_c / 15.0 * 25.0).clamp(0.0, 25.0);
    let rainfall_penalty = ((total_rainfall_mm - 500.0).max(0.0) / 50.0).min(15.0);
    let stress_penalty = (heatwave_days as f64 * 1.5 + frost_days as f64 * 1.0).min(20.0);
    let overall_score = (35.0 + gdd_component + diurnal_component - rainfall_penalty - stress_penalty)
        .clamp(0.0, 100.0);

    // Ripeness/acidity/disease sub-factors, each on a 0..5 scale, feeding
    // the weather-adjusted quality formula (§4.4 step 4).
    let ripeness = (gdd / 1600.0 * 5.0).clamp(0.0, 5.0);
    let acidity = (5.0 - heatwave_days as f64 / 8.0 + diurnal_range_avg_c / 20.0).clamp(0.0, 5.0);
    let disease_pressure = (total_rainfall_mm / 200.0).clamp(0.0, 5.0);

    WeatherAnalysis {
        region_token: region_token.to_string(),
        vineyard_alias: vineyard_alias.map(|s| s.to_string()),
        year,
        mean_temp_c,
        max_temp_c,
        min_temp_c,
        gdd,
        total_rainfall_mm,
        heatwave_days,
        frost_days,
        sunshine_hours,
        diurnal_range_avg_c,
        overall_score,
        confidence,
        ripeness,
        acidity,
        disease_pressure,
        sample_completeness,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ideal_series() -> DailySeries {
        let days = 200;
        DailySeries {
            temp_mean_c: vec![18.0; days],
            temp_max_c: vec![26.0; days],
            temp_min_c: vec![12.0; days],
            precipitation_mm: vec![2.0; days],
            sunshine_hours: vec![8.0; days],
            expected_days: days,
        }
    }

    #[test]
    fn produces_high_confidence_for_complete_series() {
        let analysis = process_daily_series("bordeaux", None, 2020, &ideal_series());
        assert_eq!(analysis.confidence, WeatherConfidence::High);
        assert!(analysis.overall_score >= 0.0 && analysis.overall_score <= 100.0);
    }

    #[test]
    fn low_completeness_yields_low_confidence() {
        let mut series = ideal_series();
        series.temp_mean_c.truncate(50);
        series.temp_max_c.truncate(50);
        series.temp_min_c.truncate(50);
        series.precipitation_mm.truncate(50);
        series.sunshine_hours.truncate(50);
        let analysis = process_daily_series("bordeaux", None, 2020, &series);
        assert_eq!(analysis.confidence, WeatherConfidence::Low);
    }

    #[test]
    fn counts_heatwave_and_frost_days() {
        let mut series = ideal_series();
        series.temp_max_c[0] = 36.0;
        series.temp_min_c[1] = -1.0;
        let analysis = process_daily_series("bordeaux", None, 2020, &series);
        assert_eq!(analysis.heatwave_days, 1);
        assert_eq!(analysis.frost_days, 1);
    }
}
