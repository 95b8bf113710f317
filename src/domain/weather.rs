use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Confidence tier for a weather analysis, driven by sample completeness
/// (§4.3 step 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum WeatherConfidence {
    Low,
    Medium,
    High,
}

/// Processed daily-series output for one (region, year) — the payload
/// persisted into `WeatherCache` (§3, §4.3 step 5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherAnalysis {
    pub region_token: String,
    pub vineyard_alias: Option<String>,
    pub year: i32,
    pub mean_temp_c: f64,
    pub max_temp_c: f64,
    pub min_temp_c: f64,
    /// Growing degree days, base 10C.
    pub gdd: f64,
    pub total_rainfall_mm: f64,
    pub heatwave_days: u32,
    pub frost_days: u32,
    pub sunshine_hours: f64,
    pub diurnal_range_avg_c: f64,
    /// 0..100 composite.
    pub overall_score: f64,
    pub confidence: WeatherConfidence,
    /// Ripeness/acidity/disease sub-factors used by the quality adjustment
    /// formula (§4.4 step 4), each on a 0..5 scale.
    pub ripeness: f64,
    pub acidity: f64,
    pub disease_pressure: f64,
    pub sample_completeness: f64,
}

/// A row in the `WeatherCache` table (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherCacheEntry {
    pub region_token: String,
    pub year: i32,
    pub vineyard_alias: Option<String>,
    pub payload: WeatherAnalysis,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
