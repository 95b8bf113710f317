use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A vintage belongs to exactly one [`super::Wine`] (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vintage {
    pub id: Uuid,
    pub wine_id: Uuid,
    pub year: i32,
    pub quality_score: Option<f64>,
    pub weather_score: Option<f64>,
    pub critic_score: Option<f64>,
    pub peak_drinking_start: Option<i32>,
    pub peak_drinking_end: Option<i32>,
    /// Typed replacement for the source's overloaded `production_notes`
    /// column (§9 DESIGN NOTES): structured weather analysis JSON.
    pub weather_json: Option<serde_json::Value>,
    /// Structured procurement recommendation JSON.
    pub procurement_json: Option<serde_json::Value>,
    /// Free-form notes, kept separate from the structured columns above.
    pub notes_text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub enriched_at: Option<DateTime<Utc>>,
}

impl Vintage {
    pub fn new(wine_id: Uuid, year: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            wine_id,
            year,
            quality_score: None,
            weather_score: None,
            critic_score: None,
            peak_drinking_start: None,
            peak_drinking_end: None,
            weather_json: None,
            procurement_json: None,
            notes_text: None,
            created_at: Utc::now(),
            enriched_at: None,
        }
    }

    pub fn validate_year(year: i32, current_year: i32) -> bool {
        (1800..=current_year).contains(&year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_years_outside_the_valid_range() {
        assert!(!Vintage::validate_year(1799, 2026));
        assert!(Vintage::validate_year(1800, 2026));
        assert!(Vintage::validate_year(2026, 2026));
        assert!(!Vintage::validate_year(2027, 2026));
    }
}
