use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row per submission (§3). Facet ratings are all optional and, when
/// present, range 1..5.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub id: Uuid,
    pub recommendation_id: Uuid,
    pub user_id: Option<String>,
    pub overall_rating: u8,
    pub flavor_harmony: Option<u8>,
    pub texture_balance: Option<u8>,
    pub acidity_match: Option<u8>,
    pub tannin_balance: Option<u8>,
    pub body_match: Option<u8>,
    pub regional_tradition: Option<u8>,
    pub selected: bool,
    pub time_to_decision_ms: Option<u64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Feedback {
    pub fn facet_ratings(&self) -> Vec<(&'static str, u8)> {
        let mut out = Vec::new();
        if let Some(v) = self.flavor_harmony {
            out.push(("flavor_harmony", v));
        }
        if let Some(v) = self.texture_balance {
            out.push(("texture_balance", v));
        }
        if let Some(v) = self.acidity_match {
            out.push(("acidity_match", v));
        }
        if let Some(v) = self.tannin_balance {
            out.push(("tannin_balance", v));
        }
        if let Some(v) = self.body_match {
            out.push(("body_match", v));
        }
        if let Some(v) = self.regional_tradition {
            out.push(("regional_tradition", v));
        }
        out
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::CellarError;

        let check = |name: &str, v: u8| -> crate::error::Result<()> {
            if !(1..=5).contains(&v) {
                return Err(CellarError::validation(format!(
                    "{name} must be in 1..=5, got {v}"
                )));
            }
            Ok(())
        };

        check("overall_rating", self.overall_rating)?;
        for (name, v) in self.facet_ratings() {
            check(name, v)?;
        }
        Ok(())
    }
}
