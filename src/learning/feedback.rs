//! Feedback ingestion (§4.8 "Feedback ingestion"): validates facet ratings
//! are in range and appends one row per submission.

use std::sync::Arc;

use crate::domain::Feedback;
use crate::error::Result;
use crate::storage::repository::FeedbackRepository;

#[derive(Clone)]
pub struct FeedbackIngestion {
    repo: Arc<FeedbackRepository>,
}

impl FeedbackIngestion {
    pub fn new(repo: Arc<FeedbackRepository>) -> Self {
        Self { repo }
    }

    pub async fn submit(&self, feedback: Feedback) -> Result<Feedback> {
        feedback.validate()?;
        self.repo.create(&feedback).await?;
        Ok(feedback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::database::DatabaseConfig;
    use crate::storage::Db;
    use chrono::Utc;
    use uuid::Uuid;

    fn sample() -> Feedback {
        Feedback {
            id: Uuid::new_v4(),
            recommendation_id: Uuid::new_v4(),
            user_id: Some("user-1".to_string()),
            overall_rating: 4,
            flavor_harmony: Some(5),
            texture_balance: Some(3),
            acidity_match: None,
            tannin_balance: None,
            body_match: None,
            regional_tradition: Some(4),
            selected: true,
            time_to_decision_ms: Some(2500),
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn rejects_out_of_range_ratings() {
        let db = Db::connect(&DatabaseConfig::default()).await.unwrap();
        let repo = Arc::new(FeedbackRepository::new(db.pool().clone()));
        let ingestion = FeedbackIngestion::new(repo);

        let mut bad = sample();
        bad.overall_rating = 9;
        assert!(ingestion.submit(bad).await.is_err());
    }

    #[tokio::test]
    async fn accepts_and_persists_valid_feedback() {
        let db = Db::connect(&DatabaseConfig::default()).await.unwrap();
        let repo = Arc::new(FeedbackRepository::new(db.pool().clone()));
        let ingestion = FeedbackIngestion::new(repo.clone());

        let feedback = sample();
        let recommendation_id = feedback.recommendation_id;
        ingestion.submit(feedback).await.unwrap();

        let stored = repo.for_recommendation(recommendation_id).await.unwrap();
        assert_eq!(stored.len(), 1);
    }
}
