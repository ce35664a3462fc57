use std::sync::Arc;

use learn_core::aggregate;
use learn_core::model::UserId;
use learn_core::recommend::{self, RecommendationEntry, RecommendationSettings};
use storage::repository::ProgressStore;

use crate::error::RecommendationServiceError;

/// Derives practice recommendations from stored progress.
#[derive(Clone)]
pub struct RecommendationService {
    settings: RecommendationSettings,
    store: Arc<dyn ProgressStore>,
}

impl RecommendationService {
    #[must_use]
    pub fn new(settings: RecommendationSettings, store: Arc<dyn ProgressStore>) -> Self {
        Self { settings, store }
    }

    #[must_use]
    pub fn settings(&self) -> &RecommendationSettings {
        &self.settings
    }

    /// Recommendations for a user under the configured settings.
    ///
    /// Ranked from stored progress only. A finished quiz with a subject is
    /// already written back as that subject's progress, so a later
    /// submission for the subject takes precedence over the quiz.
    ///
    /// # Errors
    ///
    /// Returns `RecommendationServiceError::Storage` on read failures.
    pub async fn recommend(
        &self,
        user_id: UserId,
    ) -> Result<Vec<RecommendationEntry>, RecommendationServiceError> {
        self.recommend_with(user_id, &self.settings).await
    }

    /// Same as [`RecommendationService::recommend`] with per-call settings.
    ///
    /// # Errors
    ///
    /// Returns `RecommendationServiceError::Storage` on read failures.
    pub async fn recommend_with(
        &self,
        user_id: UserId,
        settings: &RecommendationSettings,
    ) -> Result<Vec<RecommendationEntry>, RecommendationServiceError> {
        let records = self.store.list_by_user(user_id).await?;
        let stats = aggregate::aggregate(&records);
        let entries = recommend::derive_with_threshold(
            &stats,
            settings.max_count(),
            settings.attention_threshold(),
        );
        tracing::debug!(
            %user_id,
            subjects = stats.len(),
            recommendations = entries.len(),
            "recommendations derived"
        );
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use learn_core::model::{Difficulty, SubjectRecord};
    use storage::repository::Storage;

    async fn seeded() -> Storage {
        let storage = Storage::in_memory();
        let user = UserId::new(1);
        for (subject, completed) in [("Математика", 28), ("Физика", 35), ("Химия", 22)] {
            storage
                .progress
                .upsert(&SubjectRecord::new(user, subject, completed, 40).unwrap())
                .await
                .unwrap();
        }
        storage
    }

    #[tokio::test]
    async fn recommends_weakest_subjects() {
        let storage = seeded().await;
        let svc =
            RecommendationService::new(RecommendationSettings::new(80, 2).unwrap(), storage.progress);

        let entries = svc.recommend(UserId::new(1)).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].subject, "Химия");
        assert_eq!(entries[0].difficulty, Difficulty::Hard);
        assert_eq!(entries[1].subject, "Математика");
        assert_eq!(entries[1].difficulty, Difficulty::Medium);
    }

    #[tokio::test]
    async fn unknown_user_gets_nothing() {
        let storage = seeded().await;
        let svc = RecommendationService::new(RecommendationSettings::default(), storage.progress);
        assert!(svc.recommend(UserId::new(9)).await.unwrap().is_empty());
    }
}
