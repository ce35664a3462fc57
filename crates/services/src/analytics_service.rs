use std::sync::Arc;

use learn_core::aggregate;
use learn_core::model::{ProgressOverview, UserId};
use storage::repository::{ProgressStore, QuizResultRepository};

use crate::error::AnalyticsServiceError;

/// Dashboard totals computed from stored records.
#[derive(Clone)]
pub struct AnalyticsService {
    store: Arc<dyn ProgressStore>,
    results: Arc<dyn QuizResultRepository>,
}

impl AnalyticsService {
    #[must_use]
    pub fn new(store: Arc<dyn ProgressStore>, results: Arc<dyn QuizResultRepository>) -> Self {
        Self { store, results }
    }

    /// # Errors
    ///
    /// Returns `AnalyticsServiceError::Storage` on read failures.
    pub async fn overview(
        &self,
        user_id: UserId,
    ) -> Result<ProgressOverview, AnalyticsServiceError> {
        let records = self.store.list_by_user(user_id).await?;
        let quizzes = self.results.count_results(user_id).await?;
        Ok(aggregate::overview(&aggregate::aggregate(&records), quizzes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use learn_core::model::SubjectRecord;
    use storage::repository::Storage;

    #[tokio::test]
    async fn overview_is_derived_from_records() {
        let storage = Storage::in_memory();
        let user = UserId::new(1);
        for (subject, completed) in [("Математика", 28), ("Физика", 35), ("Химия", 22)] {
            storage
                .progress
                .upsert(&SubjectRecord::new(user, subject, completed, 40).unwrap())
                .await
                .unwrap();
        }
        let svc = AnalyticsService::new(storage.progress, storage.quiz_results);

        let overview = svc.overview(UserId::new(1)).await.unwrap();
        assert_eq!(overview.subjects, 3);
        // 70, 88, 55
        assert_eq!(overview.average_progress, 71);
        // 85 / 120
        assert_eq!(overview.completion_rate, 71);
        assert_eq!(overview.total_quizzes, 0);
    }

    #[tokio::test]
    async fn no_records_means_zeroed_overview() {
        let storage = Storage::in_memory();
        let svc = AnalyticsService::new(storage.progress, storage.quiz_results);

        let overview = svc.overview(UserId::new(1)).await.unwrap();
        assert_eq!(overview.subjects, 0);
        assert_eq!(overview.average_progress, 0);
        assert_eq!(overview.completion_rate, 0);
    }
}
