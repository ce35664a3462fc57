use std::sync::Arc;

use learn_core::recommend::RecommendationSettings;
use storage::repository::Storage;

use crate::Clock;
use crate::analytics_service::AnalyticsService;
use crate::error::AppServicesError;
use crate::progress_service::ProgressService;
use crate::quizzes::QuizLoopService;
use crate::recommendation_service::RecommendationService;

/// Assembles the dashboard services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    progress: Arc<ProgressService>,
    quizzes: Arc<QuizLoopService>,
    recommendations: Arc<RecommendationService>,
    analytics: Arc<AnalyticsService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        settings: RecommendationSettings,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, settings))
    }

    /// Build services over in-memory storage.
    #[must_use]
    pub fn in_memory(clock: Clock, settings: RecommendationSettings) -> Self {
        Self::from_storage(&Storage::in_memory(), clock, settings)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, settings: RecommendationSettings) -> Self {
        let progress = Arc::new(ProgressService::new(
            clock,
            Arc::clone(&storage.progress),
            Arc::clone(&storage.snapshots),
        ));
        let quizzes = Arc::new(QuizLoopService::new(
            clock,
            Arc::clone(&storage.quiz_results),
            Arc::clone(&progress),
        ));
        let recommendations = Arc::new(RecommendationService::new(
            settings,
            Arc::clone(&storage.progress),
        ));
        let analytics = Arc::new(AnalyticsService::new(
            Arc::clone(&storage.progress),
            Arc::clone(&storage.quiz_results),
        ));

        Self {
            progress,
            quizzes,
            recommendations,
            analytics,
        }
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn quizzes(&self) -> Arc<QuizLoopService> {
        Arc::clone(&self.quizzes)
    }

    #[must_use]
    pub fn recommendations(&self) -> Arc<RecommendationService> {
        Arc::clone(&self.recommendations)
    }

    #[must_use]
    pub fn analytics(&self) -> Arc<AnalyticsService> {
        Arc::clone(&self.analytics)
    }
}
