#![forbid(unsafe_code)]

pub mod analytics_service;
pub mod app_services;
pub mod error;
pub mod progress_service;
pub mod quizzes;
pub mod recommendation_service;

pub use learn_core::Clock;

pub use analytics_service::AnalyticsService;
pub use app_services::AppServices;
pub use error::{
    AnalyticsServiceError, AppServicesError, ProgressServiceError, QuizServiceError,
    RecommendationServiceError,
};
pub use progress_service::{ProgressService, SubjectTrend};
pub use quizzes::{FinishedQuiz, QuizAnswerResult, QuizLoopService};
pub use recommendation_service::RecommendationService;
