use thiserror::Error;

use crate::model::{ProgressError, QuizDefinitionError, QuizSessionError, SessionSummaryError};
use crate::recommend::RecommendationSettingsError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    QuizDefinition(#[from] QuizDefinitionError),
    #[error(transparent)]
    QuizSession(#[from] QuizSessionError),
    #[error(transparent)]
    SessionSummary(#[from] SessionSummaryError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    RecommendationSettings(#[from] RecommendationSettingsError),
}
