mod ids;
mod progress;
mod quiz;
mod session;

pub use ids::{ParseIdError, QuestionId, UserId};

pub use progress::{
    ProgressError, ProgressOverview, ProgressSnapshot, SubjectRecord, SubjectStat,
    mastery_percentage,
};
pub use quiz::{Difficulty, Question, QuizDefinition, QuizDefinitionError};
pub use session::{
    AnswerRecord, QuestionOutcome, QuizProgress, QuizSession, QuizSessionError, SessionState,
    SessionSummary, SessionSummaryError,
};
