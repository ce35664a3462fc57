mod workflow;

// Public API of the quiz subsystem.
pub use crate::error::QuizServiceError;
pub use workflow::{FinishedQuiz, QuizAnswerResult, QuizLoopService};
