use std::sync::Arc;

use learn_core::model::{
    AnswerRecord, QuizDefinition, QuizProgress, QuizSession, SessionSummary, UserId,
};
use serde::Serialize;
use storage::repository::{QuizResult, QuizResultId, QuizResultRepository};

use crate::Clock;
use crate::error::QuizServiceError;
use crate::progress_service::ProgressService;

/// Result of answering a single question in a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizAnswerResult {
    pub answer: AnswerRecord,
    pub progress: QuizProgress,
    pub is_complete: bool,
}

/// A persisted, finished quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishedQuiz {
    pub result_id: QuizResultId,
    pub summary: SessionSummary,
}

/// Orchestrates a quiz from start to a persisted result.
///
/// The session itself stays with the caller; this service only validates,
/// logs, and writes the finished result back.
#[derive(Clone)]
pub struct QuizLoopService {
    clock: Clock,
    results: Arc<dyn QuizResultRepository>,
    progress: Arc<ProgressService>,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        results: Arc<dyn QuizResultRepository>,
        progress: Arc<ProgressService>,
    ) -> Self {
        Self {
            clock,
            results,
            progress,
        }
    }

    /// Start a new session over `definition`.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Session` if the definition is malformed.
    pub fn start(&self, definition: QuizDefinition) -> Result<QuizSession, QuizServiceError> {
        let title = definition.title.clone();
        let session = QuizSession::new(definition).inspect_err(|err| {
            tracing::warn!(quiz = %title, "rejected quiz definition: {err}");
        })?;
        tracing::debug!(quiz = %title, questions = session.question_count(), "quiz started");
        Ok(session)
    }

    /// Answer the current question of `session`.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Session` if the session rejects the answer;
    /// the session is left unchanged.
    pub fn answer_current(
        &self,
        session: &mut QuizSession,
        selected_index: usize,
    ) -> Result<QuizAnswerResult, QuizServiceError> {
        let index = session.current_index();
        let answer = session.submit_answer(selected_index).inspect_err(|err| {
            tracing::warn!(index, selected_index, "rejected answer: {err}");
        })?;
        tracing::debug!(index, selected_index, correct = answer.is_correct, "answer recorded");

        Ok(QuizAnswerResult {
            answer,
            progress: session.progress(),
            is_complete: session.is_complete(),
        })
    }

    /// Finalize a completed session and persist its result.
    ///
    /// The session is consumed, so one run yields exactly one stored result.
    /// If the quiz names a subject, the score is then written back as that
    /// subject's progress (`completed = score`, `total = question count`).
    /// The two writes are separate: if the write-back fails, the stored
    /// result stays and the error is returned.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Session` (`IncompleteSession`) while questions
    /// remain, or storage errors from persistence.
    pub async fn finish(
        &self,
        session: QuizSession,
        user_id: UserId,
    ) -> Result<FinishedQuiz, QuizServiceError> {
        let summary = session.finalize()?;
        let definition = session.definition();

        let result = QuizResult {
            user_id,
            title: definition.title.clone(),
            subject: definition.subject.clone(),
            difficulty: definition.difficulty,
            completed_at: self.clock.now(),
            summary: summary.clone(),
        };
        let result_id = self.results.append_result(&result).await?;
        tracing::info!(
            %user_id,
            quiz = %definition.title,
            score = summary.score(),
            total = summary.total(),
            percentage = summary.percentage(),
            "quiz completed"
        );

        if let Some(subject) = &definition.subject {
            let completed = u32::try_from(summary.score()).unwrap_or(u32::MAX);
            let total = u32::try_from(summary.total()).unwrap_or(u32::MAX);
            self.progress
                .submit(user_id, subject, completed, total)
                .await?;
        }

        Ok(FinishedQuiz { result_id, summary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use learn_core::model::{Difficulty, Question, QuestionId, QuizSessionError};
    use learn_core::time::fixed_now;
    use storage::repository::Storage;

    fn definition(subject: Option<&str>) -> QuizDefinition {
        let questions = (1..=3)
            .map(|id| {
                Question::new(
                    QuestionId::new(id),
                    format!("Q{id}"),
                    vec!["a".into(), "b".into(), "c".into()],
                    0,
                    "",
                )
            })
            .collect();
        let quiz = QuizDefinition::new("Algebra", Difficulty::Medium, questions);
        match subject {
            Some(s) => quiz.with_subject(s),
            None => quiz,
        }
    }

    fn build() -> (QuizLoopService, Arc<ProgressService>, Storage) {
        let clock = Clock::fixed(fixed_now());
        let storage = Storage::in_memory();
        let progress = Arc::new(ProgressService::new(
            clock,
            storage.progress.clone(),
            storage.snapshots.clone(),
        ));
        let svc = QuizLoopService::new(clock, storage.quiz_results.clone(), progress.clone());
        (svc, progress, storage)
    }

    #[test]
    fn answer_reports_progress() {
        let (svc, _, _) = build();
        let mut session = svc.start(definition(None)).unwrap();

        let res = svc.answer_current(&mut session, 0).unwrap();
        assert!(res.answer.is_correct);
        assert_eq!(res.progress.answered, 1);
        assert_eq!(res.progress.remaining, 2);
        assert!(!res.is_complete);
    }

    #[test]
    fn rejected_answer_surfaces_session_error() {
        let (svc, _, _) = build();
        let mut session = svc.start(definition(None)).unwrap();

        let err = svc.answer_current(&mut session, 7).unwrap_err();
        assert!(matches!(
            err,
            QuizServiceError::Session(QuizSessionError::InvalidOption { selected: 7, len: 3 })
        ));
        assert_eq!(session.current_index(), 0);
    }

    #[tokio::test]
    async fn finish_before_complete_fails() {
        let (svc, _, storage) = build();
        let mut session = svc.start(definition(None)).unwrap();
        svc.answer_current(&mut session, 0).unwrap();

        let err = svc.finish(session, UserId::new(1)).await.unwrap_err();
        assert!(matches!(
            err,
            QuizServiceError::Session(QuizSessionError::IncompleteSession)
        ));
        assert_eq!(storage.quiz_results.count_results(UserId::new(1)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn finish_persists_result_and_writes_back_subject() {
        let (svc, progress, storage) = build();
        let user = UserId::new(1);
        let mut session = svc.start(definition(Some("Математика"))).unwrap();
        for pick in [0, 1, 0] {
            svc.answer_current(&mut session, pick).unwrap();
        }

        let finished = svc.finish(session, user).await.unwrap();
        assert_eq!(finished.summary.score(), 2);
        assert_eq!(finished.summary.percentage(), 67);

        let stored = storage.quiz_results.get_result(finished.result_id).await.unwrap();
        assert_eq!(stored.summary, finished.summary);
        assert_eq!(stored.completed_at, fixed_now());
        assert_eq!(storage.quiz_results.count_results(user).await.unwrap(), 1);

        let stats = progress.stats(user).await.unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].subject, "Математика");
        assert_eq!(stats[0].completed, 2);
        assert_eq!(stats[0].total, 3);
    }

    #[tokio::test]
    async fn finish_without_subject_leaves_progress_alone() {
        let (svc, progress, _) = build();
        let user = UserId::new(1);
        let mut session = svc.start(definition(None)).unwrap();
        for pick in [0, 0, 0] {
            svc.answer_current(&mut session, pick).unwrap();
        }

        svc.finish(session, user).await.unwrap();
        assert!(progress.stats(user).await.unwrap().is_empty());
    }
}
