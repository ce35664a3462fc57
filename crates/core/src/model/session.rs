use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::progress::mastery_percentage;
use crate::model::quiz::{Question, QuizDefinition, QuizDefinitionError};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Contract violations surfaced by the quiz state machine.
///
/// A rejected call never changes the session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizSessionError {
    #[error("quiz session is already complete")]
    InvalidState,

    #[error("question {index} was already answered")]
    DuplicateAnswer { index: usize },

    #[error("question {got} answered out of order, expected question {expected}")]
    OutOfOrder { expected: usize, got: usize },

    #[error("option {selected} does not exist, question has {len} options")]
    InvalidOption { selected: usize, len: usize },

    #[error("quiz session is not complete yet")]
    IncompleteSession,

    #[error(transparent)]
    InvalidDefinition(#[from] QuizDefinitionError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionSummaryError {
    #[error("score ({score}) does not match correct answers ({correct})")]
    ScoreMismatch { score: usize, correct: usize },

    #[error("total ({total}) does not match answered questions ({answered})")]
    CountMismatch { total: usize, answered: usize },
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    InProgress,
    Complete,
}

/// The learner's pick for one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub selected_index: usize,
    pub is_correct: bool,
}

/// Aggregated view of how far a session has advanced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub is_complete: bool,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One run through a quiz definition, first question to last.
///
/// Questions are answered strictly in definition order. The session moves
/// from `InProgress` to `Complete` when the last question is answered and
/// accepts no answers afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSession {
    definition: QuizDefinition,
    current_index: usize,
    answers: BTreeMap<usize, AnswerRecord>,
    score: usize,
    state: SessionState,
}

impl QuizSession {
    /// Start a session over a validated definition.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::InvalidDefinition` if the definition breaks
    /// its structural invariants.
    pub fn new(definition: QuizDefinition) -> Result<Self, QuizSessionError> {
        definition.validate()?;
        Ok(Self {
            definition,
            current_index: 0,
            answers: BTreeMap::new(),
            score: 0,
            state: SessionState::InProgress,
        })
    }

    #[must_use]
    pub fn definition(&self) -> &QuizDefinition {
        &self.definition
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn score(&self) -> usize {
        self.score
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == SessionState::Complete
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.definition.question_count()
    }

    /// The question waiting for an answer, `None` once complete.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        match self.state {
            SessionState::InProgress => self.definition.questions.get(self.current_index),
            SessionState::Complete => None,
        }
    }

    #[must_use]
    pub fn answer_for(&self, index: usize) -> Option<&AnswerRecord> {
        self.answers.get(&index)
    }

    #[must_use]
    pub fn progress(&self) -> QuizProgress {
        let total = self.question_count();
        let answered = self.answers.len();
        QuizProgress {
            total,
            answered,
            remaining: total.saturating_sub(answered),
            is_complete: self.is_complete(),
        }
    }

    /// Answer the current question and advance.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` once complete, `DuplicateAnswer` if the current
    /// question already holds an answer, `InvalidOption` if `selected_index`
    /// is not one of its options.
    pub fn submit_answer(&mut self, selected_index: usize) -> Result<AnswerRecord, QuizSessionError> {
        self.answer(self.current_index, selected_index)
    }

    /// Answer the question at `index`, which must be the current one.
    ///
    /// Callers holding a possibly stale view of the session (a double click
    /// in a UI, a retried request) name the question they mean, so a repeat
    /// is rejected as a duplicate instead of landing on the next question.
    ///
    /// # Errors
    ///
    /// Same as [`QuizSession::submit_answer`], plus `OutOfOrder` when `index`
    /// is ahead of the current question.
    pub fn answer(
        &mut self,
        index: usize,
        selected_index: usize,
    ) -> Result<AnswerRecord, QuizSessionError> {
        if self.is_complete() {
            return Err(QuizSessionError::InvalidState);
        }
        if self.answers.contains_key(&index) {
            return Err(QuizSessionError::DuplicateAnswer { index });
        }
        if index != self.current_index {
            return Err(QuizSessionError::OutOfOrder {
                expected: self.current_index,
                got: index,
            });
        }
        let question = self
            .definition
            .questions
            .get(index)
            .ok_or(QuizSessionError::InvalidState)?;
        let len = question.option_count();
        if selected_index >= len {
            return Err(QuizSessionError::InvalidOption {
                selected: selected_index,
                len,
            });
        }

        let record = AnswerRecord {
            selected_index,
            is_correct: question.is_correct(selected_index),
        };
        self.answers.insert(index, record);
        if record.is_correct {
            self.score += 1;
        }
        self.current_index += 1;
        if self.current_index >= self.question_count() {
            self.state = SessionState::Complete;
        }

        Ok(record)
    }

    /// Summarize a completed session.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::IncompleteSession` while questions remain.
    pub fn finalize(&self) -> Result<SessionSummary, QuizSessionError> {
        if !self.is_complete() {
            return Err(QuizSessionError::IncompleteSession);
        }

        let per_question = self
            .definition
            .questions
            .iter()
            .enumerate()
            .map(|(index, question)| {
                let answer = self
                    .answers
                    .get(&index)
                    .copied()
                    .ok_or(QuizSessionError::IncompleteSession)?;
                Ok(QuestionOutcome {
                    question: question.clone(),
                    answer,
                    is_correct: answer.is_correct,
                })
            })
            .collect::<Result<Vec<_>, QuizSessionError>>()?;

        Ok(SessionSummary::from_outcomes(per_question))
    }
}

//
// ─── SUMMARY ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOutcome {
    pub question: Question,
    pub answer: AnswerRecord,
    pub is_correct: bool,
}

/// Result of a finished quiz session.
///
/// `score` always equals the number of correct outcomes and `total` the
/// number of outcomes; deserialization goes through the same check as
/// [`SessionSummary::from_persisted`] and recomputes `percentage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawSessionSummary")]
pub struct SessionSummary {
    score: usize,
    total: usize,
    percentage: u8,
    per_question: Vec<QuestionOutcome>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSessionSummary {
    score: usize,
    total: usize,
    per_question: Vec<QuestionOutcome>,
}

impl TryFrom<RawSessionSummary> for SessionSummary {
    type Error = SessionSummaryError;

    fn try_from(raw: RawSessionSummary) -> Result<Self, Self::Error> {
        Self::from_persisted(raw.score, raw.total, raw.per_question)
    }
}

impl SessionSummary {
    fn from_outcomes(per_question: Vec<QuestionOutcome>) -> Self {
        let score = per_question.iter().filter(|o| o.is_correct).count();
        let total = per_question.len();
        Self {
            score,
            total,
            percentage: mastery_percentage(score as u64, total as u64),
            per_question,
        }
    }

    /// Rehydrate a summary from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `SessionSummaryError` if the counts disagree with the outcomes.
    pub fn from_persisted(
        score: usize,
        total: usize,
        per_question: Vec<QuestionOutcome>,
    ) -> Result<Self, SessionSummaryError> {
        if total != per_question.len() {
            return Err(SessionSummaryError::CountMismatch {
                total,
                answered: per_question.len(),
            });
        }
        let correct = per_question.iter().filter(|o| o.is_correct).count();
        if correct != score {
            return Err(SessionSummaryError::ScoreMismatch { score, correct });
        }
        Ok(Self::from_outcomes(per_question))
    }

    #[must_use]
    pub fn score(&self) -> usize {
        self.score
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    #[must_use]
    pub fn incorrect(&self) -> usize {
        self.total.saturating_sub(self.score)
    }

    #[must_use]
    pub fn percentage(&self) -> u8 {
        self.percentage
    }

    #[must_use]
    pub fn per_question(&self) -> &[QuestionOutcome] {
        &self.per_question
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::QuestionId;
    use crate::model::quiz::Difficulty;

    fn quiz(correct: &[usize]) -> QuizDefinition {
        let questions = correct
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                Question::new(
                    QuestionId::new(i as u64 + 1),
                    format!("Q{}", i + 1),
                    vec!["a".into(), "b".into(), "c".into(), "d".into()],
                    c,
                    "explained",
                )
            })
            .collect();
        QuizDefinition::new("Математика - Алгебра", Difficulty::Medium, questions)
    }

    #[test]
    fn three_question_scenario_scores_and_completes() {
        let mut session = QuizSession::new(quiz(&[0, 0, 0])).unwrap();

        assert!(session.submit_answer(0).unwrap().is_correct);
        assert!(!session.submit_answer(1).unwrap().is_correct);
        assert_eq!(session.state(), SessionState::InProgress);
        assert!(session.submit_answer(0).unwrap().is_correct);
        assert_eq!(session.state(), SessionState::Complete);

        assert_eq!(
            session.submit_answer(0).unwrap_err(),
            QuizSessionError::InvalidState
        );

        let summary = session.finalize().unwrap();
        assert_eq!(summary.score(), 2);
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.percentage(), 67);
        assert_eq!(summary.incorrect(), 1);
    }

    #[test]
    fn duplicate_answer_is_rejected_without_side_effects() {
        let mut session = QuizSession::new(quiz(&[1, 2])).unwrap();
        session.answer(0, 1).unwrap();

        let err = session.answer(0, 1).unwrap_err();
        assert_eq!(err, QuizSessionError::DuplicateAnswer { index: 0 });
        assert_eq!(session.score(), 1);
        assert_eq!(session.current_index(), 1);
    }

    #[test]
    fn answering_ahead_is_out_of_order() {
        let mut session = QuizSession::new(quiz(&[1, 2])).unwrap();
        let err = session.answer(1, 2).unwrap_err();
        assert_eq!(err, QuizSessionError::OutOfOrder { expected: 0, got: 1 });
        assert_eq!(session.current_index(), 0);
    }

    #[test]
    fn invalid_option_does_not_advance() {
        let mut session = QuizSession::new(quiz(&[0])).unwrap();
        let err = session.submit_answer(4).unwrap_err();
        assert_eq!(err, QuizSessionError::InvalidOption { selected: 4, len: 4 });
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.score(), 0);
        assert!(session.answer_for(0).is_none());
    }

    #[test]
    fn finalize_before_complete_fails() {
        let mut session = QuizSession::new(quiz(&[0, 0])).unwrap();
        session.submit_answer(0).unwrap();
        assert_eq!(
            session.finalize().unwrap_err(),
            QuizSessionError::IncompleteSession
        );
    }

    #[test]
    fn malformed_definition_fails_at_construction() {
        let err = QuizSession::new(quiz(&[])).unwrap_err();
        assert!(matches!(
            err,
            QuizSessionError::InvalidDefinition(QuizDefinitionError::NoQuestions)
        ));
    }

    #[test]
    fn progress_tracks_answered_and_remaining() {
        let mut session = QuizSession::new(quiz(&[0, 1, 2])).unwrap();
        session.submit_answer(3).unwrap();
        let progress = session.progress();
        assert_eq!(progress.total, 3);
        assert_eq!(progress.answered, 1);
        assert_eq!(progress.remaining, 2);
        assert!(!progress.is_complete);
        assert_eq!(session.current_question().unwrap().prompt, "Q2");
    }

    #[test]
    fn summary_score_equals_correct_flags_for_every_answer_pattern() {
        let correct = [0, 1, 2];
        for a in 0..4 {
            for b in 0..4 {
                for c in 0..4 {
                    let mut session = QuizSession::new(quiz(&correct)).unwrap();
                    for pick in [a, b, c] {
                        session.submit_answer(pick).unwrap();
                    }
                    let summary = session.finalize().unwrap();
                    let flags = summary
                        .per_question()
                        .iter()
                        .filter(|o| o.is_correct)
                        .count();
                    assert_eq!(flags, summary.score());
                    assert_eq!(summary.score(), session.score());
                }
            }
        }
    }

    #[test]
    fn persisted_summary_must_be_consistent() {
        let mut session = QuizSession::new(quiz(&[0, 0])).unwrap();
        session.submit_answer(0).unwrap();
        session.submit_answer(1).unwrap();
        let summary = session.finalize().unwrap();

        let restored =
            SessionSummary::from_persisted(1, 2, summary.per_question().to_vec()).unwrap();
        assert_eq!(restored, summary);

        let err = SessionSummary::from_persisted(2, 2, summary.per_question().to_vec())
            .unwrap_err();
        assert_eq!(err, SessionSummaryError::ScoreMismatch { score: 2, correct: 1 });
    }

    #[test]
    fn deserializing_checks_summary_consistency() {
        let err = serde_json::from_str::<SessionSummary>(
            r#"{"score":5,"total":1,"percentage":250,"perQuestion":[]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("does not match"));

        let mut session = QuizSession::new(quiz(&[0, 1])).unwrap();
        session.submit_answer(0).unwrap();
        session.submit_answer(0).unwrap();
        let summary = session.finalize().unwrap();

        let mut json = serde_json::to_value(&summary).unwrap();
        json["percentage"] = 99.into();
        let restored: SessionSummary = serde_json::from_value(json).unwrap();
        assert_eq!(restored, summary);
        assert_eq!(restored.percentage(), 50);
        assert_eq!(restored.incorrect(), 1);
    }
}
