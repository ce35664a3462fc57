use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Reasons a quiz definition is rejected when a session is started from it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizDefinitionError {
    #[error("quiz title cannot be empty")]
    EmptyTitle,

    #[error("quiz has no questions")]
    NoQuestions,

    #[error("question {index} has an empty prompt")]
    EmptyPrompt { index: usize },

    #[error("question {index} needs at least two options, got {len}")]
    TooFewOptions { index: usize, len: usize },

    #[error("question {index} marks option {correct_index} as correct but has {len} options")]
    CorrectIndexOutOfRange {
        index: usize,
        correct_index: usize,
        len: usize,
    },

    #[error("unknown difficulty: {0}")]
    UnknownDifficulty(String),
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

/// Three-level difficulty shared by quizzes and recommendations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = QuizDefinitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(QuizDefinitionError::UnknownDifficulty(other.to_owned())),
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub explanation: String,
}

impl Question {
    #[must_use]
    pub fn new(
        id: QuestionId,
        prompt: impl Into<String>,
        options: Vec<String>,
        correct_index: usize,
        explanation: impl Into<String>,
    ) -> Self {
        Self {
            id,
            prompt: prompt.into(),
            options,
            correct_index,
            explanation: explanation.into(),
        }
    }

    #[must_use]
    pub fn is_correct(&self, selected_index: usize) -> bool {
        selected_index == self.correct_index
    }

    #[must_use]
    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    fn validate(&self, index: usize) -> Result<(), QuizDefinitionError> {
        if self.prompt.trim().is_empty() {
            return Err(QuizDefinitionError::EmptyPrompt { index });
        }
        let len = self.options.len();
        if len < 2 {
            return Err(QuizDefinitionError::TooFewOptions { index, len });
        }
        if self.correct_index >= len {
            return Err(QuizDefinitionError::CorrectIndexOutOfRange {
                index,
                correct_index: self.correct_index,
                len,
            });
        }
        Ok(())
    }
}

//
// ─── DEFINITION ────────────────────────────────────────────────────────────────
//

/// Quiz content as supplied by a content source.
///
/// The definition is plain data; its invariants are checked by
/// [`QuizDefinition::validate`], which `QuizSession::new` calls before a
/// session can start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizDefinition {
    pub title: String,
    pub difficulty: Difficulty,
    /// Subject a finished session reports back to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub questions: Vec<Question>,
}

impl QuizDefinition {
    #[must_use]
    pub fn new(title: impl Into<String>, difficulty: Difficulty, questions: Vec<Question>) -> Self {
        Self {
            title: title.into(),
            difficulty,
            subject: None,
            questions,
        }
    }

    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Check the structural invariants of the definition.
    ///
    /// # Errors
    ///
    /// Returns the first `QuizDefinitionError` found, scanning questions in order.
    pub fn validate(&self) -> Result<(), QuizDefinitionError> {
        if self.title.trim().is_empty() {
            return Err(QuizDefinitionError::EmptyTitle);
        }
        if self.questions.is_empty() {
            return Err(QuizDefinitionError::NoQuestions);
        }
        for (index, question) in self.questions.iter().enumerate() {
            question.validate(index)?;
        }
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
