use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::UserId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("invalid progress range: completed {completed} of total {total}")]
    InvalidRange { completed: u32, total: u32 },

    #[error("subject name cannot be empty")]
    EmptySubject,
}

/// Rounds `100 * part / whole` to the nearest whole percent, halves rounding up.
///
/// Returns 0 when `whole` is zero and saturates at 100.
#[must_use]
pub fn mastery_percentage(part: u64, whole: u64) -> u8 {
    if whole == 0 {
        return 0;
    }
    let part = part.min(whole);
    let rounded = (200 * u128::from(part) + u128::from(whole)) / (2 * u128::from(whole));
    u8::try_from(rounded).unwrap_or(100)
}

//
// ─── SUBJECT RECORD ────────────────────────────────────────────────────────────
//

/// Lesson completion for one subject of one user.
///
/// Constructed only through [`SubjectRecord::new`], so `completed <= total`
/// and `total > 0` always hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawSubjectRecord")]
pub struct SubjectRecord {
    user_id: UserId,
    subject: String,
    completed: u32,
    total: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSubjectRecord {
    user_id: UserId,
    subject: String,
    completed: u32,
    total: u32,
}

impl TryFrom<RawSubjectRecord> for SubjectRecord {
    type Error = ProgressError;

    fn try_from(raw: RawSubjectRecord) -> Result<Self, Self::Error> {
        Self::new(raw.user_id, raw.subject, raw.completed, raw.total)
    }
}

impl SubjectRecord {
    /// # Errors
    ///
    /// Returns `ProgressError::InvalidRange` if `total` is zero or `completed > total`.
    /// Returns `ProgressError::EmptySubject` if the subject name is blank.
    pub fn new(
        user_id: UserId,
        subject: impl Into<String>,
        completed: u32,
        total: u32,
    ) -> Result<Self, ProgressError> {
        let subject = subject.into();
        if subject.trim().is_empty() {
            return Err(ProgressError::EmptySubject);
        }
        check_range(completed, total)?;
        Ok(Self {
            user_id,
            subject,
            completed,
            total,
        })
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn completed(&self) -> u32 {
        self.completed
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn percentage(&self) -> u8 {
        mastery_percentage(u64::from(self.completed), u64::from(self.total))
    }

    /// Overwrite the counts of this record.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::InvalidRange` and leaves the record untouched
    /// if the new counts are out of range.
    pub fn set_counts(&mut self, completed: u32, total: u32) -> Result<(), ProgressError> {
        check_range(completed, total)?;
        self.completed = completed;
        self.total = total;
        Ok(())
    }

    #[must_use]
    pub fn matches(&self, user_id: UserId, subject: &str) -> bool {
        self.user_id == user_id && self.subject == subject
    }
}

fn check_range(completed: u32, total: u32) -> Result<(), ProgressError> {
    if total == 0 || completed > total {
        return Err(ProgressError::InvalidRange { completed, total });
    }
    Ok(())
}

//
// ─── AGGREGATES ────────────────────────────────────────────────────────────────
//

/// Per-subject completion, the unit consumed by charts and recommendations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectStat {
    pub subject: String,
    pub percentage: u8,
    pub completed: u32,
    pub total: u32,
}

impl SubjectStat {
    #[must_use]
    pub fn from_counts(subject: impl Into<String>, completed: u32, total: u32) -> Self {
        Self {
            subject: subject.into(),
            percentage: mastery_percentage(u64::from(completed), u64::from(total)),
            completed,
            total,
        }
    }
}

/// Aggregate stats captured at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub taken_at: chrono::DateTime<chrono::Utc>,
    pub stats: Vec<SubjectStat>,
}

/// Dashboard totals derived from subject stats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressOverview {
    pub subjects: usize,
    pub average_progress: u8,
    pub completion_rate: u8,
    pub lessons_completed: u64,
    pub lessons_total: u64,
    pub total_quizzes: u64,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
