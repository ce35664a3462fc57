//! Ranking low-mastery subjects into practice recommendations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Difficulty, SessionSummary, SubjectStat};

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RecommendationSettingsError {
    #[error("attention threshold must be between 0 and 100, got {0}")]
    InvalidThreshold(u8),

    #[error("max recommendations must be > 0")]
    InvalidMaxCount,
}

/// Tuning for recommendation derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecommendationSettings {
    attention_threshold: u8,
    max_count: usize,
}

impl RecommendationSettings {
    pub const DEFAULT_ATTENTION_THRESHOLD: u8 = 80;
    pub const DEFAULT_MAX_COUNT: usize = 3;

    /// # Errors
    ///
    /// Returns an error if the threshold exceeds 100 or `max_count` is zero.
    pub fn new(attention_threshold: u8, max_count: usize) -> Result<Self, RecommendationSettingsError> {
        if attention_threshold > 100 {
            return Err(RecommendationSettingsError::InvalidThreshold(attention_threshold));
        }
        if max_count == 0 {
            return Err(RecommendationSettingsError::InvalidMaxCount);
        }
        Ok(Self {
            attention_threshold,
            max_count,
        })
    }

    #[must_use]
    pub fn attention_threshold(&self) -> u8 {
        self.attention_threshold
    }

    #[must_use]
    pub fn max_count(&self) -> usize {
        self.max_count
    }
}

impl Default for RecommendationSettings {
    fn default() -> Self {
        Self {
            attention_threshold: Self::DEFAULT_ATTENTION_THRESHOLD,
            max_count: Self::DEFAULT_MAX_COUNT,
        }
    }
}

//
// ─── ENTRY ─────────────────────────────────────────────────────────────────────
//

/// A suggestion pointing the learner at one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationEntry {
    pub subject: String,
    pub title: String,
    pub difficulty: Difficulty,
    pub estimated_time: String,
    pub rationale: String,
}

impl RecommendationEntry {
    fn for_stat(stat: &SubjectStat, needs_attention: bool) -> Self {
        let difficulty = remedial_difficulty(stat.percentage);
        let advice = if needs_attention {
            "targeted practice recommended"
        } else {
            "a short review keeps it fresh"
        };
        Self {
            subject: stat.subject.clone(),
            title: title(difficulty, &stat.subject),
            difficulty,
            estimated_time: estimated_time(difficulty).to_owned(),
            rationale: format!("Current mastery {}% — {advice}", stat.percentage),
        }
    }
}

/// Effort a subject warrants: the lower the mastery, the harder the practice.
#[must_use]
pub fn remedial_difficulty(percentage: u8) -> Difficulty {
    match percentage {
        0..=59 => Difficulty::Hard,
        60..=79 => Difficulty::Medium,
        _ => Difficulty::Easy,
    }
}

#[must_use]
pub fn estimated_time(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Easy => "30 мин",
        Difficulty::Medium => "45 мин",
        Difficulty::Hard => "60 мин",
    }
}

fn title(difficulty: Difficulty, subject: &str) -> String {
    match difficulty {
        Difficulty::Hard => format!("Rebuild foundations in {subject}"),
        Difficulty::Medium => format!("Strengthen {subject}"),
        Difficulty::Easy => format!("Keep {subject} sharp"),
    }
}

//
// ─── DERIVATION ────────────────────────────────────────────────────────────────
//

/// [`derive_with_threshold`] using the default attention threshold.
#[must_use]
pub fn derive(stats: &[SubjectStat], max_count: usize) -> Vec<RecommendationEntry> {
    derive_with_threshold(
        stats,
        max_count,
        RecommendationSettings::DEFAULT_ATTENTION_THRESHOLD,
    )
}

/// Rank subjects for practice, weakest first.
///
/// Subjects under `attention_threshold` come first; remaining slots are
/// filled with the next-weakest subjects above it, so the result holds
/// `min(max_count, stats.len())` entries. Ties keep input order.
#[must_use]
pub fn derive_with_threshold(
    stats: &[SubjectStat],
    max_count: usize,
    attention_threshold: u8,
) -> Vec<RecommendationEntry> {
    let mut ranked: Vec<&SubjectStat> = stats.iter().collect();
    // Stable sort: candidates under the threshold lead, fill-ups follow.
    ranked.sort_by_key(|s| s.percentage);
    ranked.truncate(max_count);

    ranked
        .into_iter()
        .map(|s| RecommendationEntry::for_stat(s, s.percentage < attention_threshold))
        .collect()
}

/// Fold a finished quiz into `stats` as the current stat of `subject`.
///
/// The quiz result replaces the stored stat of `subject`, or adds the
/// subject if it has no stat yet.
#[must_use]
pub fn merge_quiz(
    stats: &[SubjectStat],
    subject: &str,
    summary: &SessionSummary,
) -> Vec<SubjectStat> {
    let mut merged = stats.to_vec();
    let score = u32::try_from(summary.score()).unwrap_or(u32::MAX);
    let total = u32::try_from(summary.total()).unwrap_or(u32::MAX);
    let quiz_stat = SubjectStat::from_counts(subject, score, total);
    match merged.iter_mut().find(|s| s.subject == subject) {
        Some(existing) => *existing = quiz_stat,
        None => merged.push(quiz_stat),
    }
    merged
}

/// Derive with a just-finished quiz folded in through [`merge_quiz`].
#[must_use]
pub fn derive_with_quiz(
    stats: &[SubjectStat],
    latest_quiz: Option<(&str, &SessionSummary)>,
    settings: &RecommendationSettings,
) -> Vec<RecommendationEntry> {
    let merged = match latest_quiz {
        Some((subject, summary)) => merge_quiz(stats, subject, summary),
        None => stats.to_vec(),
    };
    derive_with_threshold(&merged, settings.max_count(), settings.attention_threshold())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Question, QuestionId, QuizDefinition, QuizSession};

    fn stat(subject: &str, percentage: u8) -> SubjectStat {
        SubjectStat {
            subject: subject.into(),
            percentage,
            completed: u32::from(percentage),
            total: 100,
        }
    }

    #[test]
    fn derives_weakest_subjects_first() {
        let stats = vec![stat("Math", 70), stat("Physics", 87), stat("Chem", 55)];
        let out = derive(&stats, 2);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].subject, "Chem");
        assert_eq!(out[0].difficulty, Difficulty::Hard);
        assert_eq!(out[1].subject, "Math");
        assert_eq!(out[1].difficulty, Difficulty::Medium);
    }

    #[test]
    fn entries_are_fully_templated() {
        let out = derive(&[stat("Химия", 55)], 1);
        assert_eq!(
            out,
            vec![RecommendationEntry {
                subject: "Химия".into(),
                title: "Rebuild foundations in Химия".into(),
                difficulty: Difficulty::Hard,
                estimated_time: "60 мин".into(),
                rationale: "Current mastery 55% — targeted practice recommended".into(),
            }]
        );
    }

    #[test]
    fn fills_free_slots_above_threshold() {
        let stats = vec![stat("Physics", 95), stat("Math", 70), stat("Biology", 85)];
        let out = derive(&stats, 3);

        let subjects: Vec<_> = out.iter().map(|e| e.subject.as_str()).collect();
        assert_eq!(subjects, ["Math", "Biology", "Physics"]);
        assert_eq!(out[1].difficulty, Difficulty::Easy);
        assert_eq!(out[1].estimated_time, "30 мин");
        assert_eq!(
            out[1].rationale,
            "Current mastery 85% — a short review keeps it fresh"
        );
    }

    #[test]
    fn length_is_min_of_max_and_len_and_sorted() {
        let stats = vec![stat("A", 90), stat("B", 10), stat("C", 60), stat("D", 79)];
        for max in 0..6 {
            let out = derive(&stats, max);
            assert_eq!(out.len(), max.min(stats.len()));
            let percentages: Vec<u8> = out
                .iter()
                .map(|e| stats.iter().find(|s| s.subject == e.subject).unwrap().percentage)
                .collect();
            assert!(percentages.windows(2).all(|w| w[0] <= w[1]));
        }
        assert!(derive(&[], 3).is_empty());
    }

    #[test]
    fn ties_keep_input_order() {
        let stats = vec![stat("B", 50), stat("A", 50)];
        let out = derive(&stats, 2);
        assert_eq!(out[0].subject, "B");
        assert_eq!(out[1].subject, "A");
    }

    #[test]
    fn difficulty_boundaries() {
        assert_eq!(remedial_difficulty(59), Difficulty::Hard);
        assert_eq!(remedial_difficulty(60), Difficulty::Medium);
        assert_eq!(remedial_difficulty(79), Difficulty::Medium);
        assert_eq!(remedial_difficulty(80), Difficulty::Easy);
        assert_eq!(estimated_time(Difficulty::Medium), "45 мин");
    }

    #[test]
    fn settings_validate_bounds() {
        assert!(RecommendationSettings::new(101, 3).is_err());
        assert_eq!(
            RecommendationSettings::new(80, 0).unwrap_err(),
            RecommendationSettingsError::InvalidMaxCount
        );
        let defaults = RecommendationSettings::default();
        assert_eq!(defaults.attention_threshold(), 80);
        assert_eq!(defaults.max_count(), 3);
    }

    #[test]
    fn quiz_result_overrides_subject_percentage() {
        let questions = (0..4)
            .map(|i| {
                Question::new(
                    QuestionId::new(i),
                    format!("Q{i}"),
                    vec!["a".into(), "b".into()],
                    0,
                    "",
                )
            })
            .collect();
        let mut session = QuizSession::new(QuizDefinition::new(
            "Physics check",
            Difficulty::Medium,
            questions,
        ))
        .unwrap();
        for pick in [0, 1, 1, 1] {
            session.submit_answer(pick).unwrap();
        }
        let summary = session.finalize().unwrap();

        let stats = vec![stat("Math", 70), stat("Physics", 87)];
        let settings = RecommendationSettings::new(80, 1).unwrap();
        let out = derive_with_quiz(&stats, Some(("Physics", &summary)), &settings);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].subject, "Physics");
        assert_eq!(out[0].difficulty, Difficulty::Hard);
        assert_eq!(out[0].rationale, "Current mastery 25% — targeted practice recommended");

        let merged = merge_quiz(&stats, "Physics", &summary);
        assert_eq!(merged[1], SubjectStat::from_counts("Physics", 1, 4));
        assert_eq!(merged[0], stats[0]);

        let out = derive_with_quiz(&stats, Some(("Biology", &summary)), &settings);
        assert_eq!(out[0].subject, "Biology");

        let out = derive_with_quiz(&stats, None, &settings);
        assert_eq!(out[0].subject, "Math");
    }

    #[test]
    fn threshold_only_changes_the_rationale() {
        let stats = vec![stat("Math", 70)];
        let strict = derive_with_threshold(&stats, 1, 60);
        let lenient = derive_with_threshold(&stats, 1, 80);
        assert_eq!(strict[0].subject, lenient[0].subject);
        assert!(strict[0].rationale.ends_with("a short review keeps it fresh"));
        assert!(lenient[0].rationale.ends_with("targeted practice recommended"));
    }
}
