//! Folding subject records into percentages, trends and dashboard totals.

use crate::model::{
    ProgressError, ProgressOverview, ProgressSnapshot, SubjectRecord, SubjectStat, UserId,
    mastery_percentage,
};

/// Collapse records into one stat per subject.
///
/// Subjects keep the order of their first appearance. Records sharing a
/// subject (several users) are summed before the percentage is taken.
#[must_use]
pub fn aggregate(records: &[SubjectRecord]) -> Vec<SubjectStat> {
    let mut totals: Vec<(&str, u64, u64)> = Vec::new();

    for record in records {
        let completed = u64::from(record.completed());
        let total = u64::from(record.total());
        match totals.iter_mut().find(|(s, _, _)| *s == record.subject()) {
            Some(entry) => {
                entry.1 += completed;
                entry.2 += total;
            }
            None => totals.push((record.subject(), completed, total)),
        }
    }

    totals
        .into_iter()
        .map(|(subject, completed, total)| SubjectStat {
            subject: subject.to_owned(),
            percentage: mastery_percentage(completed, total),
            completed: u32::try_from(completed).unwrap_or(u32::MAX),
            total: u32::try_from(total).unwrap_or(u32::MAX),
        })
        .collect()
}

/// Insert or overwrite the record for `(user_id, subject)`.
///
/// An existing record takes the new counts as-is; nothing is merged.
///
/// # Errors
///
/// Returns `ProgressError::InvalidRange` if `completed > total` or `total == 0`,
/// leaving `records` untouched.
pub fn upsert(
    records: &mut Vec<SubjectRecord>,
    user_id: UserId,
    subject: &str,
    completed: u32,
    total: u32,
) -> Result<(), ProgressError> {
    match records.iter_mut().find(|r| r.matches(user_id, subject)) {
        Some(existing) => existing.set_counts(completed, total),
        None => {
            records.push(SubjectRecord::new(user_id, subject, completed, total)?);
            Ok(())
        }
    }
}

/// Signed change between the two most recent percentages of one subject.
///
/// `history` is ordered oldest first. Returns `None` with fewer than two points.
#[must_use]
pub fn trend(history: &[SubjectStat]) -> Option<i16> {
    match history {
        [.., previous, latest] => Some(i16::from(latest.percentage) - i16::from(previous.percentage)),
        _ => None,
    }
}

/// [`trend`] for `subject` across full snapshots, skipping snapshots that lack it.
#[must_use]
pub fn subject_trend(snapshots: &[ProgressSnapshot], subject: &str) -> Option<i16> {
    let history: Vec<SubjectStat> = snapshots
        .iter()
        .filter_map(|snapshot| snapshot.stats.iter().find(|s| s.subject == subject))
        .cloned()
        .collect();
    trend(&history)
}

/// Dashboard totals derived from real stats.
#[must_use]
pub fn overview(stats: &[SubjectStat], total_quizzes: u64) -> ProgressOverview {
    let lessons_completed: u64 = stats.iter().map(|s| u64::from(s.completed)).sum();
    let lessons_total: u64 = stats.iter().map(|s| u64::from(s.total)).sum();
    let percentage_sum: u64 = stats.iter().map(|s| u64::from(s.percentage)).sum();

    ProgressOverview {
        subjects: stats.len(),
        average_progress: mastery_percentage(percentage_sum, 100 * stats.len() as u64),
        completion_rate: mastery_percentage(lessons_completed, lessons_total),
        lessons_completed,
        lessons_total,
        total_quizzes,
    }
}
