use async_trait::async_trait;
use chrono::{DateTime, Utc};
use learn_core::aggregate;
use learn_core::model::{Difficulty, ProgressSnapshot, SessionSummary, SubjectRecord, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape of a finished quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub user_id: UserId,
    pub title: String,
    pub subject: Option<String>,
    pub difficulty: Difficulty,
    pub completed_at: DateTime<Utc>,
    pub summary: SessionSummary,
}

/// Storage identifier for a persisted quiz result.
pub type QuizResultId = i64;

/// Subject progress per user.
///
/// Records come back in the order they were first inserted; an upsert of an
/// existing `(user, subject)` pair keeps its position.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// All records of one user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the records cannot be read.
    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<SubjectRecord>, StorageError>;

    /// Insert the record, or overwrite counts of the existing `(user, subject)` record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn upsert(&self, record: &SubjectRecord) -> Result<(), StorageError>;
}

/// History of aggregate snapshots, used for trend display.
#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the snapshot cannot be stored.
    async fn append_snapshot(
        &self,
        user_id: UserId,
        snapshot: &ProgressSnapshot,
    ) -> Result<(), StorageError>;

    /// The most recent `limit` snapshots, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if snapshots cannot be read.
    async fn list_snapshots(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<ProgressSnapshot>, StorageError>;
}

#[async_trait]
pub trait QuizResultRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the result cannot be stored.
    async fn append_result(&self, result: &QuizResult) -> Result<QuizResultId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_result(&self, id: QuizResultId) -> Result<QuizResult, StorageError>;

    /// Most recently completed result of a user, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if results cannot be read.
    async fn latest_result(&self, user_id: UserId) -> Result<Option<QuizResult>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if results cannot be counted.
    async fn count_results(&self, user_id: UserId) -> Result<u64, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    records: Arc<Mutex<Vec<SubjectRecord>>>,
    snapshots: Arc<Mutex<HashMap<UserId, Vec<ProgressSnapshot>>>>,
    results: Arc<Mutex<Vec<(QuizResultId, QuizResult)>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl ProgressStore for InMemoryRepository {
    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<SubjectRecord>, StorageError> {
        let guard = self.records.lock().map_err(poisoned)?;
        Ok(guard
            .iter()
            .filter(|r| r.user_id() == user_id)
            .cloned()
            .collect())
    }

    async fn upsert(&self, record: &SubjectRecord) -> Result<(), StorageError> {
        let mut guard = self.records.lock().map_err(poisoned)?;
        aggregate::upsert(
            &mut guard,
            record.user_id(),
            record.subject(),
            record.completed(),
            record.total(),
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl SnapshotRepository for InMemoryRepository {
    async fn append_snapshot(
        &self,
        user_id: UserId,
        snapshot: &ProgressSnapshot,
    ) -> Result<(), StorageError> {
        let mut guard = self.snapshots.lock().map_err(poisoned)?;
        guard.entry(user_id).or_default().push(snapshot.clone());
        Ok(())
    }

    async fn list_snapshots(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<ProgressSnapshot>, StorageError> {
        let guard = self.snapshots.lock().map_err(poisoned)?;
        let history = guard.get(&user_id).map(Vec::as_slice).unwrap_or_default();
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let skip = history.len().saturating_sub(limit);
        Ok(history[skip..].to_vec())
    }
}

#[async_trait]
impl QuizResultRepository for InMemoryRepository {
    async fn append_result(&self, result: &QuizResult) -> Result<QuizResultId, StorageError> {
        let mut guard = self.results.lock().map_err(poisoned)?;
        let id = guard.last().map_or(1, |(id, _)| id + 1);
        guard.push((id, result.clone()));
        Ok(id)
    }

    async fn get_result(&self, id: QuizResultId) -> Result<QuizResult, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        guard
            .iter()
            .find(|(row_id, _)| *row_id == id)
            .map(|(_, result)| result.clone())
            .ok_or(StorageError::NotFound)
    }

    async fn latest_result(&self, user_id: UserId) -> Result<Option<QuizResult>, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        Ok(guard
            .iter()
            .filter(|(_, r)| r.user_id == user_id)
            .max_by_key(|(id, r)| (r.completed_at, *id))
            .map(|(_, r)| r.clone()))
    }

    async fn count_results(&self, user_id: UserId) -> Result<u64, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        Ok(guard.iter().filter(|(_, r)| r.user_id == user_id).count() as u64)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressStore>,
    pub snapshots: Arc<dyn SnapshotRepository>,
    pub quiz_results: Arc<dyn QuizResultRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let progress: Arc<dyn ProgressStore> = Arc::new(repo.clone());
        let snapshots: Arc<dyn SnapshotRepository> = Arc::new(repo.clone());
        let quiz_results: Arc<dyn QuizResultRepository> = Arc::new(repo);
        Self {
            progress,
            snapshots,
            quiz_results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use learn_core::model::SubjectStat;
    use learn_core::time::fixed_now;

    fn record(user: u64, subject: &str, completed: u32, total: u32) -> SubjectRecord {
        SubjectRecord::new(UserId::new(user), subject, completed, total).unwrap()
    }

    #[tokio::test]
    async fn upsert_keeps_insertion_order_and_overwrites() {
        let repo = InMemoryRepository::new();
        repo.upsert(&record(1, "Математика", 28, 40)).await.unwrap();
        repo.upsert(&record(1, "Физика", 35, 40)).await.unwrap();
        repo.upsert(&record(2, "Химия", 1, 40)).await.unwrap();
        repo.upsert(&record(1, "Математика", 30, 40)).await.unwrap();

        let mine = repo.list_by_user(UserId::new(1)).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].subject(), "Математика");
        assert_eq!(mine[0].completed(), 30);
        assert_eq!(mine[1].subject(), "Физика");
    }

    #[tokio::test]
    async fn snapshots_are_limited_to_most_recent() {
        let repo = InMemoryRepository::new();
        let user = UserId::new(1);
        for (i, completed) in [10_u32, 20, 30].into_iter().enumerate() {
            let snapshot = ProgressSnapshot {
                taken_at: fixed_now() + Duration::days(i as i64),
                stats: vec![SubjectStat::from_counts("Math", completed, 40)],
            };
            repo.append_snapshot(user, &snapshot).await.unwrap();
        }

        let last_two = repo.list_snapshots(user, 2).await.unwrap();
        assert_eq!(last_two.len(), 2);
        assert_eq!(last_two[0].stats[0].completed, 20);
        assert_eq!(last_two[1].stats[0].completed, 30);
        assert!(repo.list_snapshots(UserId::new(9), 5).await.unwrap().is_empty());
    }

    #[test]
    fn quiz_result_with_inconsistent_summary_is_rejected() {
        let json = r#"{
            "userId": 1,
            "title": "Алгебра",
            "subject": null,
            "difficulty": "medium",
            "completedAt": "2023-11-14T22:13:20Z",
            "summary": {"score": 5, "total": 1, "percentage": 250, "perQuestion": []}
        }"#;
        let err = serde_json::from_str::<QuizResult>(json).unwrap_err();
        assert!(err.to_string().contains("does not match"), "{err}");
    }

    #[test]
    fn repository_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<InMemoryRepository>();
    }
}
