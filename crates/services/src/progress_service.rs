use std::sync::Arc;

use learn_core::aggregate;
use learn_core::model::{ProgressSnapshot, SubjectRecord, SubjectStat, UserId};
use serde::Serialize;
use storage::repository::{ProgressStore, SnapshotRepository};

use crate::Clock;
use crate::error::ProgressServiceError;

/// How many snapshots feed a trend lookup.
const TREND_WINDOW: u32 = 2;

/// A subject stat paired with its change since the previous snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectTrend {
    #[serde(flatten)]
    pub stat: SubjectStat,
    pub delta: Option<i16>,
}

/// Reads and writes subject progress, recording a snapshot after each write.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    store: Arc<dyn ProgressStore>,
    snapshots: Arc<dyn SnapshotRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        store: Arc<dyn ProgressStore>,
        snapshots: Arc<dyn SnapshotRepository>,
    ) -> Self {
        Self {
            clock,
            store,
            snapshots,
        }
    }

    /// Record progress for one subject and return the refreshed stats.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Progress` for out-of-range counts (nothing
    /// is written), or `ProgressServiceError::Storage` on persistence failures.
    pub async fn submit(
        &self,
        user_id: UserId,
        subject: &str,
        completed: u32,
        total: u32,
    ) -> Result<Vec<SubjectStat>, ProgressServiceError> {
        let record = match SubjectRecord::new(user_id, subject, completed, total) {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(%user_id, subject, completed, total, "rejected progress submission: {err}");
                return Err(err.into());
            }
        };
        self.store.upsert(&record).await?;
        tracing::info!(%user_id, subject, completed, total, "progress updated");

        let stats = self.stats(user_id).await?;
        let snapshot = ProgressSnapshot {
            taken_at: self.clock.now(),
            stats: stats.clone(),
        };
        self.snapshots.append_snapshot(user_id, &snapshot).await?;
        Ok(stats)
    }

    /// Current per-subject stats of a user.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if records cannot be read.
    pub async fn stats(&self, user_id: UserId) -> Result<Vec<SubjectStat>, ProgressServiceError> {
        let records = self.store.list_by_user(user_id).await?;
        Ok(aggregate::aggregate(&records))
    }

    /// Change in a subject's percentage between the two latest snapshots.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if snapshots cannot be read.
    pub async fn trend(
        &self,
        user_id: UserId,
        subject: &str,
    ) -> Result<Option<i16>, ProgressServiceError> {
        let snapshots = self.snapshots.list_snapshots(user_id, TREND_WINDOW).await?;
        Ok(aggregate::subject_trend(&snapshots, subject))
    }

    /// Current stats with their trend, for the progress page.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` on read failures.
    pub async fn stats_with_trend(
        &self,
        user_id: UserId,
    ) -> Result<Vec<SubjectTrend>, ProgressServiceError> {
        let stats = self.stats(user_id).await?;
        let snapshots = self.snapshots.list_snapshots(user_id, TREND_WINDOW).await?;
        Ok(stats
            .into_iter()
            .map(|stat| {
                let delta = aggregate::subject_trend(&snapshots, &stat.subject);
                SubjectTrend { stat, delta }
            })
            .collect())
    }
}
