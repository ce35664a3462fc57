use learn_core::model::{ProgressSnapshot, SubjectStat, UserId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, ser, user_id_to_i64};
use crate::repository::{SnapshotRepository, StorageError};

#[async_trait::async_trait]
impl SnapshotRepository for SqliteRepository {
    async fn append_snapshot(
        &self,
        user_id: UserId,
        snapshot: &ProgressSnapshot,
    ) -> Result<(), StorageError> {
        let stats = serde_json::to_string(&snapshot.stats).map_err(ser)?;

        sqlx::query(
            r"
                INSERT INTO progress_snapshots (user_id, taken_at, stats)
                VALUES (?1, ?2, ?3)
            ",
        )
        .bind(user_id_to_i64(user_id)?)
        .bind(snapshot.taken_at)
        .bind(stats)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn list_snapshots(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<ProgressSnapshot>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT taken_at, stats
                FROM progress_snapshots
                WHERE user_id = ?1
                ORDER BY taken_at DESC, id DESC
                LIMIT ?2
            ",
        )
        .bind(user_id_to_i64(user_id)?)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows.iter().rev() {
            let stats: String = row.try_get("stats").map_err(ser)?;
            out.push(ProgressSnapshot {
                taken_at: row.try_get("taken_at").map_err(ser)?,
                stats: serde_json::from_str::<Vec<SubjectStat>>(&stats).map_err(ser)?,
            });
        }
        Ok(out)
    }
}
