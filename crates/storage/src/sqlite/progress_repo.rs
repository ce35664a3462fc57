use learn_core::model::{SubjectRecord, UserId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, ser, u32_from_i64, user_id_from_i64, user_id_to_i64};
use crate::repository::{ProgressStore, StorageError};

fn map_record_row(row: &sqlx::sqlite::SqliteRow) -> Result<SubjectRecord, StorageError> {
    let user_id = user_id_from_i64(row.try_get::<i64, _>("user_id").map_err(ser)?)?;
    let subject: String = row.try_get("subject").map_err(ser)?;
    let completed = u32_from_i64("completed", row.try_get::<i64, _>("completed").map_err(ser)?)?;
    let total = u32_from_i64("total", row.try_get::<i64, _>("total").map_err(ser)?)?;

    SubjectRecord::new(user_id, subject, completed, total).map_err(ser)
}

#[async_trait::async_trait]
impl ProgressStore for SqliteRepository {
    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<SubjectRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT user_id, subject, completed, total
                FROM subject_progress
                WHERE user_id = ?1
                ORDER BY id ASC
            ",
        )
        .bind(user_id_to_i64(user_id)?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_record_row).collect()
    }

    async fn upsert(&self, record: &SubjectRecord) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO subject_progress (user_id, subject, completed, total)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(user_id, subject) DO UPDATE SET
                    completed = excluded.completed,
                    total = excluded.total
            ",
        )
        .bind(user_id_to_i64(record.user_id())?)
        .bind(record.subject())
        .bind(i64::from(record.completed()))
        .bind(i64::from(record.total()))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }
}
