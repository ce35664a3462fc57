use learn_core::model::{Difficulty, QuestionOutcome, SessionSummary, UserId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, ser, user_id_from_i64, user_id_to_i64, usize_from_i64, usize_to_i64};
use crate::repository::{QuizResult, QuizResultId, QuizResultRepository, StorageError};

fn map_result_row(row: &sqlx::sqlite::SqliteRow) -> Result<QuizResult, StorageError> {
    let user_id = user_id_from_i64(row.try_get::<i64, _>("user_id").map_err(ser)?)?;
    let difficulty: Difficulty = row
        .try_get::<String, _>("difficulty")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let score = usize_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?;
    let total = usize_from_i64("total", row.try_get::<i64, _>("total").map_err(ser)?)?;
    let outcomes: String = row.try_get("outcomes").map_err(ser)?;
    let per_question: Vec<QuestionOutcome> = serde_json::from_str(&outcomes).map_err(ser)?;

    Ok(QuizResult {
        user_id,
        title: row.try_get("title").map_err(ser)?,
        subject: row.try_get("subject").map_err(ser)?,
        difficulty,
        completed_at: row.try_get("completed_at").map_err(ser)?,
        summary: SessionSummary::from_persisted(score, total, per_question).map_err(ser)?,
    })
}

#[async_trait::async_trait]
impl QuizResultRepository for SqliteRepository {
    async fn append_result(&self, result: &QuizResult) -> Result<QuizResultId, StorageError> {
        let outcomes = serde_json::to_string(result.summary.per_question()).map_err(ser)?;

        let res = sqlx::query(
            r"
                INSERT INTO quiz_results (
                    user_id, title, subject, difficulty,
                    score, total, completed_at, outcomes
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(user_id_to_i64(result.user_id)?)
        .bind(result.title.as_str())
        .bind(result.subject.as_deref())
        .bind(result.difficulty.as_str())
        .bind(usize_to_i64("score", result.summary.score())?)
        .bind(usize_to_i64("total", result.summary.total())?)
        .bind(result.completed_at)
        .bind(outcomes)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(res.last_insert_rowid())
    }

    async fn get_result(&self, id: QuizResultId) -> Result<QuizResult, StorageError> {
        let row = sqlx::query(
            r"
                SELECT user_id, title, subject, difficulty, score, total, completed_at, outcomes
                FROM quiz_results
                WHERE id = ?1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        map_result_row(&row)
    }

    async fn latest_result(&self, user_id: UserId) -> Result<Option<QuizResult>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT user_id, title, subject, difficulty, score, total, completed_at, outcomes
                FROM quiz_results
                WHERE user_id = ?1
                ORDER BY completed_at DESC, id DESC
                LIMIT 1
            ",
        )
        .bind(user_id_to_i64(user_id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_result_row).transpose()
    }

    async fn count_results(&self, user_id: UserId) -> Result<u64, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quiz_results WHERE user_id = ?1")
            .bind(user_id_to_i64(user_id)?)
            .fetch_one(&self.pool)
            .await
            .map_err(conn)?;

        u64::try_from(count).map_err(ser)
    }
}
