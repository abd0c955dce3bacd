use chrono::{DateTime, Utc};
use lms_core::model::{
    AssessmentAttempt, AssessmentId, AttemptId, AttemptQuestion, AttemptQuestionId, AttemptStatus,
    OptionId, QuestionId, UserAnswer, UserId,
};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    conn, id_i64, map_answer_row, map_attempt_question_row, map_attempt_row, ser,
};
use crate::repository::{AnswerChange, AttemptRepository, Reselect, StorageError};

fn new_id(field: &'static str, rowid: i64) -> Result<u64, StorageError> {
    u64::try_from(rowid).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn create_attempt(
        &self,
        user_id: UserId,
        assessment_id: AssessmentId,
        started_at: DateTime<Utc>,
        questions: &[QuestionId],
    ) -> Result<(AssessmentAttempt, Vec<AttemptQuestion>), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let res = sqlx::query(
            r"
            INSERT INTO assessment_attempts (user_id, assessment_id, status, start_time, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .bind(id_i64("assessment_id", assessment_id.value())?)
        .bind(AttemptStatus::InProgress.as_str())
        .bind(started_at)
        .bind(started_at)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;
        let attempt_id = AttemptId::new(new_id("attempt_id", res.last_insert_rowid())?);

        let mut snapshot = Vec::with_capacity(questions.len());
        for question_id in questions {
            let res = sqlx::query(
                r"
                INSERT INTO attempt_questions (attempt_id, question_id)
                VALUES (?1, ?2)
                ",
            )
            .bind(id_i64("attempt_id", attempt_id.value())?)
            .bind(id_i64("question_id", question_id.value())?)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

            snapshot.push(AttemptQuestion {
                id: AttemptQuestionId::new(new_id(
                    "attempt_question_id",
                    res.last_insert_rowid(),
                )?),
                attempt_id,
                question_id: *question_id,
            });
        }

        tx.commit().await.map_err(conn)?;

        let attempt = AssessmentAttempt::start(attempt_id, user_id, assessment_id, started_at);
        Ok((attempt, snapshot))
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<Option<AssessmentAttempt>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, assessment_id, status, start_time, created_at
            FROM assessment_attempts
            WHERE id = ?1
            ",
        )
        .bind(id_i64("attempt_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_attempt_row).transpose()
    }

    async fn latest_attempt(
        &self,
        user_id: UserId,
        assessment_id: AssessmentId,
    ) -> Result<Option<AssessmentAttempt>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, assessment_id, status, start_time, created_at
            FROM assessment_attempts
            WHERE user_id = ?1 AND assessment_id = ?2
            ORDER BY id DESC
            LIMIT 1
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .bind(id_i64("assessment_id", assessment_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_attempt_row).transpose()
    }

    async fn update_attempt(&self, attempt: &AssessmentAttempt) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE assessment_attempts
            SET status = ?2, start_time = ?3
            WHERE id = ?1
            ",
        )
        .bind(id_i64("attempt_id", attempt.id().value())?)
        .bind(attempt.status().as_str())
        .bind(attempt.start_time())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn attempt_questions(
        &self,
        attempt_id: AttemptId,
    ) -> Result<Vec<AttemptQuestion>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, attempt_id, question_id
            FROM attempt_questions
            WHERE attempt_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_i64("attempt_id", attempt_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_attempt_question_row).collect()
    }

    async fn answers_for_attempt(
        &self,
        attempt_id: AttemptId,
    ) -> Result<Vec<UserAnswer>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, attempt_id, attempt_question_id, option_id
            FROM user_answers
            WHERE attempt_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_i64("attempt_id", attempt_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_answer_row).collect()
    }

    async fn toggle_answer(
        &self,
        attempt_id: AttemptId,
        attempt_question_id: AttemptQuestionId,
        option_id: OptionId,
    ) -> Result<AnswerChange, StorageError> {
        let attempt = id_i64("attempt_id", attempt_id.value())?;
        let question = id_i64("attempt_question_id", attempt_question_id.value())?;
        let option = id_i64("option_id", option_id.value())?;

        let mut tx = self.pool.begin().await.map_err(conn)?;

        let removed = sqlx::query(
            r"
            DELETE FROM user_answers
            WHERE attempt_id = ?1 AND attempt_question_id = ?2 AND option_id = ?3
            ",
        )
        .bind(attempt)
        .bind(question)
        .bind(option)
        .execute(&mut *tx)
        .await
        .map_err(conn)?
        .rows_affected();

        let change = if removed > 0 {
            AnswerChange::Cleared
        } else {
            sqlx::query(
                r"
                INSERT INTO user_answers (attempt_id, attempt_question_id, option_id)
                VALUES (?1, ?2, ?3)
                ",
            )
            .bind(attempt)
            .bind(question)
            .bind(option)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
            AnswerChange::Selected
        };

        tx.commit().await.map_err(conn)?;
        Ok(change)
    }

    async fn select_exclusive_answer(
        &self,
        attempt_id: AttemptId,
        attempt_question_id: AttemptQuestionId,
        option_id: OptionId,
        reselect: Reselect,
    ) -> Result<AnswerChange, StorageError> {
        let attempt = id_i64("attempt_id", attempt_id.value())?;
        let question = id_i64("attempt_question_id", attempt_question_id.value())?;
        let option = id_i64("option_id", option_id.value())?;

        let mut tx = self.pool.begin().await.map_err(conn)?;

        let rows = sqlx::query(
            r"
            SELECT option_id
            FROM user_answers
            WHERE attempt_id = ?1 AND attempt_question_id = ?2
            ",
        )
        .bind(attempt)
        .bind(question)
        .fetch_all(&mut *tx)
        .await
        .map_err(conn)?;

        let mut already_selected = false;
        let mut has_others = false;
        for row in &rows {
            let selected: i64 = row.try_get("option_id").map_err(ser)?;
            if selected == option {
                already_selected = true;
            } else {
                has_others = true;
            }
        }

        let change = if already_selected && !has_others && reselect == Reselect::Clear {
            sqlx::query(
                r"
                DELETE FROM user_answers
                WHERE attempt_id = ?1 AND attempt_question_id = ?2
                ",
            )
            .bind(attempt)
            .bind(question)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
            AnswerChange::Cleared
        } else {
            if has_others {
                sqlx::query(
                    r"
                    DELETE FROM user_answers
                    WHERE attempt_id = ?1 AND attempt_question_id = ?2 AND option_id <> ?3
                    ",
                )
                .bind(attempt)
                .bind(question)
                .bind(option)
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
            }
            if !already_selected {
                sqlx::query(
                    r"
                    INSERT INTO user_answers (attempt_id, attempt_question_id, option_id)
                    VALUES (?1, ?2, ?3)
                    ",
                )
                .bind(attempt)
                .bind(question)
                .bind(option)
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
            }
            if already_selected && !has_others {
                AnswerChange::Unchanged
            } else {
                AnswerChange::Selected
            }
        };

        tx.commit().await.map_err(conn)?;
        Ok(change)
    }
}
