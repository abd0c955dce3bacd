use lms_core::model::{ModuleId, ProgressTarget, UserId, UserModuleProgress, UserProgress};

use super::SqliteRepository;
use super::mapping::{conn, id_i64, map_module_progress_row, map_user_progress_row};
use crate::repository::{ProgressRepository, StorageError};

/// Splits a target into the nullable (`course_id`, `learning_path_id`) column pair.
fn target_columns(target: ProgressTarget) -> Result<(Option<i64>, Option<i64>), StorageError> {
    match target {
        ProgressTarget::Course(id) => Ok((Some(id_i64("course_id", id.value())?), None)),
        ProgressTarget::LearningPath(id) => {
            Ok((None, Some(id_i64("learning_path_id", id.value())?)))
        }
    }
}

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_module_progress(
        &self,
        user_id: UserId,
        module_id: ModuleId,
    ) -> Result<Option<UserModuleProgress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, module_id, status, progress, last_accessed_at, last_second
            FROM user_module_progress
            WHERE user_id = ?1 AND module_id = ?2
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .bind(id_i64("module_id", module_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_module_progress_row).transpose()
    }

    async fn upsert_module_progress(
        &self,
        progress: &UserModuleProgress,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO user_module_progress
                (user_id, module_id, status, progress, last_accessed_at, last_second)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(user_id, module_id) DO UPDATE SET
                status = excluded.status,
                progress = excluded.progress,
                last_accessed_at = excluded.last_accessed_at,
                last_second = excluded.last_second
            ",
        )
        .bind(id_i64("user_id", progress.user_id.value())?)
        .bind(id_i64("module_id", progress.module_id.value())?)
        .bind(progress.status.as_str())
        .bind(progress.progress)
        .bind(progress.last_accessed_at)
        .bind(progress.last_second)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn module_progress_for_user(
        &self,
        user_id: UserId,
        modules: &[ModuleId],
    ) -> Result<Vec<UserModuleProgress>, StorageError> {
        if modules.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = (0..modules.len())
            .map(|i| format!("?{}", i + 2))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            r"
            SELECT user_id, module_id, status, progress, last_accessed_at, last_second
            FROM user_module_progress
            WHERE user_id = ?1 AND module_id IN ({placeholders})
            ORDER BY module_id ASC
            "
        );

        let mut query = sqlx::query(&sql).bind(id_i64("user_id", user_id.value())?);
        for module_id in modules {
            query = query.bind(id_i64("module_id", module_id.value())?);
        }

        let rows = query.fetch_all(&self.pool).await.map_err(conn)?;
        rows.iter().map(map_module_progress_row).collect()
    }

    async fn get_user_progress(
        &self,
        user_id: UserId,
        target: ProgressTarget,
    ) -> Result<Option<UserProgress>, StorageError> {
        let (course_id, path_id) = target_columns(target)?;
        let row = sqlx::query(
            r"
            SELECT user_id, course_id, learning_path_id, progress
            FROM user_progress
            WHERE user_id = ?1 AND course_id IS ?2 AND learning_path_id IS ?3
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .bind(course_id)
        .bind(path_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_user_progress_row).transpose()
    }

    async fn upsert_user_progress(&self, progress: &UserProgress) -> Result<(), StorageError> {
        let user = id_i64("user_id", progress.user_id.value())?;
        let (course_id, path_id) = target_columns(progress.target)?;
        let value = i64::from(progress.progress);

        let mut tx = self.pool.begin().await.map_err(conn)?;

        let updated = sqlx::query(
            r"
            UPDATE user_progress
            SET progress = ?4
            WHERE user_id = ?1 AND course_id IS ?2 AND learning_path_id IS ?3
            ",
        )
        .bind(user)
        .bind(course_id)
        .bind(path_id)
        .bind(value)
        .execute(&mut *tx)
        .await
        .map_err(conn)?
        .rows_affected();

        if updated == 0 {
            sqlx::query(
                r"
                INSERT INTO user_progress (user_id, course_id, learning_path_id, progress)
                VALUES (?1, ?2, ?3, ?4)
                ",
            )
            .bind(user)
            .bind(course_id)
            .bind(path_id)
            .bind(value)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }
}
