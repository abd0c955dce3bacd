use lms_core::model::{
    AnswerOption, Assessment, AssessmentId, Course, CourseId, LearningPath, LearningPathId, Module,
    ModuleId, OptionId, Question, QuestionId,
};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    conn, id_i64, map_assessment_row, map_module_row, map_option_row, map_question_row, ser,
};
use crate::repository::{CatalogRepository, CatalogWriter, StorageError};

#[async_trait::async_trait]
impl CatalogRepository for SqliteRepository {
    async fn get_assessment(&self, id: AssessmentId) -> Result<Option<Assessment>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, module_id, title, number_of_questions, duration_minutes
            FROM assessments
            WHERE id = ?1
            ",
        )
        .bind(id_i64("assessment_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_assessment_row).transpose()
    }

    async fn questions_for_assessment(
        &self,
        id: AssessmentId,
    ) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, assessment_id, text, remedial_module_id
            FROM questions
            WHERE assessment_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_i64("assessment_id", id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_question_row).collect()
    }

    async fn options_for_question(
        &self,
        id: QuestionId,
    ) -> Result<Vec<AnswerOption>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, question_id, text, is_correct
            FROM options
            WHERE question_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_i64("question_id", id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_option_row).collect()
    }

    async fn options_for_assessment(
        &self,
        id: AssessmentId,
    ) -> Result<Vec<AnswerOption>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT o.id, o.question_id, o.text, o.is_correct
            FROM options o
            JOIN questions q ON q.id = o.question_id
            WHERE q.assessment_id = ?1
            ORDER BY o.id ASC
            ",
        )
        .bind(id_i64("assessment_id", id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_option_row).collect()
    }

    async fn get_option(&self, id: OptionId) -> Result<Option<AnswerOption>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, question_id, text, is_correct
            FROM options
            WHERE id = ?1
            ",
        )
        .bind(id_i64("option_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_option_row).transpose()
    }

    async fn get_module(&self, id: ModuleId) -> Result<Option<Module>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, course_id, title, sort_order, content_type, assessment_id
            FROM modules
            WHERE id = ?1
            ",
        )
        .bind(id_i64("module_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_module_row).transpose()
    }

    async fn modules_for_course(&self, id: CourseId) -> Result<Vec<Module>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, course_id, title, sort_order, content_type, assessment_id
            FROM modules
            WHERE course_id = ?1
            ORDER BY sort_order ASC, id ASC
            ",
        )
        .bind(id_i64("course_id", id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_module_row).collect()
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let row = sqlx::query("SELECT id, title FROM courses WHERE id = ?1")
            .bind(id_i64("course_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let title: String = row.try_get("title").map_err(ser)?;
        Course::new(id, title).map(Some).map_err(ser)
    }

    async fn get_learning_path(
        &self,
        id: LearningPathId,
    ) -> Result<Option<LearningPath>, StorageError> {
        let row = sqlx::query("SELECT id, title FROM learning_paths WHERE id = ?1")
            .bind(id_i64("learning_path_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let title: String = row.try_get("title").map_err(ser)?;
        LearningPath::new(id, title).map(Some).map_err(ser)
    }

    async fn courses_in_path(&self, id: LearningPathId) -> Result<Vec<CourseId>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT course_id
            FROM learning_path_courses
            WHERE learning_path_id = ?1
            ORDER BY position ASC
            ",
        )
        .bind(id_i64("learning_path_id", id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter()
            .map(|row| {
                let raw: i64 = row.try_get("course_id").map_err(ser)?;
                u64::try_from(raw)
                    .map(CourseId::new)
                    .map_err(|_| StorageError::Serialization("course_id sign overflow".into()))
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl CatalogWriter for SqliteRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO courses (id, title)
            VALUES (?1, ?2)
            ON CONFLICT(id) DO UPDATE SET title = excluded.title
            ",
        )
        .bind(id_i64("course_id", course.id().value())?)
        .bind(course.title())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn upsert_learning_path(
        &self,
        path: &LearningPath,
        courses: &[CourseId],
    ) -> Result<(), StorageError> {
        let path_id = id_i64("learning_path_id", path.id().value())?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO learning_paths (id, title)
            VALUES (?1, ?2)
            ON CONFLICT(id) DO UPDATE SET title = excluded.title
            ",
        )
        .bind(path_id)
        .bind(path.title())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        sqlx::query("DELETE FROM learning_path_courses WHERE learning_path_id = ?1")
            .bind(path_id)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for (index, course_id) in courses.iter().enumerate() {
            let position = i64::try_from(index + 1)
                .map_err(|_| StorageError::Serialization("position overflow".into()))?;
            sqlx::query(
                r"
                INSERT INTO learning_path_courses (learning_path_id, course_id, position)
                VALUES (?1, ?2, ?3)
                ",
            )
            .bind(path_id)
            .bind(id_i64("course_id", course_id.value())?)
            .bind(position)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn upsert_module(&self, module: &Module) -> Result<(), StorageError> {
        let assessment_id = module
            .assessment_id()
            .map(|id| id_i64("assessment_id", id.value()))
            .transpose()?;

        sqlx::query(
            r"
            INSERT INTO modules (id, course_id, title, sort_order, content_type, assessment_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                course_id = excluded.course_id,
                title = excluded.title,
                sort_order = excluded.sort_order,
                content_type = excluded.content_type,
                assessment_id = excluded.assessment_id
            ",
        )
        .bind(id_i64("module_id", module.id().value())?)
        .bind(id_i64("course_id", module.course_id().value())?)
        .bind(module.title())
        .bind(i64::from(module.order()))
        .bind(module.content_type().as_str())
        .bind(assessment_id)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn upsert_assessment(&self, assessment: &Assessment) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO assessments (id, module_id, title, number_of_questions, duration_minutes)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                module_id = excluded.module_id,
                title = excluded.title,
                number_of_questions = excluded.number_of_questions,
                duration_minutes = excluded.duration_minutes
            ",
        )
        .bind(id_i64("assessment_id", assessment.id().value())?)
        .bind(id_i64("module_id", assessment.module_id().value())?)
        .bind(assessment.title())
        .bind(i64::from(assessment.number_of_questions()))
        .bind(i64::from(assessment.duration_minutes()))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let remedial = question
            .remedial_module()
            .map(|id| id_i64("remedial_module_id", id.value()))
            .transpose()?;

        sqlx::query(
            r"
            INSERT INTO questions (id, assessment_id, text, remedial_module_id)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                assessment_id = excluded.assessment_id,
                text = excluded.text,
                remedial_module_id = excluded.remedial_module_id
            ",
        )
        .bind(id_i64("question_id", question.id().value())?)
        .bind(id_i64("assessment_id", question.assessment_id().value())?)
        .bind(question.text())
        .bind(remedial)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn upsert_option(&self, option: &AnswerOption) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO options (id, question_id, text, is_correct)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                question_id = excluded.question_id,
                text = excluded.text,
                is_correct = excluded.is_correct
            ",
        )
        .bind(id_i64("option_id", option.id().value())?)
        .bind(id_i64("question_id", option.question_id().value())?)
        .bind(option.text())
        .bind(option.is_correct())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }
}
