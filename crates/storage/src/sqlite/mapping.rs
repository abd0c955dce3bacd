use lms_core::model::{
    AnswerOption, Assessment, AssessmentAttempt, AssessmentId, AttemptId, AttemptQuestion,
    AttemptQuestionId, AttemptStatus, ContentType, CourseId, LearningPathId, Module, ModuleId,
    ModuleStatus, OptionId, ProgressTarget, Question, QuestionId, UserAnswer, UserAnswerId, UserId,
    UserModuleProgress, UserProgress,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

/// Converts a domain id into its `SQLite` integer column value.
pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn u64_from_i64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn get_u64(row: &SqliteRow, field: &'static str) -> Result<u64, StorageError> {
    u64_from_i64(field, row.try_get::<i64, _>(field).map_err(ser)?)
}

fn get_opt_u64(row: &SqliteRow, field: &'static str) -> Result<Option<u64>, StorageError> {
    row.try_get::<Option<i64>, _>(field)
        .map_err(ser)?
        .map(|v| u64_from_i64(field, v))
        .transpose()
}

pub(crate) fn map_assessment_row(row: &SqliteRow) -> Result<Assessment, StorageError> {
    Assessment::new(
        AssessmentId::new(get_u64(row, "id")?),
        ModuleId::new(get_u64(row, "module_id")?),
        row.try_get::<String, _>("title").map_err(ser)?,
        u32_from_i64(
            "number_of_questions",
            row.try_get::<i64, _>("number_of_questions").map_err(ser)?,
        )?,
        u32_from_i64(
            "duration_minutes",
            row.try_get::<i64, _>("duration_minutes").map_err(ser)?,
        )?,
    )
    .map_err(ser)
}

pub(crate) fn map_question_row(row: &SqliteRow) -> Result<Question, StorageError> {
    Question::new(
        QuestionId::new(get_u64(row, "id")?),
        AssessmentId::new(get_u64(row, "assessment_id")?),
        row.try_get::<String, _>("text").map_err(ser)?,
        get_opt_u64(row, "remedial_module_id")?.map(ModuleId::new),
    )
    .map_err(ser)
}

pub(crate) fn map_option_row(row: &SqliteRow) -> Result<AnswerOption, StorageError> {
    AnswerOption::new(
        OptionId::new(get_u64(row, "id")?),
        QuestionId::new(get_u64(row, "question_id")?),
        row.try_get::<String, _>("text").map_err(ser)?,
        row.try_get::<bool, _>("is_correct").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_module_row(row: &SqliteRow) -> Result<Module, StorageError> {
    let content_type: String = row.try_get("content_type").map_err(ser)?;
    Module::new(
        ModuleId::new(get_u64(row, "id")?),
        CourseId::new(get_u64(row, "course_id")?),
        row.try_get::<String, _>("title").map_err(ser)?,
        u32_from_i64("sort_order", row.try_get::<i64, _>("sort_order").map_err(ser)?)?,
        ContentType::parse(&content_type).map_err(ser)?,
        get_opt_u64(row, "assessment_id")?.map(AssessmentId::new),
    )
    .map_err(ser)
}

pub(crate) fn map_attempt_row(row: &SqliteRow) -> Result<AssessmentAttempt, StorageError> {
    let status: String = row.try_get("status").map_err(ser)?;
    Ok(AssessmentAttempt::from_persisted(
        AttemptId::new(get_u64(row, "id")?),
        UserId::new(get_u64(row, "user_id")?),
        AssessmentId::new(get_u64(row, "assessment_id")?),
        AttemptStatus::parse(&status).map_err(ser)?,
        row.try_get("start_time").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
    ))
}

pub(crate) fn map_attempt_question_row(row: &SqliteRow) -> Result<AttemptQuestion, StorageError> {
    Ok(AttemptQuestion {
        id: AttemptQuestionId::new(get_u64(row, "id")?),
        attempt_id: AttemptId::new(get_u64(row, "attempt_id")?),
        question_id: QuestionId::new(get_u64(row, "question_id")?),
    })
}

pub(crate) fn map_answer_row(row: &SqliteRow) -> Result<UserAnswer, StorageError> {
    Ok(UserAnswer {
        id: UserAnswerId::new(get_u64(row, "id")?),
        attempt_id: AttemptId::new(get_u64(row, "attempt_id")?),
        attempt_question_id: AttemptQuestionId::new(get_u64(row, "attempt_question_id")?),
        option_id: OptionId::new(get_u64(row, "option_id")?),
    })
}

pub(crate) fn map_module_progress_row(
    row: &SqliteRow,
) -> Result<UserModuleProgress, StorageError> {
    let status: String = row.try_get("status").map_err(ser)?;
    Ok(UserModuleProgress {
        user_id: UserId::new(get_u64(row, "user_id")?),
        module_id: ModuleId::new(get_u64(row, "module_id")?),
        status: ModuleStatus::parse(&status).map_err(ser)?,
        progress: row.try_get("progress").map_err(ser)?,
        last_accessed_at: row.try_get("last_accessed_at").map_err(ser)?,
        last_second: row.try_get("last_second").map_err(ser)?,
    })
}

pub(crate) fn map_user_progress_row(row: &SqliteRow) -> Result<UserProgress, StorageError> {
    let target = match (
        get_opt_u64(row, "course_id")?,
        get_opt_u64(row, "learning_path_id")?,
    ) {
        (Some(course), None) => ProgressTarget::Course(CourseId::new(course)),
        (None, Some(path)) => ProgressTarget::LearningPath(LearningPathId::new(path)),
        _ => {
            return Err(StorageError::Serialization(
                "user_progress row must target exactly one of course or path".into(),
            ));
        }
    };
    let raw: i64 = row.try_get("progress").map_err(ser)?;
    let progress = u8::try_from(raw)
        .ok()
        .filter(|p| *p <= 100)
        .ok_or_else(|| StorageError::Serialization(format!("invalid progress: {raw}")))?;
    Ok(UserProgress::new(
        UserId::new(get_u64(row, "user_id")?),
        target,
        progress,
    ))
}
