use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Version recorded once every migration below has run.
pub const LATEST_SCHEMA_VERSION: i64 = 1;

const SCHEMA_V1: &[&str] = &[
    r"
        CREATE TABLE IF NOT EXISTS courses (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS learning_paths (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS learning_path_courses (
            learning_path_id INTEGER NOT NULL,
            course_id INTEGER NOT NULL,
            position INTEGER NOT NULL CHECK (position >= 1),
            PRIMARY KEY (learning_path_id, course_id),
            FOREIGN KEY (learning_path_id) REFERENCES learning_paths(id) ON DELETE CASCADE,
            FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
        );
    ",
    // assessment_id is a plain column: assessments also reference their module.
    r"
        CREATE TABLE IF NOT EXISTS modules (
            id INTEGER PRIMARY KEY,
            course_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            sort_order INTEGER NOT NULL CHECK (sort_order >= 1),
            content_type TEXT NOT NULL,
            assessment_id INTEGER,
            FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS assessments (
            id INTEGER PRIMARY KEY,
            module_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            number_of_questions INTEGER NOT NULL CHECK (number_of_questions >= 0),
            duration_minutes INTEGER NOT NULL CHECK (duration_minutes > 0),
            FOREIGN KEY (module_id) REFERENCES modules(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS questions (
            id INTEGER PRIMARY KEY,
            assessment_id INTEGER NOT NULL,
            text TEXT NOT NULL,
            remedial_module_id INTEGER,
            FOREIGN KEY (assessment_id) REFERENCES assessments(id) ON DELETE CASCADE,
            FOREIGN KEY (remedial_module_id) REFERENCES modules(id) ON DELETE SET NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS options (
            id INTEGER PRIMARY KEY,
            question_id INTEGER NOT NULL,
            text TEXT NOT NULL,
            is_correct INTEGER NOT NULL CHECK (is_correct IN (0, 1)),
            FOREIGN KEY (question_id) REFERENCES questions(id) ON DELETE CASCADE
        );
    ",
    // AUTOINCREMENT never reuses ids, so id order is creation order.
    r"
        CREATE TABLE IF NOT EXISTS assessment_attempts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            assessment_id INTEGER NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('in_progress', 'completed')),
            start_time TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (assessment_id) REFERENCES assessments(id)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS attempt_questions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            attempt_id INTEGER NOT NULL,
            question_id INTEGER NOT NULL,
            FOREIGN KEY (attempt_id) REFERENCES assessment_attempts(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS user_answers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            attempt_id INTEGER NOT NULL,
            attempt_question_id INTEGER NOT NULL,
            option_id INTEGER NOT NULL,
            FOREIGN KEY (attempt_id) REFERENCES assessment_attempts(id) ON DELETE CASCADE,
            FOREIGN KEY (attempt_question_id) REFERENCES attempt_questions(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS user_module_progress (
            user_id INTEGER NOT NULL,
            module_id INTEGER NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('not_started', 'in_progress', 'completed')),
            progress REAL NOT NULL CHECK (progress BETWEEN 0 AND 100),
            last_accessed_at TEXT NOT NULL,
            last_second REAL,
            PRIMARY KEY (user_id, module_id)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS user_progress (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            course_id INTEGER,
            learning_path_id INTEGER,
            progress INTEGER NOT NULL CHECK (progress BETWEEN 0 AND 100),
            CHECK ((course_id IS NULL) <> (learning_path_id IS NULL))
        );
    ",
    r"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_user_progress_course
            ON user_progress (user_id, course_id) WHERE course_id IS NOT NULL;
    ",
    r"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_user_progress_path
            ON user_progress (user_id, learning_path_id) WHERE learning_path_id IS NOT NULL;
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_modules_course_order
            ON modules (course_id, sort_order);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_questions_assessment
            ON questions (assessment_id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_options_question
            ON options (question_id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_attempts_user_assessment
            ON assessment_attempts (user_id, assessment_id, id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_attempt_questions_attempt
            ON attempt_questions (attempt_id, id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_user_answers_attempt_question
            ON user_answers (attempt_id, attempt_question_id);
    ",
];

/// Runs versioned migrations for the current schema.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: catalog, attempts, and progress.
    if !is_applied(pool, LATEST_SCHEMA_VERSION).await? {
        let mut tx = pool.begin().await?;

        for statement in SCHEMA_V1 {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(LATEST_SCHEMA_VERSION)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}

/// Highest recorded migration; 0 when the version table does not exist yet.
pub async fn applied_version(pool: &SqlitePool) -> Result<i64, SqliteInitError> {
    let table: Option<i64> = sqlx::query_scalar(
        "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_migrations'",
    )
    .fetch_optional(pool)
    .await?;
    if table.is_none() {
        return Ok(0);
    }
    let version: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
        .fetch_one(pool)
        .await?;
    Ok(version)
}
