//! Shared error types for the services crate.

use thiserror::Error;

use lms_core::model::{
    AssessmentId, AttemptId, CourseId, LearningPathId, ModuleId, OptionId, ProgressValidationError,
    QuestionId,
};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Client-facing classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Unauthenticated,
    Forbidden,
    Validation,
    Internal,
}

fn storage_kind(err: &StorageError) -> ErrorKind {
    match err {
        StorageError::NotFound => ErrorKind::NotFound,
        _ => ErrorKind::Internal,
    }
}

/// Errors emitted by the attempt engine: sessions, answers, and scoring.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("assessment {0} not found")]
    AssessmentNotFound(AssessmentId),
    #[error("attempt {0} not found")]
    AttemptNotFound(AttemptId),
    #[error("question {0} not found")]
    QuestionNotFound(QuestionId),
    #[error("option {0} not found")]
    OptionNotFound(OptionId),
    #[error("option {option} does not belong to a question of attempt {attempt}")]
    OptionNotInAttempt { attempt: AttemptId, option: OptionId },
    #[error("attempt {0} belongs to another user")]
    NotOwner(AttemptId),
    #[error("attempt {0} has already ended")]
    AttemptEnded(AttemptId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AttemptError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            AttemptError::AssessmentNotFound(_)
            | AttemptError::AttemptNotFound(_)
            | AttemptError::QuestionNotFound(_)
            | AttemptError::OptionNotFound(_)
            | AttemptError::OptionNotInAttempt { .. } => ErrorKind::NotFound,
            AttemptError::NotOwner(_) => ErrorKind::Forbidden,
            AttemptError::AttemptEnded(_) => ErrorKind::Validation,
            AttemptError::Storage(err) => storage_kind(err),
        }
    }
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("module {0} not found")]
    ModuleNotFound(ModuleId),
    #[error("course {0} not found")]
    CourseNotFound(CourseId),
    #[error("learning path {0} not found")]
    LearningPathNotFound(LearningPathId),
    #[error("module {module} is not part of course {course}")]
    ModuleNotInCourse { module: ModuleId, course: CourseId },
    #[error("course {course} is not part of learning path {path}")]
    CourseNotInPath { course: CourseId, path: LearningPathId },
    #[error(transparent)]
    Invalid(#[from] ProgressValidationError),
    #[error(transparent)]
    Attempt(#[from] AttemptError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ProgressError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProgressError::ModuleNotFound(_)
            | ProgressError::CourseNotFound(_)
            | ProgressError::LearningPathNotFound(_) => ErrorKind::NotFound,
            ProgressError::ModuleNotInCourse { .. }
            | ProgressError::CourseNotInPath { .. }
            | ProgressError::Invalid(_) => ErrorKind::Validation,
            ProgressError::Attempt(err) => err.kind(),
            ProgressError::Storage(err) => storage_kind(err),
        }
    }
}

/// Credential failures raised before a request reaches the core.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error("missing bearer credential")]
    MissingCredential,
    #[error("invalid or expired credential")]
    InvalidCredential,
}

/// Errors returned by the `LearningApi` facade.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Attempt(#[from] AttemptError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error("{0}")]
    Validation(String),
}

impl ApiError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Auth(_) => ErrorKind::Unauthenticated,
            ApiError::Attempt(err) => err.kind(),
            ApiError::Progress(err) => err.kind(),
            ApiError::Validation(_) => ErrorKind::Validation,
        }
    }

    /// Message safe to hand back to a client.
    ///
    /// Internal failures are logged in full and replaced by a generic message.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => {
                tracing::error!(error = %self, "internal failure");
                "internal error".to_owned()
            }
            _ => self.to_string(),
        }
    }
}

/// Errors emitted while loading configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
