use thiserror::Error;

use crate::model::{AssessmentError, AttemptStateError, CurriculumError, ProgressValidationError};

/// Any domain validation failure.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Assessment(#[from] AssessmentError),
    #[error(transparent)]
    Attempt(#[from] AttemptStateError),
    #[error(transparent)]
    Curriculum(#[from] CurriculumError),
    #[error(transparent)]
    Progress(#[from] ProgressValidationError),
}
