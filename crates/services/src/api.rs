//! Authenticated entry points for the learner-facing operations.
//!
//! Transport is left to the caller: each method takes the raw bearer
//! credential and returns a serializable response body.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use lms_core::model::{
    AssessmentId, AttemptId, CourseId, ModuleId, ModuleProgressUpdate, ModuleStatus, OptionId,
    UserModuleProgress,
};

use crate::attempts::{
    AnswerLedger, AttemptCheck, AttemptService, AttemptView, QuestionView, ScoreReport,
};
use crate::auth::{AuthProvider, Principal};
use crate::error::ApiError;
use crate::progress::{
    ActiveModuleOutcome, ActiveModuleRequest, CourseOverview, ModuleView, ProgressService,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResponse {
    pub questions: Vec<QuestionView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndAttemptResponse {
    pub score: ScoreReport,
}

/// Body of a module progress write. At least one field besides the module is required.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleProgressRequest {
    pub module_id: ModuleId,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub last_second: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleProgressResponse {
    pub record: UserModuleProgress,
}

/// Facade over the attempt engine and progress cascade.
#[derive(Clone)]
pub struct LearningApi {
    auth: Arc<dyn AuthProvider>,
    attempts: AttemptService,
    ledger: AnswerLedger,
    progress: ProgressService,
}

impl LearningApi {
    #[must_use]
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        attempts: AttemptService,
        ledger: AnswerLedger,
        progress: ProgressService,
    ) -> Self {
        Self {
            auth,
            attempts,
            ledger,
            progress,
        }
    }

    async fn principal(&self, bearer: Option<&str>) -> Result<Principal, ApiError> {
        Ok(self.auth.authenticate(bearer).await?)
    }

    /// # Errors
    ///
    /// Returns `ApiError` on authentication failure or an unknown assessment.
    pub async fn start_attempt(
        &self,
        bearer: Option<&str>,
        assessment_id: AssessmentId,
    ) -> Result<AttemptView, ApiError> {
        let who = self.principal(bearer).await?;
        Ok(self.attempts.start(who.user_id, assessment_id).await?)
    }

    /// # Errors
    ///
    /// Returns `ApiError` on authentication failure or an unknown assessment.
    pub async fn check_attempt(
        &self,
        bearer: Option<&str>,
        assessment_id: AssessmentId,
    ) -> Result<AttemptCheck, ApiError> {
        let who = self.principal(bearer).await?;
        Ok(self.attempts.check(who.user_id, assessment_id).await?)
    }

    /// # Errors
    ///
    /// Returns `ApiError` on authentication failure, an unknown attempt, or
    /// an attempt owned by someone else.
    pub async fn resume_attempt(
        &self,
        bearer: Option<&str>,
        attempt_id: AttemptId,
    ) -> Result<AttemptView, ApiError> {
        let who = self.principal(bearer).await?;
        Ok(self.attempts.resume(who.user_id, attempt_id).await?)
    }

    /// # Errors
    ///
    /// Returns `ApiError` on authentication failure or any answer-ledger rejection.
    pub async fn set_answer(
        &self,
        bearer: Option<&str>,
        attempt_id: AttemptId,
        option_id: OptionId,
    ) -> Result<AnswerResponse, ApiError> {
        let who = self.principal(bearer).await?;
        let questions = self
            .ledger
            .set_answer(who.user_id, attempt_id, option_id)
            .await?;
        Ok(AnswerResponse { questions })
    }

    /// # Errors
    ///
    /// Returns `ApiError` on authentication failure, an unknown attempt, or
    /// an attempt owned by someone else.
    pub async fn end_attempt(
        &self,
        bearer: Option<&str>,
        attempt_id: AttemptId,
    ) -> Result<EndAttemptResponse, ApiError> {
        let who = self.principal(bearer).await?;
        let score = self.attempts.end(who.user_id, attempt_id).await?;
        Ok(EndAttemptResponse { score })
    }

    /// # Errors
    ///
    /// Returns `ApiError::Validation` for an empty body or unknown status, and
    /// other `ApiError`s for authentication or progress failures.
    pub async fn module_progress(
        &self,
        bearer: Option<&str>,
        request: ModuleProgressRequest,
    ) -> Result<ModuleProgressResponse, ApiError> {
        let who = self.principal(bearer).await?;
        if request.status.is_none() && request.progress.is_none() && request.last_second.is_none()
        {
            return Err(ApiError::Validation(
                "one of status, progress, or lastSecond is required".to_owned(),
            ));
        }
        let status = request
            .status
            .as_deref()
            .map(ModuleStatus::parse)
            .transpose()
            .map_err(|e| ApiError::Validation(e.to_string()))?;
        let update = ModuleProgressUpdate {
            status,
            progress: request.progress,
            last_second: request.last_second,
        };
        let record = self
            .progress
            .record_module_progress(who.user_id, request.module_id, update)
            .await?;
        Ok(ModuleProgressResponse { record })
    }

    /// # Errors
    ///
    /// Returns `ApiError` on authentication failure or a rejected navigation.
    pub async fn set_active_module(
        &self,
        bearer: Option<&str>,
        request: ActiveModuleRequest,
    ) -> Result<ActiveModuleOutcome, ApiError> {
        let who = self.principal(bearer).await?;
        Ok(self.progress.set_active_module(who.user_id, request).await?)
    }

    /// # Errors
    ///
    /// Returns `ApiError` on authentication failure or an unknown module.
    pub async fn module(
        &self,
        bearer: Option<&str>,
        module_id: ModuleId,
    ) -> Result<ModuleView, ApiError> {
        let who = self.principal(bearer).await?;
        Ok(self.progress.module_view(who.user_id, module_id).await?)
    }

    /// # Errors
    ///
    /// Returns `ApiError` on authentication failure or an unknown course.
    pub async fn course(
        &self,
        bearer: Option<&str>,
        course_id: CourseId,
    ) -> Result<CourseOverview, ApiError> {
        let who = self.principal(bearer).await?;
        Ok(self.progress.course_overview(who.user_id, course_id).await?)
    }
}
