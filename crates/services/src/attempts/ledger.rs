use std::sync::Arc;

use tracing::debug;

use lms_core::model::{AttemptId, OptionId, UserId, is_multiple_answer};
use storage::repository::{AttemptRepository, CatalogRepository, Reselect};

use super::load_snapshot;
use super::session::owned_attempt;
use super::view::{QuestionView, question_views};
use crate::config::PolicyConfig;
use crate::error::AttemptError;

/// Records a learner's option selections against an attempt's snapshot.
///
/// Multi-answer questions toggle; single-answer questions behave like radio
/// buttons. Which rule applies is decided from the question's current options
/// on every call.
#[derive(Clone)]
pub struct AnswerLedger {
    catalog: Arc<dyn CatalogRepository>,
    attempts: Arc<dyn AttemptRepository>,
    reject_after_end: bool,
    reselect: Reselect,
}

impl AnswerLedger {
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogRepository>, attempts: Arc<dyn AttemptRepository>) -> Self {
        Self::with_policy(catalog, attempts, &PolicyConfig::default())
    }

    #[must_use]
    pub fn with_policy(
        catalog: Arc<dyn CatalogRepository>,
        attempts: Arc<dyn AttemptRepository>,
        policy: &PolicyConfig,
    ) -> Self {
        Self {
            catalog,
            attempts,
            reject_after_end: policy.reject_answers_after_end,
            reselect: if policy.allow_single_choice_clear {
                Reselect::Clear
            } else {
                Reselect::Keep
            },
        }
    }

    /// Select or toggle `option_id` and return the attempt's full question state.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError` if the attempt or option is unknown, the option is
    /// not part of the attempt, the attempt belongs to someone else, or the
    /// attempt has ended and answers are frozen.
    pub async fn set_answer(
        &self,
        user_id: UserId,
        attempt_id: AttemptId,
        option_id: OptionId,
    ) -> Result<Vec<QuestionView>, AttemptError> {
        let attempt = owned_attempt(self.attempts.as_ref(), user_id, attempt_id).await?;
        if self.reject_after_end && attempt.is_completed() {
            return Err(AttemptError::AttemptEnded(attempt_id));
        }

        let option = self
            .catalog
            .get_option(option_id)
            .await?
            .ok_or(AttemptError::OptionNotFound(option_id))?;
        let question_id = option.question_id();
        let live_options = self.catalog.options_for_question(question_id).await?;
        let is_multiple = is_multiple_answer(&live_options);

        let row = self
            .attempts
            .attempt_questions(attempt_id)
            .await?
            .into_iter()
            .find(|row| row.question_id == question_id)
            .ok_or(AttemptError::OptionNotInAttempt {
                attempt: attempt_id,
                option: option_id,
            })?;

        let change = if is_multiple {
            self.attempts
                .toggle_answer(attempt_id, row.id, option_id)
                .await?
        } else {
            self.attempts
                .select_exclusive_answer(attempt_id, row.id, option_id, self.reselect)
                .await?
        };
        debug!(
            attempt_id = %attempt_id,
            option_id = %option_id,
            multiple = is_multiple,
            change = ?change,
            "answer recorded"
        );

        let snapshot = load_snapshot(self.catalog.as_ref(), self.attempts.as_ref(), attempt).await?;
        Ok(question_views(&snapshot, true))
    }
}
