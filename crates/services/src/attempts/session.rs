use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use lms_core::Clock;
use lms_core::model::{
    AnswerOption, AssessmentAttempt, AssessmentId, AttemptId, AttemptTiming, Question, QuestionId,
    UserId, is_eligible,
};
use storage::repository::{AttemptRepository, CatalogRepository};

use super::view::{QuestionView, question_views};
use super::{QuestionSampler, ScoreReport, ScoringService, load_snapshot};
use crate::error::AttemptError;

/// Questions of an attempt in presentation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptView {
    pub attempt_id: AttemptId,
    pub questions: Vec<QuestionView>,
    /// Allowed time in minutes.
    pub duration: u32,
}

/// Timing and live score of the learner's latest attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptCheck {
    pub exists: bool,
    pub has_time_left: bool,
    /// Seconds used so far.
    pub time_used: i64,
    /// Seconds left.
    pub time_remaining: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_id: Option<AttemptId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<ScoreReport>,
}

/// Creates, inspects, resumes, and ends timed attempts.
#[derive(Clone)]
pub struct AttemptService {
    clock: Clock,
    sampler: QuestionSampler,
    catalog: Arc<dyn CatalogRepository>,
    attempts: Arc<dyn AttemptRepository>,
    scoring: ScoringService,
}

impl AttemptService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<dyn CatalogRepository>,
        attempts: Arc<dyn AttemptRepository>,
    ) -> Self {
        let scoring = ScoringService::new(Arc::clone(&catalog), Arc::clone(&attempts));
        Self {
            clock,
            sampler: QuestionSampler::default(),
            catalog,
            attempts,
            scoring,
        }
    }

    /// Override the sampler (usually with a seeded one for tests).
    #[must_use]
    pub fn with_sampler(mut self, sampler: QuestionSampler) -> Self {
        self.sampler = sampler;
        self
    }

    #[must_use]
    pub fn scoring(&self) -> &ScoringService {
        &self.scoring
    }

    /// Start a new attempt with a random sample of eligible questions.
    ///
    /// Earlier attempts are left untouched; the new one supersedes them as the
    /// learner's latest.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::AssessmentNotFound` for an unknown assessment.
    pub async fn start(
        &self,
        user_id: UserId,
        assessment_id: AssessmentId,
    ) -> Result<AttemptView, AttemptError> {
        let assessment = self
            .catalog
            .get_assessment(assessment_id)
            .await?
            .ok_or(AttemptError::AssessmentNotFound(assessment_id))?;

        let questions = self.catalog.questions_for_assessment(assessment_id).await?;
        let mut options: HashMap<QuestionId, Vec<AnswerOption>> = HashMap::new();
        for option in self.catalog.options_for_assessment(assessment_id).await? {
            options.entry(option.question_id()).or_default().push(option);
        }
        let pool: Vec<QuestionId> = questions
            .iter()
            .map(Question::id)
            .filter(|id| options.get(id).is_some_and(|own| is_eligible(own)))
            .collect();

        let wanted = usize::try_from(assessment.number_of_questions()).unwrap_or(usize::MAX);
        let picked = self.sampler.sample(pool, wanted);

        let (attempt, _) = self
            .attempts
            .create_attempt(user_id, assessment_id, self.clock.now(), &picked)
            .await?;
        info!(
            attempt_id = %attempt.id(),
            user_id = %user_id,
            assessment_id = %assessment_id,
            questions = picked.len(),
            "attempt started"
        );

        let snapshot = load_snapshot(self.catalog.as_ref(), self.attempts.as_ref(), attempt).await?;
        Ok(AttemptView {
            attempt_id: snapshot.attempt.id(),
            questions: question_views(&snapshot, false),
            duration: assessment.duration_minutes(),
        })
    }

    /// Report timing and the score so far for the learner's latest attempt.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::AssessmentNotFound` for an unknown assessment.
    pub async fn check(
        &self,
        user_id: UserId,
        assessment_id: AssessmentId,
    ) -> Result<AttemptCheck, AttemptError> {
        let assessment = self
            .catalog
            .get_assessment(assessment_id)
            .await?
            .ok_or(AttemptError::AssessmentNotFound(assessment_id))?;

        let Some(attempt) = self.attempts.latest_attempt(user_id, assessment_id).await? else {
            let timing = AttemptTiming::unstarted(assessment.duration_secs());
            return Ok(AttemptCheck {
                exists: false,
                has_time_left: timing.has_time_left,
                time_used: timing.time_used,
                time_remaining: timing.time_remaining,
                attempt_id: None,
                score: None,
            });
        };

        let timing = attempt.timing(assessment.duration_secs(), self.clock.now());
        let snapshot = load_snapshot(self.catalog.as_ref(), self.attempts.as_ref(), attempt).await?;
        let score = self.scoring.score_snapshot(&snapshot).await?;

        Ok(AttemptCheck {
            exists: true,
            has_time_left: timing.has_time_left,
            time_used: timing.time_used,
            time_remaining: timing.time_remaining,
            attempt_id: Some(snapshot.attempt.id()),
            score: Some(score),
        })
    }

    /// Rebuild an attempt in its original order with current selections.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::AttemptNotFound` or `AttemptError::NotOwner`.
    pub async fn resume(
        &self,
        user_id: UserId,
        attempt_id: AttemptId,
    ) -> Result<AttemptView, AttemptError> {
        let attempt = self.owned_attempt(user_id, attempt_id).await?;
        let snapshot = load_snapshot(self.catalog.as_ref(), self.attempts.as_ref(), attempt).await?;
        Ok(AttemptView {
            attempt_id,
            questions: question_views(&snapshot, true),
            duration: snapshot.assessment.duration_minutes(),
        })
    }

    /// Complete an attempt and return its final score.
    ///
    /// The start time is rewound by the full duration so later checks report
    /// no time remaining.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::AttemptNotFound` or `AttemptError::NotOwner`.
    pub async fn end(
        &self,
        user_id: UserId,
        attempt_id: AttemptId,
    ) -> Result<ScoreReport, AttemptError> {
        let mut attempt = self.owned_attempt(user_id, attempt_id).await?;
        let assessment_id = attempt.assessment_id();
        let assessment = self
            .catalog
            .get_assessment(assessment_id)
            .await?
            .ok_or(AttemptError::AssessmentNotFound(assessment_id))?;

        attempt.complete(assessment.duration_secs(), self.clock.now());
        self.attempts.update_attempt(&attempt).await?;

        let snapshot = load_snapshot(self.catalog.as_ref(), self.attempts.as_ref(), attempt).await?;
        let score = self.scoring.score_snapshot(&snapshot).await?;
        info!(
            attempt_id = %attempt_id,
            user_id = %user_id,
            correct = score.correct_answers,
            total = score.total_questions,
            "attempt ended"
        );
        Ok(score)
    }

    pub(crate) async fn owned_attempt(
        &self,
        user_id: UserId,
        attempt_id: AttemptId,
    ) -> Result<AssessmentAttempt, AttemptError> {
        owned_attempt(self.attempts.as_ref(), user_id, attempt_id).await
    }
}

pub(crate) async fn owned_attempt(
    attempts: &dyn AttemptRepository,
    user_id: UserId,
    attempt_id: AttemptId,
) -> Result<AssessmentAttempt, AttemptError> {
    let attempt = attempts
        .get_attempt(attempt_id)
        .await?
        .ok_or(AttemptError::AttemptNotFound(attempt_id))?;
    if !attempt.is_owned_by(user_id) {
        return Err(AttemptError::NotOwner(attempt_id));
    }
    Ok(attempt)
}
