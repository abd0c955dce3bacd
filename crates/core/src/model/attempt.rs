use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{
    AssessmentId, AttemptId, AttemptQuestionId, OptionId, QuestionId, UserAnswerId, UserId,
};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptStateError {
    #[error("invalid attempt status: {0}")]
    InvalidStatus(String),
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Completed,
}

impl AttemptStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Completed => "completed",
        }
    }

    /// # Errors
    ///
    /// Returns `AttemptStateError::InvalidStatus` for unknown values.
    pub fn parse(value: &str) -> Result<Self, AttemptStateError> {
        match value {
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            other => Err(AttemptStateError::InvalidStatus(other.to_owned())),
        }
    }
}

//
// ─── ATTEMPT ───────────────────────────────────────────────────────────────────
//

/// One timed run of a learner through an assessment.
///
/// Attempts are never deleted and never expire on their own: an attempt past
/// its duration stays `InProgress` until it is ended or superseded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentAttempt {
    id: AttemptId,
    user_id: UserId,
    assessment_id: AssessmentId,
    status: AttemptStatus,
    start_time: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

/// Time accounting for an attempt, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptTiming {
    pub has_time_left: bool,
    pub time_used: i64,
    pub time_remaining: i64,
}

impl AttemptTiming {
    /// Computes timing for an attempt started at `start_time` with `duration_secs` allowed.
    ///
    /// `has_time_left` is false exactly when `now - start_time >= duration_secs`.
    #[must_use]
    pub fn compute(start_time: DateTime<Utc>, duration_secs: i64, now: DateTime<Utc>) -> Self {
        let total = duration_secs.max(0);
        let elapsed = now.signed_duration_since(start_time).num_seconds();
        let time_used = elapsed.clamp(0, total);
        Self {
            has_time_left: elapsed < total,
            time_used,
            time_remaining: total - time_used,
        }
    }

    /// Timing reported when the learner has no attempt yet.
    #[must_use]
    pub fn unstarted(duration_secs: i64) -> Self {
        let total = duration_secs.max(0);
        Self {
            has_time_left: total > 0,
            time_used: 0,
            time_remaining: total,
        }
    }
}

impl AssessmentAttempt {
    /// Creates a fresh attempt, started at `now`.
    #[must_use]
    pub fn start(
        id: AttemptId,
        user_id: UserId,
        assessment_id: AssessmentId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            assessment_id,
            status: AttemptStatus::InProgress,
            start_time: now,
            created_at: now,
        }
    }

    /// Rehydrate an attempt from persisted storage.
    #[must_use]
    pub fn from_persisted(
        id: AttemptId,
        user_id: UserId,
        assessment_id: AssessmentId,
        status: AttemptStatus,
        start_time: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            assessment_id,
            status,
            start_time,
            created_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> AttemptId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn assessment_id(&self) -> AssessmentId {
        self.assessment_id
    }

    #[must_use]
    pub fn status(&self) -> AttemptStatus {
        self.status
    }

    #[must_use]
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == AttemptStatus::Completed
    }

    #[must_use]
    pub fn timing(&self, duration_secs: i64, now: DateTime<Utc>) -> AttemptTiming {
        AttemptTiming::compute(self.start_time, duration_secs, now)
    }

    /// Force the attempt into `Completed` and rewind `start_time` so that any
    /// later time check reports zero remaining.
    pub fn complete(&mut self, duration_secs: i64, now: DateTime<Utc>) {
        self.status = AttemptStatus::Completed;
        self.start_time = now - Duration::seconds(duration_secs.max(0));
    }
}

//
// ─── SNAPSHOT AND ANSWERS ──────────────────────────────────────────────────────
//

/// A question frozen into an attempt at start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptQuestion {
    pub id: AttemptQuestionId,
    pub attempt_id: AttemptId,
    pub question_id: QuestionId,
}

/// One selected option. Selection-count rules live in the answer ledger, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserAnswer {
    pub id: UserAnswerId,
    pub attempt_id: AttemptId,
    pub attempt_question_id: AttemptQuestionId,
    pub option_id: OptionId,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
