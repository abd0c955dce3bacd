use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CourseId, LearningPathId, ModuleId, UserId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ProgressValidationError {
    #[error("progress must be a number between 0 and 100, got {0}")]
    OutOfRange(f64),

    #[error("resume position must be a non-negative number of seconds, got {0}")]
    InvalidLastSecond(f64),

    #[error("invalid module status: {0}")]
    InvalidStatus(String),

    #[error("stored percentage out of range: {0}")]
    InvalidPercent(i64),
}

//
// ─── MODULE STATUS ─────────────────────────────────────────────────────────────
//

/// Per-learner module state: `NotStarted -> InProgress -> Completed`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl ModuleStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ModuleStatus::NotStarted => "not_started",
            ModuleStatus::InProgress => "in_progress",
            ModuleStatus::Completed => "completed",
        }
    }

    /// # Errors
    ///
    /// Returns `ProgressValidationError::InvalidStatus` for unknown values.
    pub fn parse(value: &str) -> Result<Self, ProgressValidationError> {
        match value {
            "not_started" => Ok(Self::NotStarted),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            other => Err(ProgressValidationError::InvalidStatus(other.to_owned())),
        }
    }

    /// Status after requesting `next`; states never move backwards.
    #[must_use]
    pub fn advance_to(self, next: ModuleStatus) -> ModuleStatus {
        self.max(next)
    }
}

//
// ─── MODULE PROGRESS ───────────────────────────────────────────────────────────
//

/// Learner progress on a single module.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserModuleProgress {
    pub user_id: UserId,
    pub module_id: ModuleId,
    pub status: ModuleStatus,
    pub progress: f64,
    pub last_accessed_at: DateTime<Utc>,
    /// Resume cursor for time-based content.
    pub last_second: Option<f64>,
}

/// A partial update to a module progress record.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ModuleProgressUpdate {
    pub status: Option<ModuleStatus>,
    pub progress: Option<f64>,
    pub last_second: Option<f64>,
}

impl UserModuleProgress {
    #[must_use]
    pub fn not_started(user_id: UserId, module_id: ModuleId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            module_id,
            status: ModuleStatus::NotStarted,
            progress: 0.0,
            last_accessed_at: now,
            last_second: None,
        }
    }

    /// Apply a progress write.
    ///
    /// - status never regresses;
    /// - a progress value on a `NotStarted` record moves it to `InProgress`;
    /// - reaching `Completed` pins progress to 100.
    ///
    /// # Errors
    ///
    /// Returns `ProgressValidationError` if `progress` or `last_second` is out of range.
    /// The record is left untouched on error.
    pub fn apply(
        &mut self,
        update: ModuleProgressUpdate,
        now: DateTime<Utc>,
    ) -> Result<(), ProgressValidationError> {
        if let Some(p) = update.progress {
            if !p.is_finite() || !(0.0..=100.0).contains(&p) {
                return Err(ProgressValidationError::OutOfRange(p));
            }
        }
        if let Some(s) = update.last_second {
            if !s.is_finite() || s < 0.0 {
                return Err(ProgressValidationError::InvalidLastSecond(s));
            }
        }

        if let Some(status) = update.status {
            self.status = self.status.advance_to(status);
        }
        if let Some(p) = update.progress {
            self.progress = p;
            self.status = self.status.advance_to(ModuleStatus::InProgress);
        }
        if let Some(s) = update.last_second {
            self.last_second = Some(s);
        }
        if self.status == ModuleStatus::Completed {
            self.progress = 100.0;
        }
        self.last_accessed_at = now;
        Ok(())
    }

    /// Mark the module completed.
    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.status = ModuleStatus::Completed;
        self.progress = 100.0;
        self.last_accessed_at = now;
    }
}

//
// ─── COURSE / PATH PROGRESS ────────────────────────────────────────────────────
//

/// What a `UserProgress` row measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ProgressTarget {
    Course(CourseId),
    LearningPath(LearningPathId),
}

/// Whole-number completion percentage of a course or learning path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub user_id: UserId,
    pub target: ProgressTarget,
    pub progress: u8,
}

impl UserProgress {
    #[must_use]
    pub fn new(user_id: UserId, target: ProgressTarget, progress: u8) -> Self {
        Self {
            user_id,
            target,
            progress: progress.min(100),
        }
    }
}

/// Course completion when entering the module at `target_order` (1-based).
///
/// `floor((target_order - 1) / total_modules * 100)`, or 100 when the learner
/// signals the end of the course.
#[must_use]
pub fn course_progress_percent(target_order: u32, total_modules: usize, end_of_course: bool) -> u8 {
    if end_of_course {
        return 100;
    }
    percent_floor(u64::from(target_order.saturating_sub(1)), total_modules)
}

/// Learning-path completion when entering the course at `course_index` (0-based).
///
/// Measured in whole courses, independent of each course's module count.
#[must_use]
pub fn path_progress_percent(course_index: usize, total_courses: usize) -> u8 {
    percent_floor(course_index as u64, total_courses)
}

fn percent_floor(done: u64, total: usize) -> u8 {
    let total = total as u64;
    if total == 0 {
        return 0;
    }
    let pct = (done * 100 / total).min(100);
    u8::try_from(pct).unwrap_or(100)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
