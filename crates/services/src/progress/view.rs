use serde::Serialize;

use lms_core::model::{Course, Module, ModuleStatus, UserModuleProgress};

use crate::attempts::ScoreReport;

/// A module with the learner's progress and, for assessments, their latest score.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleView {
    pub module: Module,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<UserModuleProgress>,
    /// Informational only; a failed assessment can still be completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<ScoreReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleProgressEntry {
    pub module: Module,
    pub status: ModuleStatus,
    pub progress: f64,
}

/// A course in module order with per-module state and the stored course percentage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseOverview {
    pub course: Course,
    pub progress: u8,
    pub modules: Vec<ModuleProgressEntry>,
}
