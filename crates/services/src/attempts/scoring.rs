use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use lms_core::model::{AttemptId, Module, correct_option_ids};
use lms_core::scoring::{dedup_first_seen, format_score_percent, is_exact_match};
use storage::repository::{AttemptRepository, CatalogRepository};

use super::{AttemptSnapshot, load_snapshot};
use crate::error::AttemptError;

/// Result of grading an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    pub total_questions: u32,
    pub correct_answers: u32,
    /// Percentage with two decimals, e.g. `"50.00"`.
    pub score_percent: String,
    /// Remedial modules for incorrectly answered questions, first-seen order.
    #[serde(rename = "Recommendations")]
    pub recommendations: Vec<Module>,
}

/// Grades attempts by exact set match and collects remedial modules.
#[derive(Clone)]
pub struct ScoringService {
    catalog: Arc<dyn CatalogRepository>,
    attempts: Arc<dyn AttemptRepository>,
}

impl ScoringService {
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogRepository>, attempts: Arc<dyn AttemptRepository>) -> Self {
        Self { catalog, attempts }
    }

    /// Score an attempt in its current state, finished or not.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::AttemptNotFound` if the attempt does not exist.
    pub async fn score(&self, attempt_id: AttemptId) -> Result<ScoreReport, AttemptError> {
        let attempt = self
            .attempts
            .get_attempt(attempt_id)
            .await?
            .ok_or(AttemptError::AttemptNotFound(attempt_id))?;
        let snapshot = load_snapshot(self.catalog.as_ref(), self.attempts.as_ref(), attempt).await?;
        self.score_snapshot(&snapshot).await
    }

    pub(crate) async fn score_snapshot(
        &self,
        snapshot: &AttemptSnapshot,
    ) -> Result<ScoreReport, AttemptError> {
        let mut correct = 0_u32;
        let mut remedial = Vec::new();

        for entry in &snapshot.entries {
            let expected = correct_option_ids(&entry.options);
            if is_exact_match(&entry.selected, &expected) {
                correct += 1;
            } else if let Some(module_id) = entry.question.remedial_module() {
                remedial.push(module_id);
            }
        }

        let mut recommendations = Vec::new();
        for module_id in dedup_first_seen(remedial) {
            match self.catalog.get_module(module_id).await? {
                Some(module) => recommendations.push(module),
                None => warn!(
                    module_id = %module_id,
                    attempt_id = %snapshot.attempt.id(),
                    "remedial module missing; skipping recommendation"
                ),
            }
        }

        let total = u32::try_from(snapshot.entries.len()).unwrap_or(u32::MAX);
        Ok(ScoreReport {
            total_questions: total,
            correct_answers: correct,
            score_percent: format_score_percent(correct, total),
            recommendations,
        })
    }
}
