//! Assessment attempt engine: timed sessions, the answer ledger, and scoring.

mod ledger;
mod sampling;
mod scoring;
mod session;
mod view;

use std::collections::HashMap;

use lms_core::model::{
    AnswerOption, Assessment, AssessmentAttempt, AttemptQuestion, OptionId, Question, QuestionId,
};
use storage::repository::{AttemptRepository, CatalogRepository};

use crate::error::AttemptError;

pub use ledger::AnswerLedger;
pub use sampling::QuestionSampler;
pub use scoring::{ScoreReport, ScoringService};
pub use session::{AttemptCheck, AttemptService, AttemptView};
pub use view::{OptionView, QuestionView};

/// One snapshot row joined with its live question, options, and selections.
#[derive(Debug, Clone)]
pub(crate) struct SnapshotEntry {
    pub row: AttemptQuestion,
    pub question: Question,
    /// Current options of the question, sorted by id.
    pub options: Vec<AnswerOption>,
    pub selected: Vec<OptionId>,
}

/// An attempt re-derived from storage, in presentation order.
#[derive(Debug, Clone)]
pub(crate) struct AttemptSnapshot {
    pub attempt: AssessmentAttempt,
    pub assessment: Assessment,
    pub entries: Vec<SnapshotEntry>,
}

/// Rebuild an attempt's snapshot from the store.
///
/// Snapshot rows come back in creation order; options and correctness are read
/// live from the catalog.
pub(crate) async fn load_snapshot(
    catalog: &dyn CatalogRepository,
    attempts: &dyn AttemptRepository,
    attempt: AssessmentAttempt,
) -> Result<AttemptSnapshot, AttemptError> {
    let assessment_id = attempt.assessment_id();
    let assessment = catalog
        .get_assessment(assessment_id)
        .await?
        .ok_or(AttemptError::AssessmentNotFound(assessment_id))?;

    let rows = attempts.attempt_questions(attempt.id()).await?;
    let answers = attempts.answers_for_attempt(attempt.id()).await?;

    let questions: HashMap<QuestionId, Question> = catalog
        .questions_for_assessment(assessment_id)
        .await?
        .into_iter()
        .map(|q| (q.id(), q))
        .collect();
    let mut options: HashMap<QuestionId, Vec<AnswerOption>> = HashMap::new();
    for option in catalog.options_for_assessment(assessment_id).await? {
        options.entry(option.question_id()).or_default().push(option);
    }

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        let question = questions
            .get(&row.question_id)
            .cloned()
            .ok_or(AttemptError::QuestionNotFound(row.question_id))?;
        let mut question_options = options.get(&row.question_id).cloned().unwrap_or_default();
        question_options.sort_by_key(AnswerOption::id);
        let selected = answers
            .iter()
            .filter(|a| a.attempt_question_id == row.id)
            .map(|a| a.option_id)
            .collect();
        entries.push(SnapshotEntry {
            row,
            question,
            options: question_options,
            selected,
        });
    }

    Ok(AttemptSnapshot {
        attempt,
        assessment,
        entries,
    })
}
