use serde::Serialize;

use lms_core::model::{AttemptQuestionId, OptionId, QuestionId, is_multiple_answer};

use super::AttemptSnapshot;

/// One option as shown to the learner. Correctness is never exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionView {
    pub id: OptionId,
    pub text: String,
    /// Absent on a freshly started attempt, present once answers are joined in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub attempt_question_id: AttemptQuestionId,
    pub question_id: QuestionId,
    pub text: String,
    pub is_multiple: bool,
    pub options: Vec<OptionView>,
}

/// Renders the snapshot in presentation order with options sorted by id.
pub(crate) fn question_views(
    snapshot: &AttemptSnapshot,
    with_selection: bool,
) -> Vec<QuestionView> {
    snapshot
        .entries
        .iter()
        .map(|entry| QuestionView {
            attempt_question_id: entry.row.id,
            question_id: entry.question.id(),
            text: entry.question.text().to_owned(),
            is_multiple: is_multiple_answer(&entry.options),
            options: entry
                .options
                .iter()
                .map(|option| OptionView {
                    id: option.id(),
                    text: option.text().to_owned(),
                    selected: with_selection.then(|| entry.selected.contains(&option.id())),
                })
                .collect(),
        })
        .collect()
}
