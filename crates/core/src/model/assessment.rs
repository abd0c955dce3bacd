use thiserror::Error;

use crate::model::ids::{AssessmentId, ModuleId, OptionId, QuestionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AssessmentError {
    #[error("assessment duration must be > 0 minutes")]
    InvalidDuration,

    #[error("question text cannot be empty")]
    EmptyQuestion,

    #[error("option text cannot be empty")]
    EmptyOption,
}

//
// ─── ASSESSMENT ────────────────────────────────────────────────────────────────
//

/// A timed multiple-choice assessment attached to one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    id: AssessmentId,
    module_id: ModuleId,
    title: String,
    number_of_questions: u32,
    duration_minutes: u32,
}

impl Assessment {
    /// Creates an assessment.
    ///
    /// `number_of_questions` is the sample size drawn per attempt and may be 0.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError::InvalidDuration` if `duration_minutes` is 0.
    pub fn new(
        id: AssessmentId,
        module_id: ModuleId,
        title: impl Into<String>,
        number_of_questions: u32,
        duration_minutes: u32,
    ) -> Result<Self, AssessmentError> {
        if duration_minutes == 0 {
            return Err(AssessmentError::InvalidDuration);
        }
        Ok(Self {
            id,
            module_id,
            title: title.into(),
            number_of_questions,
            duration_minutes,
        })
    }

    #[must_use]
    pub fn id(&self) -> AssessmentId {
        self.id
    }

    #[must_use]
    pub fn module_id(&self) -> ModuleId {
        self.module_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn number_of_questions(&self) -> u32 {
        self.number_of_questions
    }

    #[must_use]
    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    /// Allowed time for one attempt, in seconds.
    #[must_use]
    pub fn duration_secs(&self) -> i64 {
        i64::from(self.duration_minutes) * 60
    }
}

//
// ─── QUESTIONS AND OPTIONS ─────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    assessment_id: AssessmentId,
    text: String,
    remedial_module: Option<ModuleId>,
}

impl Question {
    /// # Errors
    ///
    /// Returns `AssessmentError::EmptyQuestion` for blank text.
    pub fn new(
        id: QuestionId,
        assessment_id: AssessmentId,
        text: impl Into<String>,
        remedial_module: Option<ModuleId>,
    ) -> Result<Self, AssessmentError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(AssessmentError::EmptyQuestion);
        }
        Ok(Self {
            id,
            assessment_id,
            text,
            remedial_module,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn assessment_id(&self) -> AssessmentId {
        self.assessment_id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Module recommended to learners who answer this question incorrectly.
    #[must_use]
    pub fn remedial_module(&self) -> Option<ModuleId> {
        self.remedial_module
    }
}

/// One selectable answer of a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOption {
    id: OptionId,
    question_id: QuestionId,
    text: String,
    is_correct: bool,
}

impl AnswerOption {
    /// # Errors
    ///
    /// Returns `AssessmentError::EmptyOption` for blank text.
    pub fn new(
        id: OptionId,
        question_id: QuestionId,
        text: impl Into<String>,
        is_correct: bool,
    ) -> Result<Self, AssessmentError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(AssessmentError::EmptyOption);
        }
        Ok(Self {
            id,
            question_id,
            text,
            is_correct,
        })
    }

    #[must_use]
    pub fn id(&self) -> OptionId {
        self.id
    }

    #[must_use]
    pub fn question_id(&self) -> QuestionId {
        self.question_id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.is_correct
    }
}

//
// ─── BUSINESS RULES ────────────────────────────────────────────────────────────
//

/// Multi-answer rule: a question accepts several selections when more than one
/// of its options is marked correct.
///
/// Always evaluated against the current option set, never a copy frozen at
/// attempt start, so editing a question's options changes how an in-flight
/// attempt behaves.
#[must_use]
pub fn is_multiple_answer(options: &[AnswerOption]) -> bool {
    options.iter().filter(|o| o.is_correct).count() > 1
}

/// Eligibility rule: only questions with at least one correct option can be sampled.
#[must_use]
pub fn is_eligible(options: &[AnswerOption]) -> bool {
    options.iter().any(|o| o.is_correct)
}

/// Sorted ids of the options marked correct.
#[must_use]
pub fn correct_option_ids(options: &[AnswerOption]) -> Vec<OptionId> {
    let mut ids: Vec<OptionId> = options
        .iter()
        .filter(|o| o.is_correct)
        .map(AnswerOption::id)
        .collect();
    ids.sort_unstable();
    ids
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn option(id: u64, correct: bool) -> AnswerOption {
        AnswerOption::new(OptionId::new(id), QuestionId::new(1), format!("O{id}"), correct).unwrap()
    }

    #[test]
    fn zero_duration_is_rejected() {
        let err =
            Assessment::new(AssessmentId::new(1), ModuleId::new(1), "Quiz", 5, 0).unwrap_err();
        assert_eq!(err, AssessmentError::InvalidDuration);
    }

    #[test]
    fn duration_is_reported_in_seconds() {
        let a = Assessment::new(AssessmentId::new(1), ModuleId::new(1), "Quiz", 5, 15).unwrap();
        assert_eq!(a.duration_secs(), 900);
    }

    #[test]
    fn multiple_answer_requires_two_correct_options() {
        assert!(!is_multiple_answer(&[option(1, true), option(2, false)]));
        assert!(is_multiple_answer(&[option(1, true), option(2, true), option(3, false)]));
        assert!(!is_multiple_answer(&[]));
    }

    #[test]
    fn eligibility_requires_a_correct_option() {
        assert!(is_eligible(&[option(1, false), option(2, true)]));
        assert!(!is_eligible(&[option(1, false), option(2, false)]));
    }

    #[test]
    fn correct_ids_are_sorted() {
        let ids = correct_option_ids(&[option(9, true), option(2, false), option(4, true)]);
        assert_eq!(ids, vec![OptionId::new(4), OptionId::new(9)]);
    }

    #[test]
    fn blank_question_text_is_rejected() {
        let err = Question::new(QuestionId::new(1), AssessmentId::new(1), "  ", None).unwrap_err();
        assert_eq!(err, AssessmentError::EmptyQuestion);
    }
}
