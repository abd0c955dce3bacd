use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{AssessmentId, CourseId, LearningPathId, ModuleId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CurriculumError {
    #[error("title cannot be empty")]
    EmptyTitle,

    #[error("module order must be >= 1")]
    InvalidOrder,

    #[error("assessment modules must link an assessment")]
    MissingAssessment,

    #[error("only assessment modules may link an assessment")]
    UnexpectedAssessment,

    #[error("invalid content type: {0}")]
    InvalidContentType(String),
}

fn require_title(title: String) -> Result<String, CurriculumError> {
    if title.trim().is_empty() {
        return Err(CurriculumError::EmptyTitle);
    }
    Ok(title)
}

//
// ─── CONTENT TYPE ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Video,
    Pdf,
    Text,
    Ppt,
    Docx,
    Assessment,
}

impl ContentType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Video => "video",
            ContentType::Pdf => "pdf",
            ContentType::Text => "text",
            ContentType::Ppt => "ppt",
            ContentType::Docx => "docx",
            ContentType::Assessment => "assessment",
        }
    }

    /// # Errors
    ///
    /// Returns `CurriculumError::InvalidContentType` for unknown values.
    pub fn parse(value: &str) -> Result<Self, CurriculumError> {
        match value {
            "video" => Ok(Self::Video),
            "pdf" => Ok(Self::Pdf),
            "text" => Ok(Self::Text),
            "ppt" => Ok(Self::Ppt),
            "docx" => Ok(Self::Docx),
            "assessment" => Ok(Self::Assessment),
            other => Err(CurriculumError::InvalidContentType(other.to_owned())),
        }
    }

    /// Timed content reports progress through playback pings instead of
    /// being marked in progress on first entry.
    #[must_use]
    pub fn is_timed(self) -> bool {
        matches!(self, ContentType::Video)
    }
}

//
// ─── MODULE ────────────────────────────────────────────────────────────────────
//

/// Ordered unit of a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    id: ModuleId,
    course_id: CourseId,
    title: String,
    order: u32,
    content_type: ContentType,
    assessment_id: Option<AssessmentId>,
}

impl Module {
    /// # Errors
    ///
    /// Returns `CurriculumError` if the title is blank, `order` is 0, or the
    /// assessment link does not match the content type.
    pub fn new(
        id: ModuleId,
        course_id: CourseId,
        title: impl Into<String>,
        order: u32,
        content_type: ContentType,
        assessment_id: Option<AssessmentId>,
    ) -> Result<Self, CurriculumError> {
        let title = require_title(title.into())?;
        if order == 0 {
            return Err(CurriculumError::InvalidOrder);
        }
        match (content_type, assessment_id) {
            (ContentType::Assessment, None) => return Err(CurriculumError::MissingAssessment),
            (ct, Some(_)) if ct != ContentType::Assessment => {
                return Err(CurriculumError::UnexpectedAssessment);
            }
            _ => {}
        }
        Ok(Self {
            id,
            course_id,
            title,
            order,
            content_type,
            assessment_id,
        })
    }

    #[must_use]
    pub fn id(&self) -> ModuleId {
        self.id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn order(&self) -> u32 {
        self.order
    }

    #[must_use]
    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    #[must_use]
    pub fn assessment_id(&self) -> Option<AssessmentId> {
        self.assessment_id
    }
}

//
// ─── COURSE AND PATH ───────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Course {
    id: CourseId,
    title: String,
}

impl Course {
    /// # Errors
    ///
    /// Returns `CurriculumError::EmptyTitle` for a blank title.
    pub fn new(id: CourseId, title: impl Into<String>) -> Result<Self, CurriculumError> {
        Ok(Self {
            id,
            title: require_title(title.into())?,
        })
    }

    #[must_use]
    pub fn id(&self) -> CourseId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LearningPath {
    id: LearningPathId,
    title: String,
}

impl LearningPath {
    /// # Errors
    ///
    /// Returns `CurriculumError::EmptyTitle` for a blank title.
    pub fn new(id: LearningPathId, title: impl Into<String>) -> Result<Self, CurriculumError> {
        Ok(Self {
            id,
            title: require_title(title.into())?,
        })
    }

    #[must_use]
    pub fn id(&self) -> LearningPathId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }
}

/// Finds the module whose `order` is immediately before `order`, if any.
///
/// Modules are matched by their `order` field, not by id.
#[must_use]
pub fn preceding_module(modules: &[Module], order: u32) -> Option<&Module> {
    let previous = order.checked_sub(1)?;
    modules.iter().find(|m| m.order == previous)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn module(id: u64, order: u32) -> Module {
        Module::new(
            ModuleId::new(id),
            CourseId::new(1),
            format!("M{id}"),
            order,
            ContentType::Text,
            None,
        )
        .unwrap()
    }

    #[test]
    fn assessment_module_requires_link() {
        let err = Module::new(
            ModuleId::new(1),
            CourseId::new(1),
            "Quiz",
            1,
            ContentType::Assessment,
            None,
        )
        .unwrap_err();
        assert_eq!(err, CurriculumError::MissingAssessment);

        let err = Module::new(
            ModuleId::new(1),
            CourseId::new(1),
            "Video",
            1,
            ContentType::Video,
            Some(AssessmentId::new(1)),
        )
        .unwrap_err();
        assert_eq!(err, CurriculumError::UnexpectedAssessment);
    }

    #[test]
    fn order_zero_is_rejected() {
        let err = Module::new(
            ModuleId::new(1),
            CourseId::new(1),
            "Intro",
            0,
            ContentType::Pdf,
            None,
        )
        .unwrap_err();
        assert_eq!(err, CurriculumError::InvalidOrder);
    }

    #[test]
    fn content_type_round_trips() {
        for ct in [
            ContentType::Video,
            ContentType::Pdf,
            ContentType::Text,
            ContentType::Ppt,
            ContentType::Docx,
            ContentType::Assessment,
        ] {
            assert_eq!(ContentType::parse(ct.as_str()).unwrap(), ct);
        }
        assert!(ContentType::Video.is_timed());
        assert!(!ContentType::Pdf.is_timed());
    }

    #[test]
    fn preceding_module_is_found_by_order_not_id() {
        let modules = vec![module(30, 1), module(10, 2), module(20, 3)];
        assert_eq!(preceding_module(&modules, 3).unwrap().id(), ModuleId::new(10));
        assert_eq!(preceding_module(&modules, 2).unwrap().id(), ModuleId::new(30));
        assert!(preceding_module(&modules, 1).is_none());
    }
}
