mod assessment;
mod attempt;
mod curriculum;
mod ids;
mod progress;

pub use ids::{
    AssessmentId, AttemptId, AttemptQuestionId, CourseId, LearningPathId, ModuleId, OptionId,
    ParseIdError, QuestionId, UserAnswerId, UserId,
};

pub use assessment::{
    AnswerOption, Assessment, AssessmentError, Question, correct_option_ids, is_eligible,
    is_multiple_answer,
};
pub use attempt::{
    AssessmentAttempt, AttemptQuestion, AttemptStateError, AttemptStatus, AttemptTiming,
    UserAnswer,
};
pub use curriculum::{
    ContentType, Course, CurriculumError, LearningPath, Module, preceding_module,
};
pub use progress::{
    ModuleProgressUpdate, ModuleStatus, ProgressTarget, ProgressValidationError, UserModuleProgress,
    UserProgress, course_progress_percent, path_progress_percent,
};
