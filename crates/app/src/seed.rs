use lms_core::model::{
    AnswerOption, Assessment, AssessmentId, ContentType, Course, CourseId, LearningPath,
    LearningPathId, Module, ModuleId, OptionId, Question, QuestionId, UserId,
};
use storage::repository::CatalogWriter;

pub const INTRO_COURSE: CourseId = CourseId::new(1);
pub const FOLLOW_UP_COURSE: CourseId = CourseId::new(2);
pub const TRACK: LearningPathId = LearningPathId::new(1);
pub const QUIZ_MODULE: ModuleId = ModuleId::new(3);
pub const QUIZ: AssessmentId = AssessmentId::new(1);
pub const LEARNER: UserId = UserId::new(1);
pub const LEARNER_EMAIL: &str = "learner@example.com";

/// Records of the demo catalog, validated but not yet stored.
pub struct DemoCatalog {
    pub courses: Vec<Course>,
    pub modules: Vec<Module>,
    pub assessment: Assessment,
    pub questions: Vec<(Question, Vec<AnswerOption>)>,
    pub path: (LearningPath, Vec<CourseId>),
}

/// Build the demo catalog: a three-module course ending in a quiz, a follow-up
/// course, and a path through both.
///
/// # Errors
///
/// Returns the first domain validation failure.
pub fn demo_catalog() -> Result<DemoCatalog, lms_core::error::Error> {
    let courses = vec![
        Course::new(INTRO_COURSE, "Rust Foundations")?,
        Course::new(FOLLOW_UP_COURSE, "Async Rust")?,
    ];

    let modules = vec![
        Module::new(
            ModuleId::new(1),
            INTRO_COURSE,
            "Ownership walkthrough",
            1,
            ContentType::Video,
            None,
        )?,
        Module::new(
            ModuleId::new(2),
            INTRO_COURSE,
            "Borrowing notes",
            2,
            ContentType::Text,
            None,
        )?,
        Module::new(
            QUIZ_MODULE,
            INTRO_COURSE,
            "Checkpoint quiz",
            3,
            ContentType::Assessment,
            Some(QUIZ),
        )?,
        Module::new(
            ModuleId::new(4),
            FOLLOW_UP_COURSE,
            "Futures and executors",
            1,
            ContentType::Pdf,
            None,
        )?,
    ];

    let assessment = Assessment::new(QUIZ, QUIZ_MODULE, "Checkpoint quiz", 2, 10)?;

    let raw: [(u64, &str, Option<ModuleId>, &[(u64, &str, bool)]); 3] = [
        (
            1,
            "Which keyword moves a value into a closure?",
            Some(ModuleId::new(1)),
            &[(1, "move", true), (2, "ref", false), (3, "static", false)],
        ),
        (
            2,
            "Which of these are smart pointers?",
            Some(ModuleId::new(2)),
            &[(4, "Box", true), (5, "Rc", true), (6, "u8", false)],
        ),
        (
            3,
            "What does the borrow checker enforce?",
            None,
            &[
                (7, "Aliasing xor mutation", true),
                (8, "Garbage collection", false),
            ],
        ),
    ];
    let mut questions = Vec::with_capacity(raw.len());
    for (id, text, remedial, options) in raw {
        let question_id = QuestionId::new(id);
        let question = Question::new(question_id, QUIZ, text, remedial)?;
        let options = options
            .iter()
            .map(|&(option_id, label, correct)| {
                AnswerOption::new(OptionId::new(option_id), question_id, label, correct)
            })
            .collect::<Result<Vec<_>, _>>()?;
        questions.push((question, options));
    }

    let path = (
        LearningPath::new(TRACK, "Rust track")?,
        vec![INTRO_COURSE, FOLLOW_UP_COURSE],
    );

    Ok(DemoCatalog {
        courses,
        modules,
        assessment,
        questions,
        path,
    })
}

/// Write the demo catalog. Every write is an upsert, so reseeding is harmless.
///
/// # Errors
///
/// Returns an error if a record is invalid or cannot be stored.
pub async fn seed_catalog(catalog: &dyn CatalogWriter) -> Result<(), Box<dyn std::error::Error>> {
    let demo = demo_catalog()?;
    for course in &demo.courses {
        catalog.upsert_course(course).await?;
    }
    for module in &demo.modules {
        catalog.upsert_module(module).await?;
    }
    catalog.upsert_assessment(&demo.assessment).await?;
    for (question, options) in &demo.questions {
        catalog.upsert_question(question).await?;
        for option in options {
            catalog.upsert_option(option).await?;
        }
    }
    let (path, courses) = &demo.path;
    catalog.upsert_learning_path(path, courses).await?;
    Ok(())
}
