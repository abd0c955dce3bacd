use lms_core::model::{
    AnswerOption, Assessment, AssessmentId, ContentType, Course, CourseId, LearningPath,
    LearningPathId, Module, ModuleId, ModuleStatus, OptionId, ProgressTarget, Question,
    QuestionId, UserId,
};
use lms_core::time::fixed_clock;
use services::{ActiveModuleRequest, AppServices, ErrorKind, PolicyConfig};
use storage::repository::Storage;

const LEARNER: UserId = UserId::new(3);
const PATH: LearningPathId = LearningPathId::new(1);
const QUIZ: AssessmentId = AssessmentId::new(1);

// Course 1: modules 1, 2, 3 (3 is the quiz). Course 2: module 4. Course 3: module 5.
// Path 1: courses [1, 2, 3].
async fn seed(storage: &Storage) {
    let w = storage.catalog_writer.as_ref();
    for id in 1..=3 {
        w.upsert_course(&Course::new(CourseId::new(id), format!("Course {id}")).unwrap())
            .await
            .unwrap();
    }
    let modules = [
        (1, 1, 1, ContentType::Video, None),
        (2, 1, 2, ContentType::Text, None),
        (3, 1, 3, ContentType::Assessment, Some(QUIZ)),
        (4, 2, 1, ContentType::Pdf, None),
        (5, 3, 1, ContentType::Text, None),
    ];
    for (id, course, order, kind, assessment) in modules {
        w.upsert_module(
            &Module::new(
                ModuleId::new(id),
                CourseId::new(course),
                "Module",
                order,
                kind,
                assessment,
            )
            .unwrap(),
        )
        .await
        .unwrap();
    }
    w.upsert_assessment(&Assessment::new(QUIZ, ModuleId::new(3), "Quiz", 1, 10).unwrap())
        .await
        .unwrap();
    let remedial = Some(ModuleId::new(2));
    let question = Question::new(QuestionId::new(1), QUIZ, "Pick", remedial).unwrap();
    w.upsert_question(&question).await.unwrap();
    for (id, correct) in [(1, true), (2, false)] {
        w.upsert_option(
            &AnswerOption::new(OptionId::new(id), QuestionId::new(1), "Option", correct).unwrap(),
        )
        .await
        .unwrap();
    }
    w.upsert_learning_path(
        &LearningPath::new(PATH, "Track").unwrap(),
        &[CourseId::new(1), CourseId::new(2), CourseId::new(3)],
    )
    .await
    .unwrap();
}

fn open(module: u64) -> ActiveModuleRequest {
    ActiveModuleRequest {
        course_id: None,
        learning_path_id: None,
        module_id: ModuleId::new(module),
        end: false,
    }
}

async fn in_memory() -> AppServices {
    let storage = Storage::in_memory();
    seed(&storage).await;
    AppServices::from_storage(storage, fixed_clock(), &PolicyConfig::default())
}

async fn course_percent(services: &AppServices, course: u64) -> Option<u8> {
    services
        .storage()
        .progress
        .get_user_progress(LEARNER, ProgressTarget::Course(CourseId::new(course)))
        .await
        .unwrap()
        .map(|p| p.progress)
}

async fn advancing_completes_the_previous_module(services: &AppServices) {
    let outcome = services
        .progress()
        .set_active_module(
            LEARNER,
            ActiveModuleRequest {
                course_id: Some(CourseId::new(1)),
                ..open(2)
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome.course_progress, 33);
    assert_eq!(outcome.completed_modules, vec![ModuleId::new(1)]);

    let first = services
        .storage()
        .progress
        .get_module_progress(LEARNER, ModuleId::new(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.status, ModuleStatus::Completed);
    assert!((first.progress - 100.0).abs() < f64::EPSILON);

    let second = services
        .storage()
        .progress
        .get_module_progress(LEARNER, ModuleId::new(2))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.status, ModuleStatus::InProgress);
    assert_eq!(course_percent(services, 1).await, Some(33));
}

#[tokio::test]
async fn advancing_in_memory() {
    advancing_completes_the_previous_module(&in_memory().await).await;
}

#[tokio::test]
async fn advancing_on_sqlite() {
    let storage = Storage::sqlite("sqlite:file:memdb_cascade?mode=memory&cache=shared")
        .await
        .unwrap();
    seed(&storage).await;
    let services = AppServices::from_storage(storage, fixed_clock(), &PolicyConfig::default());
    advancing_completes_the_previous_module(&services).await;
}

#[tokio::test]
async fn entering_a_later_course_moves_the_path_and_closes_the_previous_course() {
    let services = in_memory().await;
    let outcome = services
        .progress()
        .set_active_module(
            LEARNER,
            ActiveModuleRequest {
                course_id: Some(CourseId::new(2)),
                learning_path_id: Some(PATH),
                ..open(4)
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.path_progress, Some(33));
    assert_eq!(outcome.course_progress, 0);
    assert_eq!(outcome.auto_completed_course, Some(CourseId::new(1)));
    assert_eq!(course_percent(&services, 1).await, Some(100));

    let path = services
        .storage()
        .progress
        .get_user_progress(LEARNER, ProgressTarget::LearningPath(PATH))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(path.progress, 33);
}

#[tokio::test]
async fn unknown_path_writes_nothing() {
    let services = in_memory().await;
    let err = services
        .progress()
        .set_active_module(
            LEARNER,
            ActiveModuleRequest {
                course_id: Some(CourseId::new(2)),
                learning_path_id: Some(LearningPathId::new(9)),
                ..open(4)
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(course_percent(&services, 2).await, None);
}

#[tokio::test]
async fn module_view_carries_the_latest_score() {
    let services = in_memory().await;
    let token = services.auth().issue(LEARNER, "l@example.com").unwrap();
    let api = services.api();

    let before = api.module(Some(&token), ModuleId::new(3)).await.unwrap();
    assert!(before.score.is_none());

    let attempt = api.start_attempt(Some(&token), QUIZ).await.unwrap();
    api.set_answer(Some(&token), attempt.attempt_id, OptionId::new(2))
        .await
        .unwrap();
    api.end_attempt(Some(&token), attempt.attempt_id).await.unwrap();

    let after = api.module(Some(&token), ModuleId::new(3)).await.unwrap();
    let score = after.score.unwrap();
    assert_eq!(score.score_percent, "0.00");
    assert_eq!(score.recommendations.len(), 1);

    let plain = api.module(Some(&token), ModuleId::new(2)).await.unwrap();
    assert!(plain.score.is_none());
}

#[tokio::test]
async fn course_overview_lists_modules_in_order_with_status() {
    let services = in_memory().await;
    let token = services.auth().issue(LEARNER, "l@example.com").unwrap();
    let api = services.api();

    api.set_active_module(Some(&token), open(3)).await.unwrap();
    let overview = api.course(Some(&token), CourseId::new(1)).await.unwrap();

    assert_eq!(overview.progress, 66);
    let statuses: Vec<(ModuleId, ModuleStatus)> = overview
        .modules
        .iter()
        .map(|entry| (entry.module.id(), entry.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            (ModuleId::new(1), ModuleStatus::NotStarted),
            (ModuleId::new(2), ModuleStatus::Completed),
            (ModuleId::new(3), ModuleStatus::InProgress),
        ]
    );
}

#[tokio::test]
async fn failed_assessment_module_can_still_be_completed() {
    let services = in_memory().await;
    let token = services.auth().issue(LEARNER, "l@example.com").unwrap();
    let api = services.api();

    let attempt = api.start_attempt(Some(&token), QUIZ).await.unwrap();
    api.set_answer(Some(&token), attempt.attempt_id, OptionId::new(2))
        .await
        .unwrap();
    let ended = api.end_attempt(Some(&token), attempt.attempt_id).await.unwrap();
    assert_eq!(ended.score.score_percent, "0.00");

    let outcome = api
        .set_active_module(
            Some(&token),
            ActiveModuleRequest {
                course_id: Some(CourseId::new(1)),
                end: true,
                ..open(3)
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome.course_progress, 100);
    assert!(outcome.completed_modules.contains(&ModuleId::new(3)));

    let view = api.module(Some(&token), ModuleId::new(3)).await.unwrap();
    assert_eq!(view.progress.map(|p| p.status), Some(ModuleStatus::Completed));
    assert_eq!(view.score.map(|s| s.score_percent).as_deref(), Some("0.00"));
}
