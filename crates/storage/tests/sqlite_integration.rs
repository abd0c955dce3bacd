use chrono::Duration;
use lms_core::model::{
    AnswerOption, Assessment, AssessmentId, AttemptStatus, ContentType, Course, CourseId,
    LearningPath, LearningPathId, Module, ModuleId, ModuleStatus, OptionId, ProgressTarget,
    Question, QuestionId, UserId, UserModuleProgress, UserProgress,
};
use lms_core::time::fixed_now;
use storage::repository::{
    AnswerChange, AttemptRepository, CatalogRepository, CatalogWriter, ProgressRepository,
    Reselect,
};
use storage::sqlite::SqliteRepository;

const LEARNER: UserId = UserId::new(7);

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

async fn seed_quiz(repo: &SqliteRepository) -> AssessmentId {
    let course = Course::new(CourseId::new(1), "Rust basics").unwrap();
    repo.upsert_course(&course).await.unwrap();

    let quiz = AssessmentId::new(100);
    let module = Module::new(
        ModuleId::new(10),
        course.id(),
        "Quiz",
        1,
        ContentType::Assessment,
        Some(quiz),
    )
    .unwrap();
    repo.upsert_module(&module).await.unwrap();

    let assessment = Assessment::new(quiz, module.id(), "Ownership", 2, 15).unwrap();
    repo.upsert_assessment(&assessment).await.unwrap();

    for q in 1..=3_u64 {
        let question =
            Question::new(QuestionId::new(q), quiz, format!("Question {q}"), None).unwrap();
        repo.upsert_question(&question).await.unwrap();
        for o in 1..=2_u64 {
            let option = AnswerOption::new(
                OptionId::new(q * 10 + o),
                question.id(),
                format!("Option {o}"),
                o == 1,
            )
            .unwrap();
            repo.upsert_option(&option).await.unwrap();
        }
    }
    quiz
}

#[tokio::test]
async fn catalog_reads_back_in_id_order() {
    let repo = connect("memdb_catalog").await;
    let quiz = seed_quiz(&repo).await;

    let assessment = repo.get_assessment(quiz).await.unwrap().unwrap();
    assert_eq!(assessment.number_of_questions(), 2);
    assert_eq!(assessment.duration_minutes(), 15);

    let questions = repo.questions_for_assessment(quiz).await.unwrap();
    assert_eq!(questions.len(), 3);

    let options = repo.options_for_assessment(quiz).await.unwrap();
    let ids: Vec<u64> = options.iter().map(|o| o.id().value()).collect();
    assert_eq!(ids, vec![11, 12, 21, 22, 31, 32]);
    assert!(options[0].is_correct());

    let modules = repo.modules_for_course(CourseId::new(1)).await.unwrap();
    assert_eq!(modules[0].content_type(), ContentType::Assessment);
    assert_eq!(modules[0].assessment_id(), Some(quiz));
}

#[tokio::test]
async fn attempt_snapshot_keeps_insert_order() {
    let repo = connect("memdb_attempt_order").await;
    let quiz = seed_quiz(&repo).await;

    let order = [QuestionId::new(3), QuestionId::new(1)];
    let (attempt, snapshot) = repo
        .create_attempt(LEARNER, quiz, fixed_now(), &order)
        .await
        .unwrap();
    assert_eq!(snapshot.len(), 2);

    let stored = repo.attempt_questions(attempt.id()).await.unwrap();
    let ids: Vec<QuestionId> = stored.iter().map(|r| r.question_id).collect();
    assert_eq!(ids, order);

    let latest = repo.latest_attempt(LEARNER, quiz).await.unwrap().unwrap();
    assert_eq!(latest.id(), attempt.id());
    assert_eq!(latest.status(), AttemptStatus::InProgress);
    assert_eq!(latest.start_time(), fixed_now());
}

#[tokio::test]
async fn completed_status_round_trips() {
    let repo = connect("memdb_attempt_status").await;
    let quiz = seed_quiz(&repo).await;

    let (mut attempt, _) = repo
        .create_attempt(LEARNER, quiz, fixed_now(), &[QuestionId::new(1)])
        .await
        .unwrap();
    attempt.complete(15 * 60, fixed_now() + Duration::minutes(3));
    repo.update_attempt(&attempt).await.unwrap();

    let stored = repo.get_attempt(attempt.id()).await.unwrap().unwrap();
    assert!(stored.is_completed());
    assert_eq!(stored.start_time(), attempt.start_time());
}

#[tokio::test]
async fn failed_snapshot_leaves_no_attempt_behind() {
    let repo = connect("memdb_attempt_rollback").await;
    let quiz = seed_quiz(&repo).await;

    // The second row cannot be stored, after the attempt row was already inserted.
    let result = repo
        .create_attempt(
            LEARNER,
            quiz,
            fixed_now(),
            &[QuestionId::new(1), QuestionId::new(u64::MAX)],
        )
        .await;
    assert!(result.is_err());
    assert!(repo.latest_attempt(LEARNER, quiz).await.unwrap().is_none());

    let (attempt, snapshot) = repo
        .create_attempt(LEARNER, quiz, fixed_now(), &[QuestionId::new(1)])
        .await
        .unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(repo.attempt_questions(attempt.id()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn answer_toggle_and_exclusive_selection() {
    let repo = connect("memdb_answers").await;
    let quiz = seed_quiz(&repo).await;
    let (attempt, snapshot) = repo
        .create_attempt(LEARNER, quiz, fixed_now(), &[QuestionId::new(1)])
        .await
        .unwrap();
    let aq = snapshot[0].id;

    let change = repo
        .toggle_answer(attempt.id(), aq, OptionId::new(11))
        .await
        .unwrap();
    assert_eq!(change, AnswerChange::Selected);
    let change = repo
        .toggle_answer(attempt.id(), aq, OptionId::new(11))
        .await
        .unwrap();
    assert_eq!(change, AnswerChange::Cleared);

    repo.select_exclusive_answer(attempt.id(), aq, OptionId::new(11), Reselect::Keep)
        .await
        .unwrap();
    repo.select_exclusive_answer(attempt.id(), aq, OptionId::new(12), Reselect::Keep)
        .await
        .unwrap();
    let answers = repo.answers_for_attempt(attempt.id()).await.unwrap();
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].option_id, OptionId::new(12));

    let change = repo
        .select_exclusive_answer(attempt.id(), aq, OptionId::new(12), Reselect::Keep)
        .await
        .unwrap();
    assert_eq!(change, AnswerChange::Unchanged);
}

#[tokio::test]
async fn exclusive_reselect_clears_leftover_answers() {
    let repo = connect("memdb_answers_leftover").await;
    let quiz = seed_quiz(&repo).await;
    let (attempt, snapshot) = repo
        .create_attempt(LEARNER, quiz, fixed_now(), &[QuestionId::new(1)])
        .await
        .unwrap();
    let aq = snapshot[0].id;

    repo.toggle_answer(attempt.id(), aq, OptionId::new(11))
        .await
        .unwrap();
    repo.toggle_answer(attempt.id(), aq, OptionId::new(12))
        .await
        .unwrap();

    let change = repo
        .select_exclusive_answer(attempt.id(), aq, OptionId::new(11), Reselect::Clear)
        .await
        .unwrap();
    assert_eq!(change, AnswerChange::Selected);
    let answers = repo.answers_for_attempt(attempt.id()).await.unwrap();
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].option_id, OptionId::new(11));
}

#[tokio::test]
async fn progress_rows_upsert_in_place() {
    let repo = connect("memdb_progress").await;
    seed_quiz(&repo).await;

    let mut record = UserModuleProgress::not_started(LEARNER, ModuleId::new(10), fixed_now());
    repo.upsert_module_progress(&record).await.unwrap();
    record.complete(fixed_now());
    repo.upsert_module_progress(&record).await.unwrap();

    let stored = repo
        .module_progress_for_user(LEARNER, &[ModuleId::new(10), ModuleId::new(99)])
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].status, ModuleStatus::Completed);
    assert!((stored[0].progress - 100.0).abs() < f64::EPSILON);

    let course = ProgressTarget::Course(CourseId::new(1));
    let path = ProgressTarget::LearningPath(LearningPathId::new(1));
    repo.upsert_user_progress(&UserProgress::new(LEARNER, course, 33))
        .await
        .unwrap();
    repo.upsert_user_progress(&UserProgress::new(LEARNER, course, 66))
        .await
        .unwrap();
    repo.upsert_user_progress(&UserProgress::new(LEARNER, path, 50))
        .await
        .unwrap();

    let course_row = repo.get_user_progress(LEARNER, course).await.unwrap().unwrap();
    assert_eq!(course_row.progress, 66);
    let path_row = repo.get_user_progress(LEARNER, path).await.unwrap().unwrap();
    assert_eq!(path_row.progress, 50);
}

#[tokio::test]
async fn learning_path_courses_follow_position() {
    let repo = connect("memdb_paths").await;
    for id in 1..=3_u64 {
        let course = Course::new(CourseId::new(id), format!("Course {id}")).unwrap();
        repo.upsert_course(&course).await.unwrap();
    }
    let path = LearningPath::new(LearningPathId::new(5), "Backend").unwrap();
    let order = [CourseId::new(3), CourseId::new(1), CourseId::new(2)];
    repo.upsert_learning_path(&path, &order).await.unwrap();

    assert_eq!(repo.courses_in_path(path.id()).await.unwrap(), order);

    repo.upsert_learning_path(&path, &order[..1]).await.unwrap();
    assert_eq!(
        repo.courses_in_path(path.id()).await.unwrap(),
        vec![CourseId::new(3)]
    );
}
