use chrono::Duration;

use lms_core::model::{
    AnswerOption, Assessment, AssessmentId, ContentType, Course, CourseId, Module, ModuleId,
    OptionId, Question, QuestionId, UserId,
};
use lms_core::time::fixed_clock;
use services::{
    ApiError, AppServices, AttemptError, AttemptView, ErrorKind, ModuleProgressRequest,
    PolicyConfig, QuestionSampler,
};
use storage::repository::Storage;

const LEARNER: UserId = UserId::new(10);
const QUIZ: AssessmentId = AssessmentId::new(1);
const REVIEW: ModuleId = ModuleId::new(1);
const QUIZ_MODULE: ModuleId = ModuleId::new(2);

/// Q1: single answer (O1 correct). Q2: multi answer (O3, O4 correct).
/// Q3 has no correct option and never enters an attempt.
async fn seed(storage: &Storage) {
    let w = storage.catalog_writer.as_ref();
    w.upsert_course(&Course::new(CourseId::new(1), "Course").unwrap())
        .await
        .unwrap();
    w.upsert_module(
        &Module::new(REVIEW, CourseId::new(1), "Review", 1, ContentType::Text, None).unwrap(),
    )
    .await
    .unwrap();
    w.upsert_module(
        &Module::new(
            QUIZ_MODULE,
            CourseId::new(1),
            "Quiz",
            2,
            ContentType::Assessment,
            Some(QUIZ),
        )
        .unwrap(),
    )
    .await
    .unwrap();
    w.upsert_assessment(&Assessment::new(QUIZ, QUIZ_MODULE, "Quiz", 2, 30).unwrap())
        .await
        .unwrap();

    let questions: [(u64, Option<ModuleId>, &[(u64, bool)]); 3] = [
        (1, None, &[(1, true), (2, false)]),
        (2, Some(REVIEW), &[(3, true), (4, true), (5, false)]),
        (3, None, &[(6, false), (7, false)]),
    ];
    for (id, remedial, options) in questions {
        let qid = QuestionId::new(id);
        w.upsert_question(&Question::new(qid, QUIZ, "Question", remedial).unwrap())
            .await
            .unwrap();
        for &(oid, correct) in options {
            w.upsert_option(&AnswerOption::new(OptionId::new(oid), qid, "Option", correct).unwrap())
                .await
                .unwrap();
        }
    }
}

async fn app() -> AppServices {
    let storage = Storage::in_memory();
    seed(&storage).await;
    AppServices::with_sampler(
        storage,
        fixed_clock(),
        &PolicyConfig::default(),
        QuestionSampler::seeded(7),
    )
}

fn bearer(services: &AppServices) -> String {
    let token = services.auth().issue(LEARNER, "learner@example.com").unwrap();
    format!("Bearer {token}")
}

#[tokio::test]
async fn half_correct_attempt_scores_fifty_with_remedial_module() {
    let services = app().await;
    let token = bearer(&services);
    let api = services.api();

    let attempt = api.start_attempt(Some(&token), QUIZ).await.unwrap();
    let mut drawn: Vec<u64> = attempt.questions.iter().map(|q| q.question_id.value()).collect();
    drawn.sort_unstable();
    assert_eq!(drawn, vec![1, 2]);
    assert_eq!(attempt.duration, 30);

    for option in [1, 3] {
        api.set_answer(Some(&token), attempt.attempt_id, OptionId::new(option))
            .await
            .unwrap();
    }
    let ended = api.end_attempt(Some(&token), attempt.attempt_id).await.unwrap();

    assert_eq!(ended.score.total_questions, 2);
    assert_eq!(ended.score.correct_answers, 1);
    assert_eq!(ended.score.score_percent, "50.00");
    let recommended: Vec<ModuleId> = ended.score.recommendations.iter().map(Module::id).collect();
    assert_eq!(recommended, vec![REVIEW]);

    let json = serde_json::to_value(&ended).unwrap();
    assert_eq!(json["score"]["scorePercent"], "50.00");
    assert!(json["score"]["Recommendations"].is_array());
}

#[tokio::test]
async fn resume_returns_questions_in_start_order_with_selection() {
    let services = app().await;
    let token = bearer(&services);
    let api = services.api();

    let started = api.start_attempt(Some(&token), QUIZ).await.unwrap();
    api.set_answer(Some(&token), started.attempt_id, OptionId::new(2))
        .await
        .unwrap();
    let resumed = api.resume_attempt(Some(&token), started.attempt_id).await.unwrap();

    let order = |v: &AttemptView| -> Vec<QuestionId> {
        v.questions.iter().map(|q| q.question_id).collect()
    };
    assert_eq!(order(&started), order(&resumed));
    assert!(started.questions.iter().all(|q| q.options.iter().all(|o| o.selected.is_none())));

    let q1 = resumed
        .questions
        .iter()
        .find(|q| q.question_id == QuestionId::new(1))
        .unwrap();
    let picked: Vec<u64> = q1
        .options
        .iter()
        .filter(|o| o.selected == Some(true))
        .map(|o| o.id.value())
        .collect();
    assert_eq!(picked, vec![2]);
    assert!(!q1.is_multiple);
}

#[tokio::test]
async fn check_reports_time_until_the_deadline() {
    let services = app().await;
    let token = bearer(&services);
    let api = services.api();

    let none = api.check_attempt(Some(&token), QUIZ).await.unwrap();
    assert!(!none.exists);

    let started = api.start_attempt(Some(&token), QUIZ).await.unwrap();
    let fresh = api.check_attempt(Some(&token), QUIZ).await.unwrap();
    assert!(fresh.exists);
    assert!(fresh.has_time_left);
    assert_eq!(fresh.attempt_id, Some(started.attempt_id));
    assert_eq!(fresh.time_remaining, 30 * 60);

    // Same storage, clock moved past the 30 minute window.
    let later = AppServices::from_storage(
        services.storage().clone(),
        fixed_clock().advanced(Duration::minutes(31)),
        &PolicyConfig::default(),
    );
    let check = later.attempts().check(LEARNER, QUIZ).await.unwrap();
    assert!(!check.has_time_left);
    assert_eq!(check.time_used, 30 * 60);
    assert_eq!(check.time_remaining, 0);
}

#[tokio::test]
async fn other_learners_cannot_touch_an_attempt() {
    let services = app().await;
    let owner = bearer(&services);
    let api = services.api();
    let started = api.start_attempt(Some(&owner), QUIZ).await.unwrap();

    let intruder = services.auth().issue(UserId::new(99), "x@example.com").unwrap();
    let err = api
        .set_answer(Some(&intruder), started.attempt_id, OptionId::new(1))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Attempt(AttemptError::NotOwner(_))));
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = api.end_attempt(Some(&intruder), started.attempt_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn unauthenticated_calls_are_rejected_before_any_work() {
    let services = app().await;
    let api = services.api();

    let err = api.start_attempt(None, QUIZ).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    let err = api.start_attempt(Some("Bearer nope"), QUIZ).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);

    let check = services.attempts().check(LEARNER, QUIZ).await.unwrap();
    assert!(!check.exists);
}

#[tokio::test]
async fn unknown_assessment_is_not_found() {
    let services = app().await;
    let token = bearer(&services);
    let err = services
        .api()
        .start_attempt(Some(&token), AssessmentId::new(404))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.public_message(), err.to_string());
}

#[tokio::test]
async fn module_progress_body_is_validated() {
    let services = app().await;
    let token = bearer(&services);
    let api = services.api();

    let empty = ModuleProgressRequest {
        module_id: REVIEW,
        status: None,
        progress: None,
        last_second: None,
    };
    let err = api.module_progress(Some(&token), empty).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let bad_status: ModuleProgressRequest =
        serde_json::from_str(r#"{"moduleId": 1, "status": "done"}"#).unwrap();
    let err = api.module_progress(Some(&token), bad_status).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let ping: ModuleProgressRequest =
        serde_json::from_str(r#"{"moduleId": 1, "progress": 40, "lastSecond": 12.5}"#).unwrap();
    let saved = api.module_progress(Some(&token), ping).await.unwrap();
    assert_eq!(saved.record.progress, 40.0);
    assert_eq!(saved.record.last_second, Some(12.5));
}
