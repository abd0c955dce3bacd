use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lms_core::model::{
    AnswerOption, Assessment, AssessmentAttempt, AssessmentId, AttemptId, AttemptQuestion,
    AttemptQuestionId, Course, CourseId, LearningPath, LearningPathId, Module, ModuleId, OptionId,
    ProgressTarget, Question, QuestionId, UserAnswer, UserAnswerId, UserId, UserModuleProgress,
    UserProgress,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Effect of an answer mutation on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerChange {
    Selected,
    Cleared,
    Unchanged,
}

/// What happens when a learner re-selects the option that is already the
/// sole single-choice answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reselect {
    /// The selection stays; a single-choice answer can only be replaced.
    #[default]
    Keep,
    /// The selection is removed, leaving the question unanswered.
    Clear,
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

/// Read-only view of content owned by content management.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn get_assessment(&self, id: AssessmentId) -> Result<Option<Assessment>, StorageError>;

    /// Questions of an assessment, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn questions_for_assessment(
        &self,
        id: AssessmentId,
    ) -> Result<Vec<Question>, StorageError>;

    /// Current options of a question, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn options_for_question(
        &self,
        id: QuestionId,
    ) -> Result<Vec<AnswerOption>, StorageError>;

    /// Options of every question in an assessment, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn options_for_assessment(
        &self,
        id: AssessmentId,
    ) -> Result<Vec<AnswerOption>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn get_option(&self, id: OptionId) -> Result<Option<AnswerOption>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn get_module(&self, id: ModuleId) -> Result<Option<Module>, StorageError>;

    /// Modules of a course, ordered by their `order` field.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn modules_for_course(&self, id: CourseId) -> Result<Vec<Module>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn get_learning_path(
        &self,
        id: LearningPathId,
    ) -> Result<Option<LearningPath>, StorageError>;

    /// Course ids of a learning path in path order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn courses_in_path(&self, id: LearningPathId) -> Result<Vec<CourseId>, StorageError>;
}

/// Write access to the catalog, used for seeding and administration.
#[async_trait]
pub trait CatalogWriter: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the course cannot be stored.
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError>;

    /// Store a path and replace its ordered course list.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the path cannot be stored.
    async fn upsert_learning_path(
        &self,
        path: &LearningPath,
        courses: &[CourseId],
    ) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the module cannot be stored.
    async fn upsert_module(&self, module: &Module) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the assessment cannot be stored.
    async fn upsert_assessment(&self, assessment: &Assessment) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the option cannot be stored.
    async fn upsert_option(&self, option: &AnswerOption) -> Result<(), StorageError>;
}

//
// ─── ATTEMPTS ──────────────────────────────────────────────────────────────────
//

/// Attempts, their question snapshots, and selected answers.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Create an attempt together with one snapshot row per question, in the
    /// given order. Either everything is stored or nothing is.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be stored.
    async fn create_attempt(
        &self,
        user_id: UserId,
        assessment_id: AssessmentId,
        started_at: DateTime<Utc>,
        questions: &[QuestionId],
    ) -> Result<(AssessmentAttempt, Vec<AttemptQuestion>), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn get_attempt(&self, id: AttemptId) -> Result<Option<AssessmentAttempt>, StorageError>;

    /// Most recently created attempt of a learner on an assessment.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn latest_attempt(
        &self,
        user_id: UserId,
        assessment_id: AssessmentId,
    ) -> Result<Option<AssessmentAttempt>, StorageError>;

    /// Persist status and start time changes.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the attempt does not exist.
    async fn update_attempt(&self, attempt: &AssessmentAttempt) -> Result<(), StorageError>;

    /// Snapshot rows in creation order, which is the presentation order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn attempt_questions(
        &self,
        attempt_id: AttemptId,
    ) -> Result<Vec<AttemptQuestion>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn answers_for_attempt(
        &self,
        attempt_id: AttemptId,
    ) -> Result<Vec<UserAnswer>, StorageError>;

    /// Atomically select the option if absent, otherwise remove it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn toggle_answer(
        &self,
        attempt_id: AttemptId,
        attempt_question_id: AttemptQuestionId,
        option_id: OptionId,
    ) -> Result<AnswerChange, StorageError>;

    /// Atomically make `option_id` the only selection for the question.
    ///
    /// Selections of other options are removed even when `option_id` is already
    /// selected, so a question left with several answers ends with exactly one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn select_exclusive_answer(
        &self,
        attempt_id: AttemptId,
        attempt_question_id: AttemptQuestionId,
        option_id: OptionId,
        reselect: Reselect,
    ) -> Result<AnswerChange, StorageError>;
}

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn get_module_progress(
        &self,
        user_id: UserId,
        module_id: ModuleId,
    ) -> Result<Option<UserModuleProgress>, StorageError>;

    /// Create or replace the record for (user, module).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn upsert_module_progress(
        &self,
        progress: &UserModuleProgress,
    ) -> Result<(), StorageError>;

    /// Existing records for the given modules; modules without a record are omitted.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn module_progress_for_user(
        &self,
        user_id: UserId,
        modules: &[ModuleId],
    ) -> Result<Vec<UserModuleProgress>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn get_user_progress(
        &self,
        user_id: UserId,
        target: ProgressTarget,
    ) -> Result<Option<UserProgress>, StorageError>;

    /// Create the row if absent, else update it in place.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be stored.
    async fn upsert_user_progress(&self, progress: &UserProgress) -> Result<(), StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct MemoryState {
    assessments: HashMap<AssessmentId, Assessment>,
    questions: BTreeMap<QuestionId, Question>,
    options: BTreeMap<OptionId, AnswerOption>,
    modules: BTreeMap<ModuleId, Module>,
    courses: HashMap<CourseId, Course>,
    paths: HashMap<LearningPathId, (LearningPath, Vec<CourseId>)>,
    attempts: BTreeMap<AttemptId, AssessmentAttempt>,
    attempt_questions: BTreeMap<AttemptQuestionId, AttemptQuestion>,
    answers: BTreeMap<UserAnswerId, UserAnswer>,
    module_progress: HashMap<(UserId, ModuleId), UserModuleProgress>,
    user_progress: HashMap<(UserId, ProgressTarget), UserProgress>,
    last_id: u64,
}

impl MemoryState {
    /// Ids are shared across tables and strictly increasing, so id order is creation order.
    fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }

    fn answer_ids_for(
        &self,
        attempt_id: AttemptId,
        attempt_question_id: AttemptQuestionId,
    ) -> Vec<(UserAnswerId, OptionId)> {
        self.answers
            .values()
            .filter(|a| a.attempt_id == attempt_id && a.attempt_question_id == attempt_question_id)
            .map(|a| (a.id, a.option_id))
            .collect()
    }

    fn insert_answer(
        &mut self,
        attempt_id: AttemptId,
        attempt_question_id: AttemptQuestionId,
        option_id: OptionId,
    ) {
        let id = UserAnswerId::new(self.next_id());
        self.answers.insert(
            id,
            UserAnswer {
                id,
                attempt_id,
                attempt_question_id,
                option_id,
            },
        );
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// All tables sit behind one mutex, so every trait method is atomic.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl CatalogRepository for InMemoryRepository {
    async fn get_assessment(&self, id: AssessmentId) -> Result<Option<Assessment>, StorageError> {
        Ok(self.state()?.assessments.get(&id).cloned())
    }

    async fn questions_for_assessment(
        &self,
        id: AssessmentId,
    ) -> Result<Vec<Question>, StorageError> {
        let guard = self.state()?;
        Ok(guard
            .questions
            .values()
            .filter(|q| q.assessment_id() == id)
            .cloned()
            .collect())
    }

    async fn options_for_question(
        &self,
        id: QuestionId,
    ) -> Result<Vec<AnswerOption>, StorageError> {
        let guard = self.state()?;
        Ok(guard
            .options
            .values()
            .filter(|o| o.question_id() == id)
            .cloned()
            .collect())
    }

    async fn options_for_assessment(
        &self,
        id: AssessmentId,
    ) -> Result<Vec<AnswerOption>, StorageError> {
        let guard = self.state()?;
        Ok(guard
            .options
            .values()
            .filter(|o| {
                guard
                    .questions
                    .get(&o.question_id())
                    .is_some_and(|q| q.assessment_id() == id)
            })
            .cloned()
            .collect())
    }

    async fn get_option(&self, id: OptionId) -> Result<Option<AnswerOption>, StorageError> {
        Ok(self.state()?.options.get(&id).cloned())
    }

    async fn get_module(&self, id: ModuleId) -> Result<Option<Module>, StorageError> {
        Ok(self.state()?.modules.get(&id).cloned())
    }

    async fn modules_for_course(&self, id: CourseId) -> Result<Vec<Module>, StorageError> {
        let guard = self.state()?;
        let mut modules: Vec<Module> = guard
            .modules
            .values()
            .filter(|m| m.course_id() == id)
            .cloned()
            .collect();
        modules.sort_by_key(|m| (m.order(), m.id()));
        Ok(modules)
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        Ok(self.state()?.courses.get(&id).cloned())
    }

    async fn get_learning_path(
        &self,
        id: LearningPathId,
    ) -> Result<Option<LearningPath>, StorageError> {
        Ok(self.state()?.paths.get(&id).map(|(path, _)| path.clone()))
    }

    async fn courses_in_path(&self, id: LearningPathId) -> Result<Vec<CourseId>, StorageError> {
        Ok(self
            .state()?
            .paths
            .get(&id)
            .map(|(_, courses)| courses.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl CatalogWriter for InMemoryRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        self.state()?.courses.insert(course.id(), course.clone());
        Ok(())
    }

    async fn upsert_learning_path(
        &self,
        path: &LearningPath,
        courses: &[CourseId],
    ) -> Result<(), StorageError> {
        self.state()?
            .paths
            .insert(path.id(), (path.clone(), courses.to_vec()));
        Ok(())
    }

    async fn upsert_module(&self, module: &Module) -> Result<(), StorageError> {
        self.state()?.modules.insert(module.id(), module.clone());
        Ok(())
    }

    async fn upsert_assessment(&self, assessment: &Assessment) -> Result<(), StorageError> {
        self.state()?
            .assessments
            .insert(assessment.id(), assessment.clone());
        Ok(())
    }

    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        self.state()?
            .questions
            .insert(question.id(), question.clone());
        Ok(())
    }

    async fn upsert_option(&self, option: &AnswerOption) -> Result<(), StorageError> {
        self.state()?.options.insert(option.id(), option.clone());
        Ok(())
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn create_attempt(
        &self,
        user_id: UserId,
        assessment_id: AssessmentId,
        started_at: DateTime<Utc>,
        questions: &[QuestionId],
    ) -> Result<(AssessmentAttempt, Vec<AttemptQuestion>), StorageError> {
        let mut guard = self.state()?;
        let attempt_id = AttemptId::new(guard.next_id());
        let attempt = AssessmentAttempt::start(attempt_id, user_id, assessment_id, started_at);

        let mut snapshot = Vec::with_capacity(questions.len());
        for question_id in questions {
            let row = AttemptQuestion {
                id: AttemptQuestionId::new(guard.next_id()),
                attempt_id,
                question_id: *question_id,
            };
            snapshot.push(row);
        }

        guard.attempts.insert(attempt_id, attempt.clone());
        for row in &snapshot {
            guard.attempt_questions.insert(row.id, *row);
        }
        Ok((attempt, snapshot))
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<Option<AssessmentAttempt>, StorageError> {
        Ok(self.state()?.attempts.get(&id).cloned())
    }

    async fn latest_attempt(
        &self,
        user_id: UserId,
        assessment_id: AssessmentId,
    ) -> Result<Option<AssessmentAttempt>, StorageError> {
        let guard = self.state()?;
        Ok(guard
            .attempts
            .values()
            .rev()
            .find(|a| a.user_id() == user_id && a.assessment_id() == assessment_id)
            .cloned())
    }

    async fn update_attempt(&self, attempt: &AssessmentAttempt) -> Result<(), StorageError> {
        let mut guard = self.state()?;
        let slot = guard
            .attempts
            .get_mut(&attempt.id())
            .ok_or(StorageError::NotFound)?;
        *slot = attempt.clone();
        Ok(())
    }

    async fn attempt_questions(
        &self,
        attempt_id: AttemptId,
    ) -> Result<Vec<AttemptQuestion>, StorageError> {
        let guard = self.state()?;
        Ok(guard
            .attempt_questions
            .values()
            .filter(|q| q.attempt_id == attempt_id)
            .copied()
            .collect())
    }

    async fn answers_for_attempt(
        &self,
        attempt_id: AttemptId,
    ) -> Result<Vec<UserAnswer>, StorageError> {
        let guard = self.state()?;
        Ok(guard
            .answers
            .values()
            .filter(|a| a.attempt_id == attempt_id)
            .copied()
            .collect())
    }

    async fn toggle_answer(
        &self,
        attempt_id: AttemptId,
        attempt_question_id: AttemptQuestionId,
        option_id: OptionId,
    ) -> Result<AnswerChange, StorageError> {
        let mut guard = self.state()?;
        let matching: Vec<UserAnswerId> = guard
            .answer_ids_for(attempt_id, attempt_question_id)
            .into_iter()
            .filter(|(_, option)| *option == option_id)
            .map(|(id, _)| id)
            .collect();

        if matching.is_empty() {
            guard.insert_answer(attempt_id, attempt_question_id, option_id);
            return Ok(AnswerChange::Selected);
        }
        for id in matching {
            guard.answers.remove(&id);
        }
        Ok(AnswerChange::Cleared)
    }

    async fn select_exclusive_answer(
        &self,
        attempt_id: AttemptId,
        attempt_question_id: AttemptQuestionId,
        option_id: OptionId,
        reselect: Reselect,
    ) -> Result<AnswerChange, StorageError> {
        let mut guard = self.state()?;
        let existing = guard.answer_ids_for(attempt_id, attempt_question_id);
        let already_selected = existing.iter().any(|(_, option)| *option == option_id);
        let others: Vec<UserAnswerId> = existing
            .iter()
            .filter(|(_, option)| *option != option_id)
            .map(|(id, _)| *id)
            .collect();

        if already_selected && others.is_empty() && reselect == Reselect::Clear {
            for (id, _) in existing {
                guard.answers.remove(&id);
            }
            return Ok(AnswerChange::Cleared);
        }

        let mut change = AnswerChange::Unchanged;
        if !already_selected {
            guard.insert_answer(attempt_id, attempt_question_id, option_id);
            change = AnswerChange::Selected;
        }
        for id in others {
            guard.answers.remove(&id);
            change = AnswerChange::Selected;
        }
        Ok(change)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_module_progress(
        &self,
        user_id: UserId,
        module_id: ModuleId,
    ) -> Result<Option<UserModuleProgress>, StorageError> {
        Ok(self
            .state()?
            .module_progress
            .get(&(user_id, module_id))
            .cloned())
    }

    async fn upsert_module_progress(
        &self,
        progress: &UserModuleProgress,
    ) -> Result<(), StorageError> {
        self.state()?
            .module_progress
            .insert((progress.user_id, progress.module_id), progress.clone());
        Ok(())
    }

    async fn module_progress_for_user(
        &self,
        user_id: UserId,
        modules: &[ModuleId],
    ) -> Result<Vec<UserModuleProgress>, StorageError> {
        let guard = self.state()?;
        Ok(modules
            .iter()
            .filter_map(|m| guard.module_progress.get(&(user_id, *m)).cloned())
            .collect())
    }

    async fn get_user_progress(
        &self,
        user_id: UserId,
        target: ProgressTarget,
    ) -> Result<Option<UserProgress>, StorageError> {
        Ok(self.state()?.user_progress.get(&(user_id, target)).copied())
    }

    async fn upsert_user_progress(&self, progress: &UserProgress) -> Result<(), StorageError> {
        self.state()?
            .user_progress
            .insert((progress.user_id, progress.target), *progress);
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub catalog: Arc<dyn CatalogRepository>,
    pub catalog_writer: Arc<dyn CatalogWriter>,
    pub attempts: Arc<dyn AttemptRepository>,
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            catalog: Arc::new(repo.clone()),
            catalog_writer: Arc::new(repo.clone()),
            attempts: Arc::new(repo.clone()),
            progress: Arc::new(repo),
        }
    }
}
