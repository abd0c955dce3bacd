use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use lms_core::Clock;
use lms_core::model::{
    ContentType, CourseId, LearningPathId, Module, ModuleId, ModuleProgressUpdate, ModuleStatus,
    ProgressTarget, UserId, UserModuleProgress, UserProgress, course_progress_percent,
    path_progress_percent, preceding_module,
};
use storage::repository::{AttemptRepository, CatalogRepository, ProgressRepository};

use super::view::{CourseOverview, ModuleProgressEntry, ModuleView};
use crate::attempts::ScoringService;
use crate::config::PolicyConfig;
use crate::error::ProgressError;

/// Navigation event: the learner opens `module_id`, optionally inside a course
/// and learning path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveModuleRequest {
    #[serde(default)]
    pub course_id: Option<CourseId>,
    #[serde(default)]
    pub learning_path_id: Option<LearningPathId>,
    pub module_id: ModuleId,
    /// The learner finished the last module of the course.
    #[serde(default)]
    pub end: bool,
}

/// What a navigation event changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveModuleOutcome {
    pub ok: bool,
    pub course_progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_progress: Option<u8>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub completed_modules: Vec<ModuleId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_completed_course: Option<CourseId>,
}

/// Propagates completion from modules to courses to learning paths.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
    progress: Arc<dyn ProgressRepository>,
    attempts: Arc<dyn AttemptRepository>,
    scoring: ScoringService,
    auto_complete_previous_course: bool,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<dyn CatalogRepository>,
        progress: Arc<dyn ProgressRepository>,
        attempts: Arc<dyn AttemptRepository>,
    ) -> Self {
        let scoring = ScoringService::new(Arc::clone(&catalog), Arc::clone(&attempts));
        Self {
            clock,
            catalog,
            progress,
            attempts,
            scoring,
            auto_complete_previous_course: PolicyConfig::default().auto_complete_previous_course,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: &PolicyConfig) -> Self {
        self.auto_complete_previous_course = policy.auto_complete_previous_course;
        self
    }

    /// Write a status, percentage, or resume cursor for a module.
    ///
    /// The record is created on first write. Status never moves backwards.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::ModuleNotFound` for an unknown module and
    /// `ProgressError::Invalid` for out-of-range values.
    pub async fn record_module_progress(
        &self,
        user_id: UserId,
        module_id: ModuleId,
        update: ModuleProgressUpdate,
    ) -> Result<UserModuleProgress, ProgressError> {
        self.require_module(module_id).await?;
        let now = self.clock.now();
        let mut record = self
            .progress
            .get_module_progress(user_id, module_id)
            .await?
            .unwrap_or_else(|| UserModuleProgress::not_started(user_id, module_id, now));
        record.apply(update, now)?;
        self.progress.upsert_module_progress(&record).await?;
        debug!(
            user_id = %user_id,
            module_id = %module_id,
            status = record.status.as_str(),
            progress = record.progress,
            "module progress recorded"
        );
        Ok(record)
    }

    /// First entry into a module.
    ///
    /// Untimed content is marked in progress right away. Timed content waits
    /// for playback pings, so nothing is written for it here.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::ModuleNotFound` for an unknown module.
    pub async fn enter_module(
        &self,
        user_id: UserId,
        module_id: ModuleId,
    ) -> Result<UserModuleProgress, ProgressError> {
        let module = self.require_module(module_id).await?;
        self.touch_module(user_id, &module).await
    }

    /// Move the learner to a module and cascade course and path progress.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if the module, course, or path is unknown, or
    /// if the module or course is not part of the given course or path.
    pub async fn set_active_module(
        &self,
        user_id: UserId,
        request: ActiveModuleRequest,
    ) -> Result<ActiveModuleOutcome, ProgressError> {
        let module = self.require_module(request.module_id).await?;
        let course_id = request.course_id.unwrap_or(module.course_id());
        if course_id != module.course_id() {
            return Err(ProgressError::ModuleNotInCourse {
                module: module.id(),
                course: course_id,
            });
        }
        if self.catalog.get_course(course_id).await?.is_none() {
            return Err(ProgressError::CourseNotFound(course_id));
        }
        let modules = self.catalog.modules_for_course(course_id).await?;

        // Validate the path before any write.
        let path_position = match request.learning_path_id {
            Some(path_id) => {
                if self.catalog.get_learning_path(path_id).await?.is_none() {
                    return Err(ProgressError::LearningPathNotFound(path_id));
                }
                let courses = self.catalog.courses_in_path(path_id).await?;
                let index = courses.iter().position(|c| *c == course_id).ok_or(
                    ProgressError::CourseNotInPath {
                        course: course_id,
                        path: path_id,
                    },
                )?;
                Some((path_id, courses, index))
            }
            None => None,
        };

        let mut completed_modules = Vec::new();
        if let Some(previous) = preceding_module(&modules, module.order()) {
            self.complete_module(user_id, previous.id()).await?;
            completed_modules.push(previous.id());
        }
        if request.end {
            self.complete_module(user_id, module.id()).await?;
            completed_modules.push(module.id());
        } else {
            self.touch_module(user_id, &module).await?;
        }

        let course_progress = course_progress_percent(module.order(), modules.len(), request.end);
        self.write_progress(user_id, ProgressTarget::Course(course_id), course_progress)
            .await?;

        let mut path_progress = None;
        let mut auto_completed_course = None;
        if let Some((path_id, courses, index)) = path_position {
            let percent = path_progress_percent(index, courses.len());
            self.write_progress(user_id, ProgressTarget::LearningPath(path_id), percent)
                .await?;
            path_progress = Some(percent);

            if self.auto_complete_previous_course && index > 0 {
                let previous = courses[index - 1];
                self.write_progress(user_id, ProgressTarget::Course(previous), 100)
                    .await?;
                info!(
                    user_id = %user_id,
                    learning_path_id = %path_id,
                    course_id = %previous,
                    "previous course in path auto-completed"
                );
                auto_completed_course = Some(previous);
            }
        }

        info!(
            user_id = %user_id,
            module_id = %module.id(),
            course_id = %course_id,
            course_progress,
            end = request.end,
            "active module set"
        );
        Ok(ActiveModuleOutcome {
            ok: true,
            course_progress,
            path_progress,
            completed_modules,
            auto_completed_course,
        })
    }

    /// A module with the learner's record and, for assessment modules, the
    /// score of their latest attempt.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::ModuleNotFound` for an unknown module.
    pub async fn module_view(
        &self,
        user_id: UserId,
        module_id: ModuleId,
    ) -> Result<ModuleView, ProgressError> {
        let module = self.require_module(module_id).await?;
        let progress = self.progress.get_module_progress(user_id, module_id).await?;

        let score = match (module.content_type(), module.assessment_id()) {
            (ContentType::Assessment, Some(assessment_id)) => {
                match self.attempts.latest_attempt(user_id, assessment_id).await? {
                    Some(attempt) => Some(self.scoring.score(attempt.id()).await?),
                    None => None,
                }
            }
            _ => None,
        };

        Ok(ModuleView {
            module,
            progress,
            score,
        })
    }

    /// # Errors
    ///
    /// Returns `ProgressError::CourseNotFound` for an unknown course.
    pub async fn course_overview(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<CourseOverview, ProgressError> {
        let course = self
            .catalog
            .get_course(course_id)
            .await?
            .ok_or(ProgressError::CourseNotFound(course_id))?;
        let modules = self.catalog.modules_for_course(course_id).await?;
        let ids: Vec<ModuleId> = modules.iter().map(Module::id).collect();
        let records: HashMap<ModuleId, UserModuleProgress> = self
            .progress
            .module_progress_for_user(user_id, &ids)
            .await?
            .into_iter()
            .map(|r| (r.module_id, r))
            .collect();
        let progress = self
            .progress
            .get_user_progress(user_id, ProgressTarget::Course(course_id))
            .await?
            .map_or(0, |p| p.progress);

        let modules = modules
            .into_iter()
            .map(|module| {
                let (status, pct) = records
                    .get(&module.id())
                    .map_or((ModuleStatus::NotStarted, 0.0), |r| (r.status, r.progress));
                ModuleProgressEntry {
                    module,
                    status,
                    progress: pct,
                }
            })
            .collect();

        Ok(CourseOverview {
            course,
            progress,
            modules,
        })
    }

    async fn require_module(&self, module_id: ModuleId) -> Result<Module, ProgressError> {
        self.catalog
            .get_module(module_id)
            .await?
            .ok_or(ProgressError::ModuleNotFound(module_id))
    }

    async fn touch_module(
        &self,
        user_id: UserId,
        module: &Module,
    ) -> Result<UserModuleProgress, ProgressError> {
        let now = self.clock.now();
        if let Some(mut record) = self.progress.get_module_progress(user_id, module.id()).await? {
            record.apply(ModuleProgressUpdate::default(), now)?;
            self.progress.upsert_module_progress(&record).await?;
            return Ok(record);
        }

        let mut record = UserModuleProgress::not_started(user_id, module.id(), now);
        if module.content_type().is_timed() {
            return Ok(record);
        }
        record.apply(
            ModuleProgressUpdate {
                status: Some(ModuleStatus::InProgress),
                ..ModuleProgressUpdate::default()
            },
            now,
        )?;
        self.progress.upsert_module_progress(&record).await?;
        Ok(record)
    }

    async fn complete_module(
        &self,
        user_id: UserId,
        module_id: ModuleId,
    ) -> Result<(), ProgressError> {
        let now = self.clock.now();
        let mut record = self
            .progress
            .get_module_progress(user_id, module_id)
            .await?
            .unwrap_or_else(|| UserModuleProgress::not_started(user_id, module_id, now));
        record.complete(now);
        self.progress.upsert_module_progress(&record).await?;
        Ok(())
    }

    async fn write_progress(
        &self,
        user_id: UserId,
        target: ProgressTarget,
        percent: u8,
    ) -> Result<(), ProgressError> {
        self.progress
            .upsert_user_progress(&UserProgress::new(user_id, target, percent))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lms_core::model::{Course, LearningPath};
    use lms_core::time::fixed_clock;
    use storage::repository::{CatalogWriter, InMemoryRepository};

    const LEARNER: UserId = UserId::new(1);

    async fn course_with_modules(repo: &InMemoryRepository, course: u64, kinds: &[ContentType]) {
        repo.upsert_course(&Course::new(CourseId::new(course), "Course").unwrap())
            .await
            .unwrap();
        for (index, kind) in kinds.iter().enumerate() {
            let order = u32::try_from(index + 1).unwrap();
            let id = course * 10 + u64::from(order);
            let assessment = (*kind == ContentType::Assessment)
                .then(|| lms_core::model::AssessmentId::new(id));
            repo.upsert_module(
                &Module::new(
                    ModuleId::new(id),
                    CourseId::new(course),
                    "Module",
                    order,
                    *kind,
                    assessment,
                )
                .unwrap(),
            )
            .await
            .unwrap();
        }
    }

    fn service(repo: &InMemoryRepository) -> ProgressService {
        ProgressService::new(
            fixed_clock(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
    }

    fn go_to(module: u64) -> ActiveModuleRequest {
        ActiveModuleRequest {
            course_id: None,
            learning_path_id: None,
            module_id: ModuleId::new(module),
            end: false,
        }
    }

    #[tokio::test]
    async fn entering_text_marks_in_progress_but_video_waits() {
        let repo = InMemoryRepository::new();
        course_with_modules(&repo, 1, &[ContentType::Text, ContentType::Video]).await;
        let svc = service(&repo);

        let text = svc.enter_module(LEARNER, ModuleId::new(11)).await.unwrap();
        assert_eq!(text.status, ModuleStatus::InProgress);

        let video = svc.enter_module(LEARNER, ModuleId::new(12)).await.unwrap();
        assert_eq!(video.status, ModuleStatus::NotStarted);
        assert!(
            repo.get_module_progress(LEARNER, ModuleId::new(12))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn status_never_regresses() {
        let repo = InMemoryRepository::new();
        course_with_modules(&repo, 1, &[ContentType::Video]).await;
        let svc = service(&repo);
        let module = ModuleId::new(11);

        let ping = svc
            .record_module_progress(
                LEARNER,
                module,
                ModuleProgressUpdate {
                    progress: Some(40.0),
                    last_second: Some(12.5),
                    ..ModuleProgressUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(ping.status, ModuleStatus::InProgress);

        svc.record_module_progress(
            LEARNER,
            module,
            ModuleProgressUpdate {
                status: Some(ModuleStatus::Completed),
                ..ModuleProgressUpdate::default()
            },
        )
        .await
        .unwrap();
        let back = svc
            .record_module_progress(
                LEARNER,
                module,
                ModuleProgressUpdate {
                    status: Some(ModuleStatus::NotStarted),
                    ..ModuleProgressUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(back.status, ModuleStatus::Completed);
        assert!((back.progress - 100.0).abs() < f64::EPSILON);
        assert_eq!(back.last_second, Some(12.5));
    }

    #[tokio::test]
    async fn out_of_range_progress_is_rejected() {
        let repo = InMemoryRepository::new();
        course_with_modules(&repo, 1, &[ContentType::Text]).await;
        let err = service(&repo)
            .record_module_progress(
                LEARNER,
                ModuleId::new(11),
                ModuleProgressUpdate {
                    progress: Some(101.0),
                    ..ModuleProgressUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressError::Invalid(_)));
    }

    #[tokio::test]
    async fn end_of_course_completes_last_module() {
        let repo = InMemoryRepository::new();
        course_with_modules(&repo, 1, &[ContentType::Text, ContentType::Text]).await;
        let outcome = service(&repo)
            .set_active_module(
                LEARNER,
                ActiveModuleRequest {
                    end: true,
                    ..go_to(12)
                },
            )
            .await
            .unwrap();
        assert_eq!(outcome.course_progress, 100);
        assert_eq!(
            outcome.completed_modules,
            vec![ModuleId::new(11), ModuleId::new(12)]
        );
    }

    #[tokio::test]
    async fn module_outside_course_is_rejected() {
        let repo = InMemoryRepository::new();
        course_with_modules(&repo, 1, &[ContentType::Text]).await;
        course_with_modules(&repo, 2, &[ContentType::Text]).await;
        let err = service(&repo)
            .set_active_module(
                LEARNER,
                ActiveModuleRequest {
                    course_id: Some(CourseId::new(2)),
                    ..go_to(11)
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressError::ModuleNotInCourse { .. }));
    }

    #[tokio::test]
    async fn auto_complete_can_be_disabled() {
        let repo = InMemoryRepository::new();
        course_with_modules(&repo, 1, &[ContentType::Text]).await;
        course_with_modules(&repo, 2, &[ContentType::Text]).await;
        let path = LearningPath::new(LearningPathId::new(1), "Path").unwrap();
        repo.upsert_learning_path(&path, &[CourseId::new(1), CourseId::new(2)])
            .await
            .unwrap();

        let policy = PolicyConfig {
            auto_complete_previous_course: false,
            ..PolicyConfig::default()
        };
        let outcome = service(&repo)
            .with_policy(&policy)
            .set_active_module(
                LEARNER,
                ActiveModuleRequest {
                    learning_path_id: Some(path.id()),
                    ..go_to(21)
                },
            )
            .await
            .unwrap();
        assert_eq!(outcome.path_progress, Some(50));
        assert_eq!(outcome.auto_completed_course, None);
        assert!(
            repo.get_user_progress(LEARNER, ProgressTarget::Course(CourseId::new(1)))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn course_overview_defaults_untouched_modules() {
        let repo = InMemoryRepository::new();
        course_with_modules(&repo, 1, &[ContentType::Text, ContentType::Pdf]).await;
        let svc = service(&repo);
        svc.enter_module(LEARNER, ModuleId::new(11)).await.unwrap();

        let overview = svc.course_overview(LEARNER, CourseId::new(1)).await.unwrap();
        assert_eq!(overview.progress, 0);
        assert_eq!(overview.modules[0].status, ModuleStatus::InProgress);
        assert_eq!(overview.modules[1].status, ModuleStatus::NotStarted);
    }
}
