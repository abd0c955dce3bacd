#![forbid(unsafe_code)]

pub mod api;
pub mod app_services;
pub mod attempts;
pub mod auth;
pub mod config;
pub mod error;
pub mod progress;

pub use lms_core::Clock;

pub use api::{
    AnswerResponse, EndAttemptResponse, LearningApi, ModuleProgressRequest,
    ModuleProgressResponse,
};
pub use app_services::AppServices;
pub use attempts::{
    AnswerLedger, AttemptCheck, AttemptService, AttemptView, OptionView, QuestionSampler,
    QuestionView, ScoreReport, ScoringService,
};
pub use auth::{AuthProvider, Principal, TokenAuthProvider};
pub use config::{LmsConfig, PolicyConfig};
pub use error::{
    ApiError, AppServicesError, AttemptError, AuthError, ConfigError, ErrorKind, ProgressError,
};
pub use progress::{
    ActiveModuleOutcome, ActiveModuleRequest, CourseOverview, ModuleProgressEntry, ModuleView,
    ProgressService,
};
