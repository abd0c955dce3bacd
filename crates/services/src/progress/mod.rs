//! Module, course, and learning-path progress.

mod service;
mod view;

pub use service::{ActiveModuleOutcome, ActiveModuleRequest, ProgressService};
pub use view::{CourseOverview, ModuleProgressEntry, ModuleView};
