//! Runtime configuration: database location and business-rule policy.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DB_URL_ENV: &str = "LMS_DB_URL";
pub const CONFIG_PATH_ENV: &str = "LMS_CONFIG";

/// Switches for behaviors that change grading or progress outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Refuse answer changes once an attempt is completed.
    pub reject_answers_after_end: bool,
    /// Re-selecting the sole single-choice answer clears it instead of keeping it.
    pub allow_single_choice_clear: bool,
    /// Entering a course in a path marks the previous course in the path 100% complete.
    pub auto_complete_previous_course: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            reject_answers_after_end: true,
            allow_single_choice_clear: false,
            auto_complete_previous_course: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LmsConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default)]
    pub policy: PolicyConfig,
}

fn default_database_url() -> String {
    "sqlite://lms.sqlite3".to_string()
}

impl Default for LmsConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            policy: PolicyConfig::default(),
        }
    }
}

impl LmsConfig {
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed TOML.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Load from `path`, or from `LMS_CONFIG` when no path is given, then
    /// apply environment overrides. Without any file the defaults are used.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let from_env = std::env::var(CONFIG_PATH_ENV).ok();
        let path = path.or_else(|| from_env.as_deref().map(Path::new));

        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })?;
                Self::from_toml_str(&content)?
            }
            None => Self::default(),
        };

        if let Ok(url) = std::env::var(DB_URL_ENV) {
            if !url.trim().is_empty() {
                config.database_url = url;
            }
        }
        Ok(config)
    }
}
