use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::api::LearningApi;
use crate::attempts::{AnswerLedger, AttemptService, QuestionSampler};
use crate::auth::TokenAuthProvider;
use crate::config::{LmsConfig, PolicyConfig};
use crate::error::AppServicesError;
use crate::progress::ProgressService;

/// Wires storage, policy, and auth into the learner-facing services.
#[derive(Clone)]
pub struct AppServices {
    storage: Storage,
    auth: TokenAuthProvider,
    attempts: AttemptService,
    ledger: AnswerLedger,
    progress: ProgressService,
    api: Arc<LearningApi>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage at `config.database_url`.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(config: &LmsConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(&config.database_url).await?;
        Ok(Self::from_storage(storage, clock, &config.policy))
    }

    #[must_use]
    pub fn in_memory(clock: Clock, policy: &PolicyConfig) -> Self {
        Self::from_storage(Storage::in_memory(), clock, policy)
    }

    #[must_use]
    pub fn from_storage(storage: Storage, clock: Clock, policy: &PolicyConfig) -> Self {
        Self::with_sampler(storage, clock, policy, QuestionSampler::default())
    }

    /// Same as `from_storage`, with an explicit question sampler.
    #[must_use]
    pub fn with_sampler(
        storage: Storage,
        clock: Clock,
        policy: &PolicyConfig,
        sampler: QuestionSampler,
    ) -> Self {
        let attempts = AttemptService::new(
            clock,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.attempts),
        )
        .with_sampler(sampler);
        let ledger = AnswerLedger::with_policy(
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.attempts),
            policy,
        );
        let progress = ProgressService::new(
            clock,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.progress),
            Arc::clone(&storage.attempts),
        )
        .with_policy(policy);
        let auth = TokenAuthProvider::new();
        let api = Arc::new(LearningApi::new(
            Arc::new(auth.clone()),
            attempts.clone(),
            ledger.clone(),
            progress.clone(),
        ));

        Self {
            storage,
            auth,
            attempts,
            ledger,
            progress,
            api,
        }
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Token table behind the API; issue learner tokens here.
    #[must_use]
    pub fn auth(&self) -> &TokenAuthProvider {
        &self.auth
    }

    #[must_use]
    pub fn attempts(&self) -> &AttemptService {
        &self.attempts
    }

    #[must_use]
    pub fn ledger(&self) -> &AnswerLedger {
        &self.ledger
    }

    #[must_use]
    pub fn progress(&self) -> &ProgressService {
        &self.progress
    }

    #[must_use]
    pub fn api(&self) -> Arc<LearningApi> {
        Arc::clone(&self.api)
    }
}
