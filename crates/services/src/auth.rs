//! Bearer-credential authentication in front of the core.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use lms_core::model::UserId;
use serde::Serialize;
use uuid::Uuid;

use crate::error::AuthError;

/// Identity yielded by a validated credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub user_id: UserId,
    pub email: String,
}

/// Validates a bearer credential before any call reaches the core.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// # Errors
    ///
    /// Returns `AuthError` if the credential is missing or not recognised.
    async fn authenticate(&self, bearer: Option<&str>) -> Result<Principal, AuthError>;
}

/// In-process token table for local runs and tests.
#[derive(Clone, Default)]
pub struct TokenAuthProvider {
    tokens: Arc<RwLock<HashMap<String, Principal>>>,
}

impl TokenAuthProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh random token for the given learner.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredential` if the token table is unusable.
    pub fn issue(&self, user_id: UserId, email: impl Into<String>) -> Result<String, AuthError> {
        let token = Uuid::new_v4().to_string();
        let principal = Principal {
            user_id,
            email: email.into(),
        };
        self.tokens
            .write()
            .map_err(|_| AuthError::InvalidCredential)?
            .insert(token.clone(), principal);
        Ok(token)
    }

    /// Forget a token; later calls with it are rejected.
    pub fn revoke(&self, token: &str) {
        if let Ok(mut tokens) = self.tokens.write() {
            tokens.remove(token);
        }
    }
}

#[async_trait]
impl AuthProvider for TokenAuthProvider {
    async fn authenticate(&self, bearer: Option<&str>) -> Result<Principal, AuthError> {
        let raw = bearer.ok_or(AuthError::MissingCredential)?;
        let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
        if token.is_empty() {
            return Err(AuthError::MissingCredential);
        }
        self.tokens
            .read()
            .map_err(|_| AuthError::InvalidCredential)?
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidCredential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn issued_token_authenticates_with_or_without_scheme() {
        let auth = TokenAuthProvider::new();
        let token = auth.issue(UserId::new(3), "ada@example.com").unwrap();

        let principal = auth.authenticate(Some(&token)).await.unwrap();
        assert_eq!(principal.user_id, UserId::new(3));

        let header = format!("Bearer {token}");
        let principal = auth.authenticate(Some(&header)).await.unwrap();
        assert_eq!(principal.email, "ada@example.com");
    }

    #[tokio::test]
    async fn missing_and_unknown_tokens_are_rejected() {
        let auth = TokenAuthProvider::new();
        assert!(matches!(
            auth.authenticate(None).await,
            Err(AuthError::MissingCredential)
        ));
        assert!(matches!(
            auth.authenticate(Some("Bearer nope")).await,
            Err(AuthError::InvalidCredential)
        ));
    }

    #[tokio::test]
    async fn revoked_token_is_rejected() {
        let auth = TokenAuthProvider::new();
        let token = auth.issue(UserId::new(1), "x@example.com").unwrap();
        auth.revoke(&token);
        assert!(auth.authenticate(Some(&token)).await.is_err());
    }
}
