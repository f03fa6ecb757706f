//! Admin session extractor.
//!
//! Provides the session loaded by the session middleware to handlers.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use domain::models::{AdminSession, SessionPrincipal};

use crate::error::ApiError;

/// The caller's session, as loaded by `require_session` / `require_admin`.
///
/// Handlers that change it must persist it with `SessionStore::save`.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub AdminSession);

impl CurrentSession {
    pub fn principal(&self) -> Result<&SessionPrincipal, ApiError> {
        self.0
            .auth
            .principal()
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".into()))
    }

    /// Name recorded as the actor on audit fields such as `triggered_by`.
    pub fn actor(&self) -> String {
        self.0
            .auth
            .principal()
            .map(|p| {
                if p.email.is_empty() {
                    p.username.clone()
                } else {
                    p.email.clone()
                }
            })
            .unwrap_or_else(|| "admin".to_string())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AdminSession>()
            .cloned()
            .map(CurrentSession)
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".into()))
    }
}
