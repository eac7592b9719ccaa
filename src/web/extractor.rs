use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::error::AuthError;
use crate::types::{Session, User};

/// Session recovered for the current request.
///
/// Inserted by the session provider that [`session_router`](super::session_router)
/// wraps around page routes. Extracting it anywhere else fails with
/// [`AuthError::OutsideSessionScope`].
///
/// # Example
///
/// ```rust,ignore
/// async fn header(session: CurrentSession) -> impl IntoResponse {
///     match session.user() {
///         Some(u) => format!("Hola, {}", u.full_name),
///         None => "Ingresar".to_string(),
///     }
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct CurrentSession(pub Option<Session>);

impl CurrentSession {
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref().map(|s| &s.user)
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.0.as_ref().map(|s| s.access_token.as_str())
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentSession {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentSession>()
            .cloned()
            .ok_or(AuthError::OutsideSessionScope)
    }
}

/// Like [`CurrentSession`] but rejects with `401 Unauthorized` when no
/// session was recovered.
#[derive(Debug, Clone)]
pub struct RequireSession(pub Session);

impl<S: Send + Sync> FromRequestParts<S> for RequireSession {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        CurrentSession::from_request_parts(parts, state)
            .await?
            .0
            .map(Self)
            .ok_or(AuthError::Unauthenticated)
    }
}
