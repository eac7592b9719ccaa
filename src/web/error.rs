use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors raised by the web session layer.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No session for a handler that requires one.
    #[error("Not authenticated")]
    Unauthenticated,

    /// The current session was read by a handler that is not mounted
    /// behind the session provider. This is a wiring bug, not a runtime
    /// condition.
    #[error("Session read outside the session provider")]
    OutsideSessionScope,

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string()).into_response(),
            Self::OutsideSessionScope | Self::Config(_) => {
                tracing::error!(error = %self, "Auth internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}
