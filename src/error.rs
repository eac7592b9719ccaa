/// Fallback shown to users when the backend gives no usable message.
pub const GENERIC_MESSAGE: &str = "Something went wrong, please try again";

/// Shown to users when the backend could not be reached at all.
pub const CONNECTION_MESSAGE: &str = "Connection error, please check your network";

/// Shown when the identity provider reports an error on the OAuth landing.
pub const OAUTH_FAILED_MESSAGE: &str = "Google sign-in did not complete, please try again";

/// Shown when a role outside the self-selectable set is submitted.
pub const INVALID_ROLE_MESSAGE: &str = "Please choose a valid role";

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{operation} failed ({status}): {message}")]
    Api {
        operation: &'static str,
        status: u16,
        message: String,
    },
    /// The backend issued a zero-length access token.
    #[error("access token must not be empty")]
    EmptyToken,
    #[error("{0} timed out")]
    Timeout(&'static str),
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Text suitable for an inline form error.
    ///
    /// Backend rejections carry the backend's own message. Connectivity
    /// problems collapse to a generic connection message so raw transport
    /// errors never reach the page.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } if !message.is_empty() => message.clone(),
            Self::Http(_) | Self::Timeout(_) => CONNECTION_MESSAGE.to_owned(),
            _ => GENERIC_MESSAGE.to_owned(),
        }
    }

    /// HTTP status of a backend rejection, if this is one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_surfaces_backend_message() {
        let err = Error::Api {
            operation: "login",
            status: 401,
            message: "Credenciales inválidas".into(),
        };
        assert_eq!(err.user_message(), "Credenciales inválidas");
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn api_error_without_message_is_generic() {
        let err = Error::Api {
            operation: "register",
            status: 500,
            message: String::new(),
        };
        assert_eq!(err.user_message(), GENERIC_MESSAGE);
    }

    #[test]
    fn timeout_reads_as_connection_problem() {
        assert_eq!(Error::Timeout("restore").user_message(), CONNECTION_MESSAGE);
        assert_eq!(Error::Timeout("restore").status(), None);
    }
}
