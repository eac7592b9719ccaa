use std::sync::Arc;
use std::time::Duration;

use axum_extra::extract::cookie::Key;

use super::cookies::CookieSettings;
use super::error::AuthError;
use crate::api::{ApiClient, ApiConfig};
use crate::backend::AuthBackend;
use crate::gate::{AccessGate, GateRules};
use crate::session::DEFAULT_BACKEND_TIMEOUT;

/// Shared web settings used by both config and runtime state.
#[derive(Clone)]
pub(crate) struct WebSettings {
    pub(crate) cookie_key: Key,
    pub(crate) cookies: CookieSettings,
    pub(crate) auth_path: String,
    pub(crate) role_selection_path: String,
    pub(crate) gate: AccessGate,
    pub(crate) backend_timeout: Duration,
}

impl WebSettings {
    fn defaults() -> Self {
        Self {
            cookie_key: Key::generate(),
            cookies: CookieSettings::default(),
            auth_path: "/api/auth".into(),
            role_selection_path: "/auth/seleccionar-rol".into(),
            gate: AccessGate::default(),
            backend_timeout: DEFAULT_BACKEND_TIMEOUT,
        }
    }

    pub(crate) fn login_path(&self) -> &str {
        self.gate.rules().login_path()
    }

    pub(crate) fn landing_path(&self) -> &str {
        self.gate.rules().landing_path()
    }
}

/// Web session configuration.
///
/// The backend is a constructor parameter; everything else has a default
/// and a `with_*` override.
///
/// Use [`from_env()`](WebConfig::from_env) for convention-based setup,
/// or [`new()`](WebConfig::new) for full control.
pub struct WebConfig<B> {
    pub(super) backend: Arc<B>,
    pub(super) settings: WebSettings,
}

impl<B: AuthBackend> WebConfig<B> {
    #[must_use]
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            settings: WebSettings::defaults(),
        }
    }

    #[must_use]
    pub fn with_cookie_key(mut self, key: Key) -> Self {
        self.settings.cookie_key = key;
        self
    }

    #[must_use]
    pub fn with_token_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.cookies.token_name = name.into();
        self
    }

    #[must_use]
    pub fn with_user_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.cookies.user_name = name.into();
        self
    }

    #[must_use]
    pub fn with_session_ttl_days(mut self, days: i64) -> Self {
        self.settings.cookies.ttl_days = days;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.settings.cookies.secure = secure;
        self
    }

    #[must_use]
    pub fn with_auth_path(mut self, path: impl Into<String>) -> Self {
        self.settings.auth_path = path.into();
        self
    }

    #[must_use]
    pub fn with_role_selection_path(mut self, path: impl Into<String>) -> Self {
        self.settings.role_selection_path = path.into();
        self
    }

    /// Replace the access rules (protected paths, role-restricted paths,
    /// login and landing pages).
    #[must_use]
    pub fn with_gate_rules(mut self, rules: GateRules) -> Self {
        self.settings.gate = AccessGate::new(rules);
        self
    }

    /// Timeout for identity recovery and logout notification.
    #[must_use]
    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.settings.backend_timeout = timeout;
        self
    }
}

impl WebConfig<ApiClient> {
    /// Create config from environment variables.
    ///
    /// # Env vars
    /// - everything [`ApiConfig::from_env`] reads (`CAUSAS_API_URL` is required)
    /// - `DEV_AUTH`: `"1"` or `"true"` disables secure cookies for local HTTP
    /// - `COOKIE_KEY`: cookie encryption key bytes (at least 64)
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if required env vars are missing or
    /// values are invalid.
    pub fn from_env() -> Result<Self, AuthError> {
        let api = ApiConfig::from_env().map_err(|e| AuthError::Config(e.to_string()))?;
        let client = ApiClient::new(api).map_err(|e| AuthError::Config(e.to_string()))?;

        let dev_auth = matches!(
            std::env::var("DEV_AUTH").as_deref(),
            Ok("1") | Ok("true"),
        );

        let cookie_key = match std::env::var("COOKIE_KEY") {
            Ok(k) => Key::try_from(k.as_bytes()).map_err(|_| {
                AuthError::Config(
                    "COOKIE_KEY is set but invalid (must be at least 64 bytes). \
                     Remove the env var to use an ephemeral key, or provide a valid key."
                        .into(),
                )
            })?,
            Err(_) => {
                tracing::warn!("COOKIE_KEY not set, sessions will not survive a restart");
                Key::generate()
            }
        };

        Ok(Self::new(Arc::new(client))
            .with_cookie_key(cookie_key)
            .with_secure_cookies(!dev_auth))
    }
}
