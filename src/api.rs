use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::backend::AuthBackend;
use crate::campaign::{Campaign, CampaignQuery, NewCampaign, Page};
use crate::checkout::{PaymentPreference, PreferenceRequest};
use crate::error::Error;
use crate::types::{Role, Session, User};

/// Whether ambient (cookie) credentials travel with backend calls.
///
/// Decided once by configuration. Identity recovery makes a single call
/// with this mode instead of retrying with a different one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CredentialsMode {
    /// Keep a cookie store and send the backend's session cookies.
    ///
    /// The store belongs to the client, so only use this for single-user
    /// clients. A server handling many browsers must stay on `Omit`.
    Include,
    /// Bearer token only.
    #[default]
    Omit,
}

impl std::str::FromStr for CredentialsMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "include" => Ok(Self::Include),
            "omit" => Ok(Self::Omit),
            other => Err(Error::Config(format!(
                "unknown credentials mode '{other}' (expected 'include' or 'omit')"
            ))),
        }
    }
}

/// Backend API configuration.
///
/// ```rust,ignore
/// use causas_auth::ApiConfig;
///
/// let config = ApiConfig::new("https://api.causas.example/".parse()?)
///     .with_timeout(std::time::Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ApiConfig {
    pub(crate) base_url: Url,
    pub(crate) credentials: CredentialsMode,
    pub(crate) timeout: Duration,
}

impl ApiConfig {
    /// Create a configuration for the backend at `base_url`.
    ///
    /// A missing trailing slash is added so relative endpoints resolve
    /// below the base path.
    #[must_use]
    pub fn new(mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            base_url,
            credentials: CredentialsMode::default(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Required env vars
    /// - `CAUSAS_API_URL`: backend base URL
    ///
    /// # Optional env vars
    /// - `CAUSAS_API_CREDENTIALS`: `omit` (default) or `include`
    /// - `CAUSAS_API_TIMEOUT_SECS`: per-request timeout (default 10)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the URL is missing or a value is invalid.
    pub fn from_env() -> Result<Self, Error> {
        let base_url: Url = std::env::var("CAUSAS_API_URL")
            .map_err(|_| Error::Config("CAUSAS_API_URL is required".into()))?
            .parse()
            .map_err(|e| Error::Config(format!("CAUSAS_API_URL: {e}")))?;

        let mut config = Self::new(base_url);

        if let Ok(mode) = std::env::var("CAUSAS_API_CREDENTIALS") {
            config = config.with_credentials(mode.parse()?);
        }
        if let Ok(secs) = std::env::var("CAUSAS_API_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|e| Error::Config(format!("CAUSAS_API_TIMEOUT_SECS: {e}")))?;
            config = config.with_timeout(Duration::from_secs(secs));
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_credentials(mut self, mode: CredentialsMode) -> Self {
        self.credentials = mode;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn credentials(&self) -> CredentialsMode {
        self.credentials
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("endpoint {path}: {e}")))
    }
}

/// Token response from `auth/login` and the OAuth token exchange.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct LoginResponse {
    #[serde(alias = "accessToken")]
    pub access_token: String,
    #[serde(default, alias = "refreshToken")]
    pub refresh_token: Option<String>,
    pub user: User,
    #[serde(default, alias = "needsRoleSelection")]
    pub needs_role_selection: bool,
}

impl LoginResponse {
    /// Convert into a session, applying the refresh-token fallback.
    #[must_use]
    pub fn into_session(self) -> Session {
        Session::new(self.access_token, self.refresh_token, self.user)
    }
}

/// Body of `POST auth/register`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: Role,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct MessageBody {
    #[serde(default)]
    message: Option<MessageField>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MessageField {
    One(String),
    Many(Vec<String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UserBody {
    Bare(User),
    Wrapped { user: Option<User> },
}

impl UserBody {
    fn into_user(self) -> Option<User> {
        match self {
            Self::Bare(user) => Some(user),
            Self::Wrapped { user } => user,
        }
    }
}

/// Extracts the user-facing message from a backend error body.
///
/// Validation errors arrive as a list of messages and are joined.
/// Returns an empty string when the body carries nothing usable.
fn backend_message(body: &str) -> String {
    let Ok(parsed) = serde_json::from_str::<MessageBody>(body) else {
        return String::new();
    };
    match (parsed.message, parsed.error) {
        (Some(MessageField::One(msg)), _) => msg,
        (Some(MessageField::Many(msgs)), _) => msgs.join(", "),
        (None, Some(err)) => err,
        (None, None) => String::new(),
    }
}

/// HTTP client for the crowdfunding backend.
#[derive(Clone)]
pub struct ApiClient {
    config: ApiConfig,
    http: reqwest::Client,
}

impl ApiClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the underlying HTTP client cannot be built.
    pub fn new(config: ApiConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .cookie_store(config.credentials == CredentialsMode::Include)
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, http })
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Exchange email and password for tokens.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] with the
    /// backend's message when the credentials are rejected.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, Error> {
        let response = self
            .http
            .post(self.config.endpoint("auth/login")?)
            .json(&Credentials { email, password })
            .send()
            .await?;

        let response = Self::ensure_success(response, "login").await?;
        response.json::<LoginResponse>().await.map_err(Into::into)
    }

    /// Create an account. Returns the backend's confirmation message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] when the
    /// backend rejects the registration.
    pub async fn register(&self, registration: &Registration) -> Result<String, Error> {
        let response = self
            .http
            .post(self.config.endpoint("auth/register")?)
            .json(registration)
            .send()
            .await?;

        let response = Self::ensure_success(response, "register").await?;
        Self::message(response).await
    }

    /// Recover the identity behind the ambient session or `access_token`.
    ///
    /// `401`, `204` and empty bodies mean "no session" and yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] for any
    /// other non-success status.
    pub async fn me(&self, access_token: Option<&str>) -> Result<Option<User>, Error> {
        let mut request = self.http.get(self.config.endpoint("auth/me")?);
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::NO_CONTENT
        ) {
            return Ok(None);
        }

        let response = Self::ensure_success(response, "me").await?;
        let body = response.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        let parsed: Option<UserBody> = serde_json::from_slice(&body)?;
        Ok(parsed.and_then(UserBody::into_user))
    }

    /// Ask the backend to invalidate the server-side session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] on a
    /// non-success status.
    pub async fn logout(&self, access_token: &str) -> Result<(), Error> {
        let response = self
            .http
            .post(self.config.endpoint("auth/logout")?)
            .bearer_auth(access_token)
            .send()
            .await?;

        Self::ensure_success(response, "logout").await.map(drop)
    }

    /// Confirm an email address with the token from the verification mail.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] when the
    /// token is rejected.
    pub async fn verify_email(&self, token: &str) -> Result<String, Error> {
        let response = self
            .http
            .get(self.config.endpoint("auth/verify-email")?)
            .query(&[("token", token)])
            .send()
            .await?;

        let response = Self::ensure_success(response, "verify email").await?;
        Self::message(response).await
    }

    /// Send the verification mail again.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] on a
    /// non-success status.
    pub async fn resend_verification(&self, email: &str) -> Result<String, Error> {
        let response = self
            .http
            .post(self.config.endpoint("auth/resend-verification")?)
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await?;

        let response = Self::ensure_success(response, "resend verification").await?;
        Self::message(response).await
    }

    /// URL that starts the Google sign-in handoff on the backend.
    ///
    /// The optional `role` preselects the role for new accounts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the base URL cannot be joined.
    pub fn google_auth_url(&self, role: Option<Role>) -> Result<Url, Error> {
        let mut url = self.config.endpoint("auth/google")?;
        if let Some(role) = role {
            url.query_pairs_mut().append_pair("role", role.as_str());
        }
        Ok(url)
    }

    /// Exchange a Google authorization code for platform tokens.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] when the
    /// code is rejected.
    pub async fn google_token(&self, code: &str) -> Result<LoginResponse, Error> {
        let response = self
            .http
            .post(self.config.endpoint("auth/google/token")?)
            .json(&serde_json::json!({ "code": code }))
            .send()
            .await?;

        let response = Self::ensure_success(response, "google token").await?;
        response.json::<LoginResponse>().await.map_err(Into::into)
    }

    /// Set the role of an OAuth signup that still needs one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] when the
    /// backend rejects the change or answers without a user.
    pub async fn update_role(&self, access_token: &str, role: Role) -> Result<User, Error> {
        let response = self
            .http
            .post(self.config.endpoint("auth/update-role")?)
            .bearer_auth(access_token)
            .json(&serde_json::json!({ "role": role }))
            .send()
            .await?;

        let status = response.status().as_u16();
        let response = Self::ensure_success(response, "update role").await?;
        response
            .json::<UserBody>()
            .await?
            .into_user()
            .ok_or(Error::Api {
                operation: "update role",
                status,
                message: String::new(),
            })
    }

    /// List campaigns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] on a
    /// non-success status.
    pub async fn campaigns(&self, query: &CampaignQuery) -> Result<Page<Campaign>, Error> {
        let response = self
            .http
            .get(self.config.endpoint("campaigns")?)
            .query(&query.to_pairs())
            .send()
            .await?;

        let response = Self::ensure_success(response, "list campaigns").await?;
        response.json::<Page<Campaign>>().await.map_err(Into::into)
    }

    /// List campaigns, degrading to an empty page on any failure.
    pub async fn campaigns_or_empty(&self, query: &CampaignQuery) -> Page<Campaign> {
        self.campaigns(query).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Campaign listing failed, showing empty list");
            Page::default()
        })
    }

    /// Create a campaign on behalf of the signed-in beneficiary.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] when the
    /// backend rejects the campaign.
    pub async fn create_campaign(
        &self,
        access_token: &str,
        campaign: &NewCampaign,
    ) -> Result<Campaign, Error> {
        let response = self
            .http
            .post(self.config.endpoint("campaigns")?)
            .bearer_auth(access_token)
            .json(campaign)
            .send()
            .await?;

        let response = Self::ensure_success(response, "create campaign").await?;
        response.json::<Campaign>().await.map_err(Into::into)
    }

    /// Obtain a hosted-checkout preference for a donation.
    ///
    /// Anonymous donations pass no token. The caller decides whether to
    /// redirect; nothing is followed here.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] when the
    /// backend cannot create the preference.
    pub async fn payment_preference(
        &self,
        access_token: Option<&str>,
        request: &PreferenceRequest,
    ) -> Result<PaymentPreference, Error> {
        let mut builder = self
            .http
            .post(self.config.endpoint("mercadopago/payment/preference")?)
            .json(request);
        if let Some(token) = access_token {
            builder = builder.bearer_auth(token);
        }
        let response = builder.send().await?;

        let response = Self::ensure_success(response, "payment preference").await?;
        response.json::<PaymentPreference>().await.map_err(Into::into)
    }

    /// Checks HTTP response status; returns the response on success or an error with details.
    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(operation, status, "Backend rejected request");
        Err(Error::Api {
            operation,
            status,
            message: backend_message(&body),
        })
    }

    async fn message(response: reqwest::Response) -> Result<String, Error> {
        let body = response.text().await?;
        Ok(backend_message(&body))
    }
}

impl AuthBackend for ApiClient {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, Error> {
        ApiClient::login(self, email, password).await
    }

    async fn me(&self, access_token: Option<&str>) -> Result<Option<User>, Error> {
        ApiClient::me(self, access_token).await
    }

    async fn logout(&self, access_token: &str) -> Result<(), Error> {
        ApiClient::logout(self, access_token).await
    }

    async fn update_role(&self, access_token: &str, role: Role) -> Result<User, Error> {
        ApiClient::update_role(self, access_token, role).await
    }

    async fn google_token(&self, code: &str) -> Result<LoginResponse, Error> {
        ApiClient::google_token(self, code).await
    }
}
