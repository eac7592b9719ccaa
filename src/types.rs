use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Backend user identifier (opaque string).
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct UserId(pub String);

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Account role, as carried in the user claim.
///
/// Any role string the platform does not know becomes [`Role::Unknown`]
/// instead of a parse failure, so an unexpected claim never widens access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Donor,
    Beneficiary,
    Admin,
    Unknown,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Donor => "DONOR",
            Self::Beneficiary => "BENEFICIARY",
            Self::Admin => "ADMIN",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        s.as_str().into()
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "DONOR" => Self::Donor,
            "BENEFICIARY" => Self::Beneficiary,
            "ADMIN" => Self::Admin,
            _ => Self::Unknown,
        }
    }
}

impl From<Role> for String {
    fn from(r: Role) -> Self {
        r.as_str().to_owned()
    }
}

/// How the account signs in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    #[default]
    Email,
    Google,
}

/// Denormalized identity snapshot returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(default, alias = "full_name")]
    pub full_name: String,
    pub role: Role,
    #[serde(default)]
    pub verified: bool,
    #[serde(default, alias = "profile_picture", skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    #[serde(default, alias = "auth_method")]
    pub auth_method: AuthMethod,
}

impl User {
    #[must_use]
    pub fn new(
        id: impl Into<UserId>,
        email: impl Into<String>,
        full_name: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            full_name: full_name.into(),
            role,
            verified: false,
            profile_picture: None,
            auth_method: AuthMethod::Email,
        }
    }

    #[must_use]
    pub fn with_verified(mut self, verified: bool) -> Self {
        self.verified = verified;
        self
    }

    #[must_use]
    pub fn with_profile_picture(mut self, url: impl Into<String>) -> Self {
        self.profile_picture = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_auth_method(mut self, method: AuthMethod) -> Self {
        self.auth_method = method;
        self
    }

    #[must_use]
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }
}

/// Authenticated identity plus its bearer credentials.
///
/// Replaced wholesale on every login; there is no per-field update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

impl Session {
    /// Build a session, reusing the access token as refresh token when the
    /// backend did not issue a distinct one.
    #[must_use]
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>, user: User) -> Self {
        let access_token = access_token.into();
        let refresh_token = refresh_token
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| access_token.clone());
        Self {
            access_token,
            refresh_token,
            user,
        }
    }
}
