use std::future::Future;

use crate::api::LoginResponse;
use crate::error::Error;
use crate::types::{Role, User};

/// Remote auth operations the session layer depends on.
///
/// [`ApiClient`](crate::ApiClient) is the production implementation.
/// The session store and the web routes only see this trait, so they can
/// run against a fake backend in tests.
pub trait AuthBackend: Send + Sync + 'static {
    /// Exchange email and password for tokens (`POST auth/login`).
    fn login(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<LoginResponse, Error>> + Send;

    /// Recover the current identity (`GET auth/me`).
    ///
    /// `Ok(None)` means the backend answered but knows no session.
    fn me(
        &self,
        access_token: Option<&str>,
    ) -> impl Future<Output = Result<Option<User>, Error>> + Send;

    /// Invalidate the server-side session (`POST auth/logout`).
    fn logout(&self, access_token: &str) -> impl Future<Output = Result<(), Error>> + Send;

    /// Finalize the role of an OAuth signup (`POST auth/update-role`).
    fn update_role(
        &self,
        access_token: &str,
        role: Role,
    ) -> impl Future<Output = Result<User, Error>> + Send;

    /// Exchange an OAuth authorization code for tokens (`POST auth/google/token`).
    fn google_token(&self, code: &str) -> impl Future<Output = Result<LoginResponse, Error>> + Send;
}
