use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use super::mirror::{MirrorRecord, SessionMirror};
use crate::api::LoginResponse;
use crate::backend::AuthBackend;
use crate::error::Error;
use crate::types::{Session, User};

/// Upper bound for backend calls made by the store (identity recovery and
/// logout notification).
pub const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Owner of the live session and sole writer of its durable mirror.
///
/// One store per page load (or per request in the web layer). Nothing is
/// global: pass the store to whatever needs the current identity.
///
/// ```rust,ignore
/// let store = SessionStore::new(MemoryMirror::new(), Arc::new(api));
/// store.login(response.access_token, response.refresh_token, response.user)?;
/// assert!(store.token().is_some());
/// store.logout().await;
/// ```
pub struct SessionStore<M, B> {
    current: RwLock<Option<Session>>,
    mirror: M,
    backend: Arc<B>,
    timeout: Duration,
}

impl<M: SessionMirror, B: AuthBackend> SessionStore<M, B> {
    #[must_use]
    pub fn new(mirror: M, backend: Arc<B>) -> Self {
        Self {
            current: RwLock::new(None),
            mirror,
            backend,
            timeout: DEFAULT_BACKEND_TIMEOUT,
        }
    }

    /// Override the timeout applied to backend calls.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the current session and persist it to the mirror.
    ///
    /// A missing or empty `refresh_token` falls back to the access token.
    /// A mirror write failure is logged and does not fail the login; the
    /// in-memory session stays authoritative for this store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyToken`] if `access_token` is the empty string,
    /// leaving the current session untouched. Any other string is accepted
    /// as is.
    pub fn login(
        &self,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        user: User,
    ) -> Result<(), Error> {
        let session = Session::new(access_token, refresh_token, user);
        if session.access_token.is_empty() {
            return Err(Error::EmptyToken);
        }

        match MirrorRecord::from_session(&session) {
            Ok(record) => {
                if let Err(e) = self.mirror.persist(&record) {
                    tracing::warn!(error = %e, "Session mirror write failed");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Session could not be encoded for the mirror"),
        }

        tracing::debug!(user_id = %session.user.id, role = %session.user.role, "Session stored");
        *self.current.write() = Some(session);
        Ok(())
    }

    /// [`login`](Self::login) from a backend token response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyToken`] if the response carries an empty token.
    pub fn login_response(&self, response: LoginResponse) -> Result<(), Error> {
        self.login(response.access_token, response.refresh_token, response.user)
    }

    /// End the session.
    ///
    /// The backend is told first, best effort: failures and timeouts are
    /// logged, never returned. Local state and the mirror are cleared
    /// afterwards in every case. Calling it again is a no-op.
    pub async fn logout(&self) {
        let token = self.token().or_else(|| self.mirror_token());

        if let Some(token) = token {
            match tokio::time::timeout(self.timeout, self.backend.logout(&token)).await {
                Ok(Ok(())) => tracing::debug!("Backend session invalidated"),
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "Backend logout failed, clearing local session anyway");
                }
                Err(_) => {
                    tracing::warn!(
                        timeout = ?self.timeout,
                        "Backend logout timed out, clearing local session anyway"
                    );
                }
            }
        }

        self.current.write().take();
        if let Err(e) = self.mirror.clear() {
            tracing::warn!(error = %e, "Session mirror clear failed");
        }
    }

    /// Recover the identity on first load.
    ///
    /// Uses the token from the mirror and asks the backend who it belongs
    /// to, once, within the store's timeout. No token, a backend failure,
    /// a timeout or an empty answer all resolve to "no session". The mirror
    /// is not rewritten.
    pub async fn restore(&self) -> Option<User> {
        let record = match self.mirror.load() {
            Ok(record) => record.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Session mirror unreadable");
                MirrorRecord::default()
            }
        };

        let user = match record.token() {
            None => {
                tracing::debug!("No stored token, starting without session");
                None
            }
            Some(token) => {
                match tokio::time::timeout(self.timeout, self.backend.me(Some(token))).await {
                    Ok(Ok(Some(user))) => Some(user),
                    Ok(Ok(None)) => {
                        tracing::debug!("Backend knows no session for stored token");
                        None
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(error = %e, "Identity recovery failed, starting without session");
                        None
                    }
                    Err(_) => {
                        tracing::warn!(
                            timeout = ?self.timeout,
                            "Identity recovery timed out, starting without session"
                        );
                        None
                    }
                }
            }
        };

        let session = match (record.token(), &user) {
            (Some(token), Some(user)) => {
                Some(Session::new(token, record.refresh_token.clone(), user.clone()))
            }
            _ => None,
        };
        *self.current.write() = session;
        user
    }

    /// Current access token, for attaching to outgoing calls.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.current.read().as_ref().map(|s| s.access_token.clone())
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<String> {
        self.current.read().as_ref().map(|s| s.refresh_token.clone())
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.current.read().as_ref().map(|s| s.user.clone())
    }

    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.current.read().clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.current.read().is_some()
    }

    #[must_use]
    pub fn mirror(&self) -> &M {
        &self.mirror
    }

    /// Consume the store, returning its mirror.
    #[must_use]
    pub fn into_mirror(self) -> M {
        self.mirror
    }

    fn mirror_token(&self) -> Option<String> {
        let record = self.mirror.load().ok().flatten()?;
        record.token().map(str::to_owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockBackend;
    use crate::session::mirror::MemoryMirror;
    use crate::types::Role;

    fn ana() -> User {
        User::new("u1", "ana@example.com", "Ana Díaz", Role::Donor).with_verified(true)
    }

    fn store(backend: MockBackend) -> (SessionStore<MemoryMirror, MockBackend>, Arc<MockBackend>) {
        let backend = Arc::new(backend);
        (SessionStore::new(MemoryMirror::new(), backend.clone()), backend)
    }

    struct BrokenMirror;

    impl SessionMirror for BrokenMirror {
        fn load(&self) -> Result<Option<MirrorRecord>, Error> {
            Err(std::io::Error::other("disk gone").into())
        }

        fn persist(&self, _record: &MirrorRecord) -> Result<(), Error> {
            Err(std::io::Error::other("disk gone").into())
        }

        fn clear(&self) -> Result<(), Error> {
            Err(std::io::Error::other("disk gone").into())
        }
    }

    #[test]
    fn login_exposes_token_and_user() {
        let (store, _) = store(MockBackend::with_user(ana()));
        store.login("t1", Some("t1".into()), ana()).unwrap();

        assert_eq!(store.token().as_deref(), Some("t1"));
        assert_eq!(store.user(), Some(ana()));
        assert!(store.is_authenticated());
    }

    #[test]
    fn login_writes_mirror() {
        let (store, _) = store(MockBackend::default());
        store.login("t1", Some("r1".into()), ana()).unwrap();

        let record = store.mirror().snapshot().unwrap();
        assert_eq!(record.token(), Some("t1"));
        assert_eq!(record.refresh_token.as_deref(), Some("r1"));
        assert_eq!(record.role_claim(), Some(Role::Donor));
    }

    #[test]
    fn login_replaces_previous_session() {
        let (store, _) = store(MockBackend::default());
        store.login("t1", None, ana()).unwrap();
        let admin = User::new("u2", "root@example.com", "Root", Role::Admin);
        store.login("t2", None, admin.clone()).unwrap();

        assert_eq!(store.token().as_deref(), Some("t2"));
        assert_eq!(store.refresh_token().as_deref(), Some("t2"));
        assert_eq!(store.user(), Some(admin));
    }

    #[test]
    fn login_rejects_empty_token() {
        let (store, _) = store(MockBackend::default());
        store.login("t1", None, ana()).unwrap();

        let err = store.login("", None, ana()).unwrap_err();
        assert!(matches!(err, Error::EmptyToken));
        assert_eq!(store.token().as_deref(), Some("t1"));
    }

    #[test]
    fn login_accepts_any_non_empty_token() {
        let (store, _) = store(MockBackend::default());
        store.login(" ", None, ana()).unwrap();

        assert_eq!(store.token().as_deref(), Some(" "));
        assert_eq!(store.mirror().snapshot().unwrap().token(), Some(" "));
    }

    #[test]
    fn login_survives_mirror_failure() {
        let store = SessionStore::new(BrokenMirror, Arc::new(MockBackend::default()));
        store.login("t1", None, ana()).unwrap();
        assert_eq!(store.token().as_deref(), Some("t1"));
    }

    #[test]
    fn login_response_applies_refresh_fallback() {
        let (store, _) = store(MockBackend::default());
        let response: LoginResponse = serde_json::from_str(
            r#"{"access_token":"t9","user":{"id":"u1","email":"a@b.c","role":"DONOR"}}"#,
        )
        .unwrap();
        store.login_response(response).unwrap();
        assert_eq!(store.refresh_token().as_deref(), Some("t9"));
    }

    #[tokio::test]
    async fn logout_clears_when_backend_succeeds() {
        let (store, backend) = store(MockBackend::with_user(ana()));
        store.login("t1", None, ana()).unwrap();
        store.logout().await;

        assert!(store.token().is_none());
        assert!(store.user().is_none());
        assert!(store.mirror().snapshot().is_none());
        assert_eq!(backend.logout_calls(), 1);
    }

    #[tokio::test]
    async fn logout_clears_when_backend_fails() {
        let (store, backend) = store(MockBackend {
            fail_logout: true,
            ..MockBackend::default()
        });
        store.login("t1", None, ana()).unwrap();
        store.logout().await;

        assert!(store.token().is_none());
        assert!(store.user().is_none());
        assert!(store.mirror().snapshot().is_none());
        assert_eq!(backend.logout_calls(), 1);
    }

    #[tokio::test]
    async fn logout_twice_is_idempotent() {
        let (store, backend) = store(MockBackend::default());
        store.login("t1", None, ana()).unwrap();
        store.logout().await;
        store.logout().await;

        assert!(store.token().is_none());
        assert!(store.session().is_none());
        assert_eq!(backend.logout_calls(), 1);
    }

    #[tokio::test]
    async fn logout_uses_mirror_token_without_live_session() {
        let backend = Arc::new(MockBackend::default());
        let mirror = MemoryMirror::with_record(MirrorRecord {
            token: Some("stale".into()),
            ..MirrorRecord::default()
        });
        let store = SessionStore::new(mirror, backend.clone());
        store.logout().await;

        assert_eq!(backend.logout_calls(), 1);
        assert!(store.mirror().snapshot().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn logout_does_not_wait_forever_on_backend() {
        struct HangingBackend;

        impl AuthBackend for HangingBackend {
            async fn login(&self, _: &str, _: &str) -> Result<LoginResponse, Error> {
                std::future::pending().await
            }
            async fn me(&self, _: Option<&str>) -> Result<Option<User>, Error> {
                std::future::pending().await
            }
            async fn logout(&self, _: &str) -> Result<(), Error> {
                std::future::pending().await
            }
            async fn update_role(&self, _: &str, _: Role) -> Result<User, Error> {
                std::future::pending().await
            }
            async fn google_token(&self, _: &str) -> Result<LoginResponse, Error> {
                std::future::pending().await
            }
        }

        let store = SessionStore::new(MemoryMirror::new(), Arc::new(HangingBackend));
        store.login("t1", None, ana()).unwrap();
        store.logout().await;
        assert!(store.token().is_none());
        assert!(store.restore().await.is_none());
    }

    #[tokio::test]
    async fn restore_recovers_identity_from_mirror_token() {
        let backend = Arc::new(MockBackend::with_user(ana()));
        let mirror = MemoryMirror::new();
        SessionStore::new(mirror.clone(), backend.clone())
            .login("t1", Some("r1".into()), ana())
            .unwrap();

        let fresh = SessionStore::new(mirror, backend.clone());
        assert_eq!(fresh.restore().await, Some(ana()));
        assert_eq!(fresh.token().as_deref(), Some("t1"));
        assert_eq!(fresh.refresh_token().as_deref(), Some("r1"));
        assert_eq!(backend.me_calls(), 1);
    }

    #[tokio::test]
    async fn restore_without_token_skips_backend() {
        let (store, backend) = store(MockBackend::with_user(ana()));
        assert!(store.restore().await.is_none());
        assert!(!store.is_authenticated());
        assert_eq!(backend.me_calls(), 0);
    }

    #[tokio::test]
    async fn restore_failure_means_no_session() {
        let backend = Arc::new(MockBackend {
            fail_me: true,
            ..MockBackend::with_user(ana())
        });
        let mirror = MemoryMirror::with_record(MirrorRecord {
            token: Some("t1".into()),
            ..MirrorRecord::default()
        });
        let store = SessionStore::new(mirror, backend.clone());

        assert!(store.restore().await.is_none());
        assert!(store.token().is_none());
        assert_eq!(backend.me_calls(), 1);
    }

    #[tokio::test]
    async fn restore_with_broken_mirror_means_no_session() {
        let backend = Arc::new(MockBackend::with_user(ana()));
        let store = SessionStore::new(BrokenMirror, backend.clone());
        assert!(store.restore().await.is_none());
        assert_eq!(backend.me_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn restore_times_out_to_no_session() {
        let backend = Arc::new(MockBackend {
            me_delay: Some(Duration::from_secs(60)),
            ..MockBackend::with_user(ana())
        });
        let mirror = MemoryMirror::with_record(MirrorRecord {
            token: Some("t1".into()),
            ..MirrorRecord::default()
        });
        let store = SessionStore::new(mirror, backend).with_timeout(Duration::from_secs(2));

        assert!(store.restore().await.is_none());
        assert!(!store.is_authenticated());
    }
}
