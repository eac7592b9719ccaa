use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::PrivateCookieJar;
use axum_extra::extract::cookie::Key;

use super::config::WebSettings;
use super::cookies::CookieMirror;
use crate::backend::AuthBackend;
use crate::session::SessionStore;

/// Shared state for session routes and middleware.
pub(super) struct WebState<B> {
    pub(super) backend: Arc<B>,
    pub(super) settings: Arc<WebSettings>,
}

// Manual Clone: avoid derive adding a `B: Clone` bound.
impl<B> Clone for WebState<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            settings: self.settings.clone(),
        }
    }
}

impl<B: AuthBackend> WebState<B> {
    /// Request-scoped store whose mirror is the request's cookie jar.
    pub(super) fn store(&self, jar: PrivateCookieJar) -> SessionStore<CookieMirror, B> {
        let mirror = CookieMirror::new(
            jar,
            self.settings.cookie_key.clone(),
            self.settings.cookies.clone(),
        );
        SessionStore::new(mirror, self.backend.clone()).with_timeout(self.settings.backend_timeout)
    }
}

// PrivateCookieJar requires Key to be extractable from state
impl<B: AuthBackend> FromRef<WebState<B>> for Key {
    fn from_ref(state: &WebState<B>) -> Self {
        state.settings.cookie_key.clone()
    }
}
