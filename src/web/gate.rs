use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::PrivateCookieJar;

use super::cookies;
use super::extractor::CurrentSession;
use super::state::WebState;
use crate::backend::AuthBackend;
use crate::gate::Decision;

/// Apply the access gate to the request path using only the cookie mirror.
pub(super) async fn access_gate<B: AuthBackend>(
    State(state): State<WebState<B>>,
    jar: PrivateCookieJar,
    request: Request,
    next: Next,
) -> Response {
    let record = cookies::read_record(&jar, &state.settings.cookies);
    let decision = state.settings.gate.check(request.uri().path(), &record);

    match decision {
        Decision::Allow => next.run(request).await,
        Decision::Redirect { to, reason } => {
            tracing::debug!(path = %request.uri().path(), ?reason, to = %to, "Navigation redirected");
            Redirect::to(&to).into_response()
        }
    }
}

/// Recover the session for this request and expose it as [`CurrentSession`].
pub(super) async fn provide_session<B: AuthBackend>(
    State(state): State<WebState<B>>,
    jar: PrivateCookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let store = state.store(jar);
    store.restore().await;
    request
        .extensions_mut()
        .insert(CurrentSession(store.session()));
    next.run(request).await
}
