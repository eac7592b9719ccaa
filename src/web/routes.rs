use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::middleware;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Form;
use axum_extra::extract::PrivateCookieJar;
use serde::Deserialize;

use super::config::WebConfig;
use super::gate::{access_gate, provide_session};
use super::state::WebState;
use crate::backend::AuthBackend;
use crate::error::{GENERIC_MESSAGE, INVALID_ROLE_MESSAGE, OAUTH_FAILED_MESSAGE};
use crate::types::Role;

/// Wrap `pages` with the access gate and session provider, and mount the
/// session routes under the configured auth path.
///
/// Requests to page routes run through the gate first (cookie mirror only,
/// no backend call), then the provider recovers the session for
/// [`CurrentSession`](super::CurrentSession).
pub fn session_router<B: AuthBackend>(config: WebConfig<B>, pages: Router) -> Router {
    let state = WebState {
        backend: config.backend,
        settings: Arc::new(config.settings),
    };
    let auth_path = state.settings.auth_path.clone();

    let auth = Router::new()
        .route(&format!("{auth_path}/login"), post(login::<B>))
        .route(
            &format!("{auth_path}/logout"),
            get(logout::<B>).post(logout::<B>),
        )
        .route(&format!("{auth_path}/callback"), get(callback::<B>))
        .route(&format!("{auth_path}/role"), post(select_role::<B>))
        .with_state(state.clone());

    pages
        .layer(middleware::from_fn_with_state(state.clone(), provide_session::<B>))
        .layer(middleware::from_fn_with_state(state, access_gate::<B>))
        .merge(auth)
}

// ── Login ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct LoginForm {
    email: String,
    password: String,
}

async fn login<B: AuthBackend>(
    State(state): State<WebState<B>>,
    jar: PrivateCookieJar,
    Form(form): Form<LoginForm>,
) -> Result<(PrivateCookieJar, Redirect), Response> {
    let login_path = state.settings.login_path();

    let response = state
        .backend
        .login(form.email.trim(), &form.password)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Login rejected");
            login_error(login_path, &e.user_message())
        })?;

    let needs_role_selection = response.needs_role_selection;
    let store = state.store(jar);
    store.login_response(response).map_err(|e| {
        tracing::error!(error = %e, "Backend issued an unusable session");
        login_error(login_path, &e.user_message())
    })?;

    if let Some(user) = store.user() {
        tracing::info!(user_id = %user.id, role = %user.role, "Login successful");
    }

    let target = if needs_role_selection {
        state.settings.role_selection_path.as_str()
    } else {
        state.settings.landing_path()
    };
    Ok((store.into_mirror().into_jar(), Redirect::to(target)))
}

// ── Logout ─────────────────────────────────────────────────────────

async fn logout<B: AuthBackend>(
    State(state): State<WebState<B>>,
    jar: PrivateCookieJar,
) -> (PrivateCookieJar, Redirect) {
    let store = state.store(jar);
    store.logout().await;
    (
        store.into_mirror().into_jar(),
        Redirect::to(state.settings.login_path()),
    )
}

// ── OAuth landing ──────────────────────────────────────────────────

#[derive(Deserialize)]
struct CallbackParams {
    token: Option<String>,
    refresh_token: Option<String>,
    code: Option<String>,
    needs_role_selection: Option<bool>,
    error: Option<String>,
}

async fn callback<B: AuthBackend>(
    State(state): State<WebState<B>>,
    jar: PrivateCookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(PrivateCookieJar, Redirect), Response> {
    let login_path = state.settings.login_path();

    if let Some(error) = &params.error {
        tracing::warn!(error = %error, "OAuth error from backend");
        return Err(login_error(login_path, OAUTH_FAILED_MESSAGE));
    }

    let flagged = params.needs_role_selection.unwrap_or(false);

    let (token, refresh_token, user, needs_role_selection) =
        if let Some(token) = params.token.filter(|t| !t.is_empty()) {
            let user = state
                .backend
                .me(Some(&token))
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "Userinfo request failed");
                    login_error(login_path, &e.user_message())
                })?
                .ok_or_else(|| login_error(login_path, GENERIC_MESSAGE))?;
            (token, params.refresh_token, user, flagged)
        } else if let Some(code) = params.code {
            let response = state.backend.google_token(&code).await.map_err(|e| {
                tracing::error!(error = %e, "OAuth code exchange failed");
                login_error(login_path, &e.user_message())
            })?;
            let needs = response.needs_role_selection || flagged;
            (response.access_token, response.refresh_token, response.user, needs)
        } else {
            tracing::warn!("OAuth landing without token or code");
            return Err(Redirect::to(login_path).into_response());
        };

    let store = state.store(jar);
    store.login(token, refresh_token, user).map_err(|e| {
        tracing::error!(error = %e, "OAuth landing produced an unusable session");
        login_error(login_path, &e.user_message())
    })?;

    tracing::info!(needs_role_selection, "OAuth login successful");

    let target = if needs_role_selection {
        state.settings.role_selection_path.as_str()
    } else {
        state.settings.landing_path()
    };
    Ok((store.into_mirror().into_jar(), Redirect::to(target)))
}

// ── Role selection ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct RoleForm {
    role: String,
}

async fn select_role<B: AuthBackend>(
    State(state): State<WebState<B>>,
    jar: PrivateCookieJar,
    Form(form): Form<RoleForm>,
) -> Result<(PrivateCookieJar, Redirect), Response> {
    let selection_path = state.settings.role_selection_path.as_str();

    // admin accounts are never self-assigned
    let role = Role::from(form.role.as_str());
    if !matches!(role, Role::Donor | Role::Beneficiary) {
        return Err(login_error(selection_path, INVALID_ROLE_MESSAGE));
    }

    let store = state.store(jar);
    let record = store.mirror().record();
    let Some(token) = record.token() else {
        return Err(Redirect::to(state.settings.login_path()).into_response());
    };

    let user = state.backend.update_role(token, role).await.map_err(|e| {
        tracing::warn!(error = %e, "Role update failed");
        login_error(selection_path, &e.user_message())
    })?;

    store
        .login(token, record.refresh_token.clone(), user)
        .map_err(|e| login_error(selection_path, &e.user_message()))?;

    tracing::info!(%role, "Role selected");
    Ok((
        store.into_mirror().into_jar(),
        Redirect::to(state.settings.landing_path()),
    ))
}

// ── Helpers ────────────────────────────────────────────────────────

/// Redirect to `path` carrying a user-facing message in `?error=`.
fn login_error(path: &str, message: &str) -> Response {
    let encoded = urlencoding::encode(message);
    Redirect::to(&format!("{path}?error={encoded}")).into_response()
}
