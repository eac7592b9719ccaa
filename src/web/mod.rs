//! Cookie-backed session handling for Axum.
//!
//! The durable mirror lives in encrypted cookies. The access gate reads
//! them before a page handler runs; the session routes are the only
//! writers.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use causas_auth::web::{CurrentSession, WebConfig, session_router};
//!
//! // 1. Configure from environment (CAUSAS_API_URL, COOKIE_KEY, ...)
//! let config = WebConfig::from_env()?;
//!
//! // 2. Wrap page routes with the gate and mount the session routes
//! let pages = axum::Router::new().route("/dashboard", get(dashboard));
//! let app = session_router(config, pages);
//!
//! // 3. Read the session in handlers
//! async fn dashboard(session: CurrentSession) -> impl IntoResponse { /* ... */ }
//! ```

mod config;
mod cookies;
mod error;
mod extractor;
mod gate;
mod routes;
mod state;

pub use config::WebConfig;
pub use cookies::CookieMirror;
pub use error::AuthError;
pub use extractor::{CurrentSession, RequireSession};
pub use routes::session_router;

/// Re-export cookie key type for builder API.
pub use axum_extra::extract::cookie::Key as CookieKey;
