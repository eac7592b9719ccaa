#![doc = include_str!("../README.md")]

pub mod api;
pub mod backend;
pub mod campaign;
pub mod checkout;
pub mod error;
pub mod gate;
pub mod session;
pub mod types;
#[cfg(feature = "web")]
pub mod web;

// Re-exports for convenient access
pub use api::{ApiClient, ApiConfig, CredentialsMode, LoginResponse, Registration};
pub use backend::AuthBackend;
pub use campaign::{Campaign, CampaignQuery, NewCampaign, Page};
pub use checkout::{PaymentPreference, PreferenceRequest};
pub use error::Error;
pub use gate::{AccessGate, Decision, GateRules, RedirectReason};
pub use session::{FileMirror, MemoryMirror, MirrorRecord, SessionMirror, SessionStore};
pub use types::{AuthMethod, Role, Session, User, UserId};
