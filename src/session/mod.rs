//! Client-held session: the live identity and its durable mirror.

mod mirror;
mod store;

pub use mirror::{FileMirror, MemoryMirror, MirrorRecord, SessionMirror};
pub use store::{DEFAULT_BACKEND_TIMEOUT, SessionStore};
