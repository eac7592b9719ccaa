use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::{Role, Session, User};

/// Persisted copy of the session, readable without the in-memory store.
///
/// `user` holds the JSON text of the user claim exactly as stored, so a
/// corrupted claim can be told apart from an absent one and ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

#[derive(Deserialize)]
struct RoleClaim {
    role: Role,
}

impl MirrorRecord {
    /// Snapshot a session for persistence.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the user cannot be encoded.
    pub fn from_session(session: &Session) -> Result<Self, Error> {
        Ok(Self {
            token: Some(session.access_token.clone()),
            refresh_token: Some(session.refresh_token.clone()),
            user: Some(serde_json::to_string(&session.user)?),
        })
    }

    /// Stored access token, if present and non-empty.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Role from the user claim. Unparsable claims count as absent.
    #[must_use]
    pub fn role_claim(&self) -> Option<Role> {
        let raw = self.user.as_deref()?;
        match serde_json::from_str::<RoleClaim>(raw) {
            Ok(claim) => Some(claim.role),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring malformed user claim");
                None
            }
        }
    }

    /// Full user snapshot from the claim, if it parses.
    #[must_use]
    pub fn user(&self) -> Option<User> {
        serde_json::from_str(self.user.as_deref()?).ok()
    }
}

/// Durable medium the session store writes and the access gate reads.
///
/// Writes are not transactional across media; see the `(A, B)` fan-out.
pub trait SessionMirror: Send + Sync {
    /// Read the stored record. `Ok(None)` when nothing is stored.
    fn load(&self) -> Result<Option<MirrorRecord>, Error>;

    /// Replace the stored record.
    fn persist(&self, record: &MirrorRecord) -> Result<(), Error>;

    /// Remove the stored record. Clearing an empty mirror is not an error.
    fn clear(&self) -> Result<(), Error>;
}

/// In-process mirror. Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct MemoryMirror {
    inner: Arc<RwLock<Option<MirrorRecord>>>,
}

impl MemoryMirror {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirror pre-seeded with `record`.
    #[must_use]
    pub fn with_record(record: MirrorRecord) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(record))),
        }
    }

    /// Current record without going through the `Result` interface.
    #[must_use]
    pub fn snapshot(&self) -> Option<MirrorRecord> {
        self.inner.read().clone()
    }
}

impl SessionMirror for MemoryMirror {
    fn load(&self) -> Result<Option<MirrorRecord>, Error> {
        Ok(self.snapshot())
    }

    fn persist(&self, record: &MirrorRecord) -> Result<(), Error> {
        *self.inner.write() = Some(record.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), Error> {
        *self.inner.write() = None;
        Ok(())
    }
}

/// JSON file mirror, reused across restarts.
#[derive(Debug, Clone)]
pub struct FileMirror {
    path: PathBuf,
}

impl FileMirror {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionMirror for FileMirror {
    fn load(&self) -> Result<Option<MirrorRecord>, Error> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::warn!(error = %e, path = %self.path.display(), "Ignoring unreadable session file");
                Ok(None)
            }
        }
    }

    fn persist(&self, record: &MirrorRecord) -> Result<(), Error> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        // rename is atomic on the same filesystem; readers never see a torn file
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec(record)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), Error> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Fan-out: writes go to both mirrors, reads prefer the first.
///
/// Both sides are always attempted; a failure on one does not roll back
/// the other, and the first error is reported.
impl<A: SessionMirror, B: SessionMirror> SessionMirror for (A, B) {
    fn load(&self) -> Result<Option<MirrorRecord>, Error> {
        match self.0.load() {
            Ok(Some(record)) => Ok(Some(record)),
            Ok(None) => self.1.load(),
            Err(e) => {
                tracing::warn!(error = %e, "Primary session mirror unreadable, trying secondary");
                self.1.load()
            }
        }
    }

    fn persist(&self, record: &MirrorRecord) -> Result<(), Error> {
        let first = self.0.persist(record);
        let second = self.1.persist(record);
        first.and(second)
    }

    fn clear(&self) -> Result<(), Error> {
        let first = self.0.clear();
        let second = self.1.clear();
        first.and(second)
    }
}
