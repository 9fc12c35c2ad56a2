//! Persistence of the authenticated [Session].
//!
//! The client never reads credentials from ambient storage;
//! callers load a session from a [SessionStore] and pass it in explicitly.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub use rads_catalog::types::Session;
use tempfile::{NamedTempFile, PersistError};
use thiserror::Error;
use tracing::debug;

pub const SESSION_FILE_NAME: &str = "session.json";

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("could not read session file '{}'", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not write session file")]
    Write(#[source] io::Error),
    #[error("could not parse session file '{}'", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Storage backend for the credential and user profile.
pub trait SessionStore {
    /// Load the stored session; an absent session is not an error.
    fn load(&self) -> Result<Session, SessionStoreError>;
    fn save(&self, session: &Session) -> Result<(), SessionStoreError>;
    fn clear(&self) -> Result<(), SessionStoreError>;
}

/// Stores the session as JSON in a data directory.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        FileSessionStore {
            path: data_dir.as_ref().join(SESSION_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Session, SessionStoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no stored session");
                return Ok(Session::default());
            },
            Err(source) => {
                return Err(SessionStoreError::Read {
                    path: self.path.clone(),
                    source,
                });
            },
        };

        serde_json::from_str(&contents).map_err(|source| SessionStoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, session: &Session) -> Result<(), SessionStoreError> {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(SessionStoreError::Write)?;

        // write to a temp file in the same directory, then move into place
        let mut temp_file = NamedTempFile::new_in(parent).map_err(SessionStoreError::Write)?;
        let contents = serde_json::to_string_pretty(session)?;
        temp_file
            .write_all(contents.as_bytes())
            .map_err(SessionStoreError::Write)?;
        temp_file.persist(&self.path)?;

        debug!(path = %self.path.display(), "saved session");
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionStoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionStoreError::Write(e)),
        }
    }
}

/// Keeps the session in memory, for tests and short-lived sessions.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: Mutex<Session>,
}

impl MemorySessionStore {
    pub fn new(session: Session) -> Self {
        MemorySessionStore {
            session: Mutex::new(session),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Session, SessionStoreError> {
        Ok(self.session.lock().expect("session mutex poisoned").clone())
    }

    fn save(&self, session: &Session) -> Result<(), SessionStoreError> {
        *self.session.lock().expect("session mutex poisoned") = session.clone();
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionStoreError> {
        *self.session.lock().expect("session mutex poisoned") = Session::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rads_catalog::types::{CredentialToken, UserProfile};

    use super::*;

    fn logged_in() -> Session {
        Session {
            token: Some(CredentialToken::new("gho_stored")),
            user: Some(UserProfile {
                login: "octocat".to_string(),
                name: Some("The Octocat".to_string()),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn missing_file_is_empty_session() {
        let tempdir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(tempdir.path());
        assert_eq!(store.load().unwrap(), Session::default());
    }

    #[test]
    fn file_store_round_trips_session() {
        let tempdir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(tempdir.path().join("nested"));

        store.save(&logged_in()).unwrap();
        assert_eq!(store.load().unwrap(), logged_in());

        store.clear().unwrap();
        assert!(!store.path().exists());
        assert_eq!(store.load().unwrap(), Session::default());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let tempdir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(tempdir.path());
        fs::write(store.path(), "{ not json").unwrap();
        assert!(matches!(store.load(), Err(SessionStoreError::Parse { .. })));
    }

    #[test]
    fn memory_store_clear_resets() {
        let store = MemorySessionStore::new(logged_in());
        store.clear().unwrap();
        assert!(!store.load().unwrap().is_authenticated());
    }
}
