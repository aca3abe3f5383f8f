//! Durable session storage: one JSON file holding the token, identity,
//! and restore-target, written and cleared as a unit.

use std::path::{Path, PathBuf};

use reviewcheck_client_core::{PersistedSession, SessionStore};

pub const ENV_SESSION_PATH: &str = "REVIEWCHECK_SESSION_PATH";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("HOME is not set and {ENV_SESSION_PATH} is empty")]
    NoHome,
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
    #[error("session file {path} is not valid JSON: {source}")]
    Decode {
        path: String,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location: `$REVIEWCHECK_SESSION_PATH`, else
    /// `$HOME/.reviewcheck/session.json`.
    pub fn from_env() -> Result<Self, StoreError> {
        if let Ok(override_path) = std::env::var(ENV_SESSION_PATH) {
            let trimmed = override_path.trim();
            if !trimmed.is_empty() {
                return Ok(Self::new(trimmed));
            }
        }
        let home = std::env::var("HOME").map_err(|_| StoreError::NoHome)?;
        Ok(Self::new(
            PathBuf::from(home).join(".reviewcheck").join("session.json"),
        ))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    type Error = StoreError;

    fn load_session(&self) -> Result<Option<PersistedSession>, Self::Error> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path).map_err(|source| StoreError::Read {
            path: self.path.display().to_string(),
            source,
        })?;
        let session = serde_json::from_str(&raw).map_err(|source| StoreError::Decode {
            path: self.path.display().to_string(),
            source,
        })?;
        Ok(Some(session))
    }

    fn persist_session(&self, session: &PersistedSession) -> Result<(), Self::Error> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let raw = serde_json::to_string_pretty(session).map_err(|source| StoreError::Decode {
            path: self.path.display().to_string(),
            source,
        })?;
        std::fs::write(&self.path, raw).map_err(|source| StoreError::Write {
            path: self.path.display().to_string(),
            source,
        })?;

        // The token is a credential; keep the file owner-only.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600)).map_err(
                |source| StoreError::Write {
                    path: self.path.display().to_string(),
                    source,
                },
            )?;
        }
        Ok(())
    }

    fn clear_session(&self) -> Result<(), Self::Error> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Write {
                path: self.path.display().to_string(),
                source,
            }),
        }
    }
}
