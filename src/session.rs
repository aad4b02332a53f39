use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;

use crate::models::{Session, User};

const TOKEN_FILE: &str = "token";
const USER_FILE: &str = "user.json";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to remove {}: {source}", .path.display())]
    Remove { path: PathBuf, source: io::Error },
    #[error("failed to encode user record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Process-wide handle on the persisted session (token + user record).
///
/// Cloning is cheap; every clone shares the same directory and the same
/// change notifications. Views that must react to logout hold a receiver
/// from [`SessionStore::subscribe`].
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

struct Inner {
    dir: PathBuf,
    changes: watch::Sender<Option<Session>>,
}

impl SessionStore {
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let current = read_session(&dir);
        let (changes, _) = watch::channel(current);
        Self {
            inner: Arc::new(Inner { dir, changes }),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    /// Current session as persisted on disk. A store holding only one of the
    /// token and user record reads as absent.
    pub fn get(&self) -> Option<Session> {
        read_session(&self.inner.dir)
    }

    pub fn token(&self) -> Option<String> {
        read_token(&self.inner.dir)
    }

    pub fn save(&self, session: &Session) -> Result<(), SessionError> {
        std::fs::create_dir_all(&self.inner.dir).map_err(|source| SessionError::Write {
            path: self.inner.dir.clone(),
            source,
        })?;
        let user_json = serde_json::to_string_pretty(&session.user)?;

        let user_path = self.inner.dir.join(USER_FILE);
        std::fs::write(&user_path, user_json).map_err(|source| SessionError::Write {
            path: user_path,
            source,
        })?;

        let token_path = self.inner.dir.join(TOKEN_FILE);
        if let Err(source) = std::fs::write(&token_path, &session.token) {
            // Never leave a user record behind without its token.
            let _ = std::fs::remove_file(self.inner.dir.join(USER_FILE));
            return Err(SessionError::Write { path: token_path, source });
        }

        tracing::debug!(user = %session.user.email, role = %session.role(), "session saved");
        self.inner.changes.send_replace(Some(session.clone()));
        Ok(())
    }

    /// Remove both halves of the session. Succeeds when nothing is stored.
    pub fn clear(&self) -> Result<(), SessionError> {
        for name in [TOKEN_FILE, USER_FILE] {
            let path = self.inner.dir.join(name);
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => return Err(SessionError::Remove { path, source }),
            }
        }
        tracing::debug!("session cleared");
        self.inner.changes.send_replace(None);
        Ok(())
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.inner.changes.subscribe()
    }
}

fn read_token(dir: &Path) -> Option<String> {
    let token = std::fs::read_to_string(dir.join(TOKEN_FILE)).ok()?;
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn read_user(dir: &Path) -> Option<User> {
    let raw = std::fs::read_to_string(dir.join(USER_FILE)).ok()?;
    match serde_json::from_str(&raw) {
        Ok(user) => Some(user),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unreadable user record");
            None
        }
    }
}

fn read_session(dir: &Path) -> Option<Session> {
    let token = read_token(dir)?;
    let user = read_user(dir)?;
    Some(Session { token, user })
}
