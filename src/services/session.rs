use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// What survives a restart: the access token, the chosen spreadsheet and the
/// auto-sync toggle, stored under camelCase keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "accessToken", default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(rename = "spreadsheetId", default, skip_serializing_if = "Option::is_none")]
    pub spreadsheet_id: Option<String>,
    #[serde(rename = "autoSync", default)]
    pub auto_sync: bool,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> AppResult<Session>;
    async fn save(&self, session: &Session) -> AppResult<()>;
}

/// Session kept in a JSON file.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> AppResult<Session> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Session::default()),
            Err(e) => {
                return Err(AppError::Internal(anyhow::anyhow!(
                    "Failed to read session file {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        match serde_json::from_str(&raw) {
            Ok(session) => Ok(session),
            Err(e) => {
                tracing::warn!(
                    "Ignoring unreadable session file {}: {}",
                    self.path.display(),
                    e
                );
                Ok(Session::default())
            }
        }
    }

    async fn save(&self, session: &Session) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    anyhow::anyhow!(
                        "Failed to create session directory {}: {}",
                        parent.display(),
                        e
                    )
                })?;
            }
        }

        let json = serde_json::to_string_pretty(session)
            .map_err(|e| anyhow::anyhow!("Failed to serialize session: {}", e))?;
        tokio::fs::write(&self.path, json).await.map_err(|e| {
            anyhow::anyhow!("Failed to write session file {}: {}", self.path.display(), e)
        })?;
        Ok(())
    }
}

/// Session kept in memory only.
#[derive(Default)]
pub struct MemorySessionStore {
    session: Mutex<Session>,
}

impl MemorySessionStore {
    pub fn new(session: Session) -> Self {
        Self {
            session: Mutex::new(session),
        }
    }

    pub fn snapshot(&self) -> Session {
        self.session
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> AppResult<Session> {
        Ok(self.snapshot())
    }

    async fn save(&self, session: &Session) -> AppResult<()> {
        *self.session.lock().unwrap_or_else(|e| e.into_inner()) = session.clone();
        Ok(())
    }
}
