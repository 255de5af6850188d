//! Session token storage.
//!
//! Defines the `SessionStore` trait and provides an in-memory store (tests,
//! one-shot runs) and a JSON file store that survives restarts. Tokens are
//! kept as `SecretString` and never logged.

pub mod jwt;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, info, warn};

/// Where the session token lives between requests.
#[cfg_attr(test, mockall::automock)]
pub trait SessionStore: Send + Sync {
    /// Persist a freshly issued token, replacing any previous one.
    fn save(&self, token: SecretString) -> Result<()>;

    /// Forget the session (logout).
    fn clear(&self) -> Result<()>;

    /// The stored token, if any, regardless of expiry.
    fn get(&self) -> Option<SecretString>;

    /// Whether a stored token exists and its `exp` claim is in the future.
    fn is_active(&self) -> bool {
        self.get()
            .map(|token| jwt::is_unexpired(token.expose_secret(), Utc::now()))
            .unwrap_or(false)
    }
}

fn copy_secret(secret: &SecretString) -> SecretString {
    SecretString::new(secret.expose_secret().clone())
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Session held for the lifetime of the process.
#[derive(Default)]
pub struct MemorySessionStore {
    token: RwLock<Option<SecretString>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            token: RwLock::new(Some(SecretString::new(token.to_string()))),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn save(&self, token: SecretString) -> Result<()> {
        let mut guard = self
            .token
            .write()
            .map_err(|_| anyhow::anyhow!("Session lock poisoned"))?;
        *guard = Some(token);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self
            .token
            .write()
            .map_err(|_| anyhow::anyhow!("Session lock poisoned"))?;
        *guard = None;
        Ok(())
    }

    fn get(&self) -> Option<SecretString> {
        self.token.read().ok()?.as_ref().map(copy_secret)
    }
}

// ---------------------------------------------------------------------------
// File store
// ---------------------------------------------------------------------------

/// Default session file path.
pub const DEFAULT_SESSION_FILE: &str = "underline_session.json";

#[derive(Serialize, Deserialize)]
struct SessionFile {
    jwt: String,
    saved_at: DateTime<Utc>,
}

/// Session persisted as a small JSON file.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: Option<&str>) -> Self {
        Self {
            path: PathBuf::from(path.unwrap_or(DEFAULT_SESSION_FILE)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Option<SessionFile>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session from {}", self.path.display()))?;
        let file: SessionFile = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse session from {}", self.path.display()))?;
        Ok(Some(file))
    }
}

impl SessionStore for FileSessionStore {
    fn save(&self, token: SecretString) -> Result<()> {
        let file = SessionFile {
            jwt: token.expose_secret().clone(),
            saved_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&file).context("Failed to serialise session")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write session to {}", self.path.display()))?;

        info!(path = %self.path.display(), "Session saved");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("Failed to delete session file {}", self.path.display()))?;
            info!(path = %self.path.display(), "Session cleared");
        }
        Ok(())
    }

    fn get(&self) -> Option<SecretString> {
        match self.load() {
            Ok(Some(file)) => Some(SecretString::new(file.jwt)),
            Ok(None) => {
                debug!(path = %self.path.display(), "No saved session");
                None
            }
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable session file");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
