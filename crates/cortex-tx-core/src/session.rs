//! Session collaborators injected into the dispatcher: where the bearer token
//! lives, and how the user is sent back to authentication.

use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Source of the bearer token attached to outbound requests.
///
/// Lives from process start until an explicit logout (or a 401 clears it).
pub trait CredentialsProvider: Send + Sync {
    /// Current token, if the user is logged in.
    fn token(&self) -> Option<String>;
    /// Forget the stored token.
    fn clear(&self);
}

/// Sends the user to another location (the authentication entry point).
pub trait Navigator: Send + Sync {
    fn redirect(&self, location: &str);
}

/// Token held in memory only.
#[derive(Debug, Default)]
pub struct MemoryCredentials {
    token: RwLock<Option<String>>,
}

impl MemoryCredentials {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }

    pub fn set(&self, token: impl Into<String>) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = Some(token.into());
    }
}

impl CredentialsProvider for MemoryCredentials {
    fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .filter(|t| !t.is_empty())
    }

    fn clear(&self) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

/// Token persisted in a file (by default under the XDG state dir).
#[derive(Debug, Clone)]
pub struct FileCredentials {
    path: PathBuf,
}

impl FileCredentials {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.local/state/cortex-tx/token`.
    pub fn default_path() -> Result<PathBuf> {
        let dir = xdg::BaseDirectories::with_prefix("cortex-tx")?.get_state_home();
        Ok(dir.join("token"))
    }

    pub fn open_default() -> Result<Self> {
        Ok(Self::at(Self::default_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist `token` (login).
    pub fn store(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&self.path, token.trim())
            .with_context(|| format!("write token to {}", self.path.display()))?;
        Ok(())
    }
}

impl CredentialsProvider for FileCredentials {
    fn token(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(s) => Some(s.trim().to_string()).filter(|t| !t.is_empty()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!("could not read token from {}: {}", self.path.display(), e);
                None
            }
        }
    }

    fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::info!("cleared stored token at {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("could not remove token {}: {}", self.path.display(), e),
        }
    }
}

/// Navigator that only records the redirect in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn redirect(&self, location: &str) {
        tracing::warn!("authentication required; redirecting to {}", location);
    }
}
