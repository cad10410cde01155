//! Sync state file on the local filesystem.

use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::models::SyncState;
use crate::utils::fs::write_atomic;

/// Durable home of the [`SyncState`].
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load state; a missing file is empty state, a corrupt one is reset with a warning.
    pub async fn load(&self) -> Result<SyncState> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No state file at {}, starting fresh", self.path.display());
                return Ok(SyncState::default());
            }
            Err(e) => return Err(AppError::Io(e)),
        };

        match serde_json::from_slice(&bytes) {
            Ok(state) => Ok(state),
            Err(e) => {
                log::warn!(
                    "State file {} is unreadable ({e}); resetting to empty state",
                    self.path.display()
                );
                Ok(SyncState::default())
            }
        }
    }

    /// Write state atomically (temp file, then rename).
    pub async fn save(&self, state: &SyncState) -> Result<()> {
        let mut bytes = serde_json::to_vec_pretty(state)?;
        bytes.push(b'\n');
        write_atomic(&self.path, &bytes).await
    }
}
