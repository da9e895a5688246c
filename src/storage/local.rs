//! Local filesystem run state.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::storage::{RunState, StateStore};

/// Append-only state file on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalStateStore {
    path: PathBuf,
}

impl LocalStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl StateStore for LocalStateStore {
    async fn load(&self) -> RunState {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => RunState::from_lines(&String::from_utf8_lossy(&bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No run state at {}; starting fresh", self.path.display());
                RunState::new()
            }
            Err(e) => {
                log::warn!(
                    "Could not read run state {}: {}. Treating as empty.",
                    self.path.display(),
                    e
                );
                RunState::new()
            }
        }
    }

    async fn append(&self, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        self.ensure_dir().await?;

        let mut buffer = String::new();
        for key in keys.iter().filter(|k| !k.trim().is_empty()) {
            buffer.push_str(key.trim());
            buffer.push('\n');
        }

        // Single write so a crash never leaves a half-written key.
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(buffer.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
