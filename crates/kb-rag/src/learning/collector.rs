//! Append-only learning data file consumed by the fine-tuning job

use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{Error, Result};

/// Collects learning snippets, one per line
pub struct LearningDataCollector {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl LearningDataCollector {
    /// Create a collector writing to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the learning data file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one snippet as a single line and flush it to disk.
    ///
    /// Line breaks inside the snippet are folded into spaces so every
    /// snippet stays on its own line.
    pub async fn append(&self, text: &str) -> Result<()> {
        let line = text.trim();
        if line.is_empty() {
            return Err(Error::validation("learning text must not be empty"));
        }
        let line = line.replace(['\r', '\n'], " ");

        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{}\n", line).as_bytes()).await?;
        file.sync_data().await?;

        tracing::info!("Appended learning data to {}", self.path.display());
        Ok(())
    }
}
