use crate::recording::recorder::RecordingBlob;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

/// Destination of finished recordings.
#[async_trait]
pub trait RecordingStore: Send + Sync {
    async fn upload(&self, blob: RecordingBlob) -> Result<()>;
}

/// Writes each recording as `recording-<uuid>.gcrec` under a directory.
#[derive(Debug, Clone)]
pub struct DirectoryRecordingStore {
    dir: PathBuf,
}

impl DirectoryRecordingStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl RecordingStore for DirectoryRecordingStore {
    async fn upload(&self, blob: RecordingBlob) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let path = self.dir.join(format!("recording-{}.gcrec", Uuid::new_v4()));
        tokio::fs::write(&path, &blob.data)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        info!(
            "Recording saved to {} ({} bytes, {})",
            path.display(),
            blob.len(),
            blob.mime_type
        );
        Ok(())
    }
}
