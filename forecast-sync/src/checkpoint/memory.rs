use std::sync::Arc;
use tokio::sync::Mutex;

use crate::bail;
use crate::checkpoint::base::CheckpointStore;
use crate::error::{ErrorKind, SyncResult};
use crate::types::SyncCheckpoint;

#[derive(Debug, Default)]
struct Inner {
    checkpoints: Vec<SyncCheckpoint>,
    fail_appends: bool,
}

/// In-memory [`CheckpointStore`], newest row last.
#[derive(Debug, Clone, Default)]
pub struct MemoryCheckpointStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following append fail.
    pub async fn fail_appends(&self) {
        self.inner.lock().await.fail_appends = true;
    }

    /// Every appended row, oldest first.
    pub async fn checkpoints(&self) -> Vec<SyncCheckpoint> {
        self.inner.lock().await.checkpoints.clone()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    async fn create_schema(&self) -> SyncResult<()> {
        Ok(())
    }

    async fn latest_successful(&self) -> SyncResult<Option<SyncCheckpoint>> {
        let inner = self.inner.lock().await;
        let latest = inner
            .checkpoints
            .iter()
            .rev()
            .find(|checkpoint| checkpoint.is_success())
            .cloned();

        Ok(latest)
    }

    async fn append(&self, checkpoint: SyncCheckpoint) -> SyncResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.fail_appends {
            bail!(
                ErrorKind::CheckpointFailed,
                "Failed to append the checkpoint",
                "injected append failure"
            );
        }

        inner.checkpoints.push(checkpoint);

        Ok(())
    }
}
