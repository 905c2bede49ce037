use std::future::Future;

use crate::error::SyncResult;
use crate::types::SyncCheckpoint;

/// Storage of [`SyncCheckpoint`] rows.
///
/// Rows are only ever appended. Implementations never update or delete an existing row.
pub trait CheckpointStore {
    /// Creates the checkpoint table when missing.
    fn create_schema(&self) -> impl Future<Output = SyncResult<()>> + Send;

    /// Returns the most recent successful checkpoint, if any run succeeded yet.
    fn latest_successful(&self) -> impl Future<Output = SyncResult<Option<SyncCheckpoint>>> + Send;

    /// Appends a new checkpoint row.
    fn append(&self, checkpoint: SyncCheckpoint) -> impl Future<Output = SyncResult<()>> + Send;
}
