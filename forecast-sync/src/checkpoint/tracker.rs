use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use crate::checkpoint::base::CheckpointStore;
use crate::error::{SyncError, SyncResult};
use crate::types::{SyncCheckpoint, SyncMode, SyncStatus};

/// Sole writer of the sync log.
///
/// Every run, successful or not, adds one row. The row of a successful run carries the highest
/// business date it wrote, which bounds the next incremental run.
#[derive(Debug, Clone)]
pub struct CheckpointTracker<C> {
    store: C,
}

impl<C> CheckpointTracker<C>
where
    C: CheckpointStore,
{
    pub fn new(store: C) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &C {
        &self.store
    }

    pub async fn create_schema(&self) -> SyncResult<()> {
        self.store.create_schema().await
    }

    /// Returns the checkpoint the next run starts from.
    ///
    /// A log that cannot be read is treated as empty: the run then covers the whole source, which
    /// the idempotent upsert makes safe.
    pub async fn current(&self) -> Option<SyncCheckpoint> {
        match self.store.latest_successful().await {
            Ok(checkpoint) => checkpoint,
            Err(err) => {
                warn!(error = %err, "could not read the last checkpoint, assuming none");
                None
            }
        }
    }

    /// Appends the outcome of a run.
    pub async fn record_outcome(
        &self,
        mode: SyncMode,
        status: SyncStatus,
        records_synced: u64,
        max_date: Option<NaiveDate>,
        error: Option<&SyncError>,
    ) -> SyncResult<SyncCheckpoint> {
        let checkpoint = SyncCheckpoint {
            sync_type: mode,
            last_sync_timestamp: Utc::now(),
            last_sync_date: max_date,
            records_synced,
            status,
            error_message: error.map(ToString::to_string),
        };

        self.store.append(checkpoint.clone()).await?;
        info!(
            sync_type = %mode,
            %status,
            records_synced,
            last_sync_date = ?max_date,
            "recorded sync checkpoint"
        );

        Ok(checkpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::memory::MemoryCheckpointStore;
    use crate::error::ErrorKind;
    use crate::sync_error;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[tokio::test]
    async fn test_current_is_latest_success() {
        let tracker = CheckpointTracker::new(MemoryCheckpointStore::new());
        assert_eq!(tracker.current().await, None);

        tracker
            .record_outcome(SyncMode::Full, SyncStatus::Success, 10, Some(date(1)), None)
            .await
            .unwrap();
        tracker
            .record_outcome(SyncMode::Incremental, SyncStatus::Success, 4, Some(date(2)), None)
            .await
            .unwrap();
        let err = sync_error!(ErrorKind::QueryTimeout, "Athena query did not finish");
        tracker
            .record_outcome(SyncMode::Incremental, SyncStatus::Failed, 0, None, Some(&err))
            .await
            .unwrap();

        let current = tracker.current().await.unwrap();
        assert_eq!(current.last_sync_date, Some(date(2)));
        assert_eq!(current.records_synced, 4);
    }

    #[tokio::test]
    async fn test_every_outcome_is_appended() {
        let tracker = CheckpointTracker::new(MemoryCheckpointStore::new());
        let err = sync_error!(ErrorKind::WriteFailed, "Forecast batch upsert failed", "boom");

        tracker
            .record_outcome(SyncMode::Full, SyncStatus::Failed, 0, None, Some(&err))
            .await
            .unwrap();
        tracker
            .record_outcome(SyncMode::Full, SyncStatus::Success, 3, Some(date(3)), None)
            .await
            .unwrap();

        let checkpoints = tracker.store().checkpoints().await;
        assert_eq!(checkpoints.len(), 2);
        assert_eq!(checkpoints[0].status, SyncStatus::Failed);
        assert!(checkpoints[0]
            .error_message
            .as_deref()
            .unwrap()
            .contains("boom"));
        assert_eq!(checkpoints[1].error_message, None);
    }
}
