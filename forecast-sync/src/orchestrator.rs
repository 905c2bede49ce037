use chrono::NaiveDate;
use tracing::{error, info, warn};

use crate::analytics::{QueryEngine, QueryExecutor};
use crate::checkpoint::{CheckpointStore, CheckpointTracker};
use crate::decoder::decode_records;
use crate::destination::Destination;
use crate::error::{ErrorKind, SyncError, SyncResult};
use crate::strategy::StrategySelector;
use crate::sync_error;
use crate::types::{SyncCheckpoint, SyncMode, SyncOutcome, SyncStatus};
use crate::writer::BatchUpsertWriter;

/// Runs one sync from the analytical source into the destination and records the outcome.
#[derive(Debug)]
pub struct SyncOrchestrator<E, D, C> {
    executor: QueryExecutor<E>,
    writer: BatchUpsertWriter<D>,
    tracker: CheckpointTracker<C>,
    source_table: String,
    batch_size: usize,
}

impl<E, D, C> SyncOrchestrator<E, D, C>
where
    E: QueryEngine,
    D: Destination,
    C: CheckpointStore,
{
    pub fn new(
        executor: QueryExecutor<E>,
        destination: D,
        checkpoints: C,
        source_table: impl Into<String>,
        batch_size: usize,
    ) -> Self {
        Self {
            executor,
            writer: BatchUpsertWriter::new(destination),
            tracker: CheckpointTracker::new(checkpoints),
            source_table: source_table.into(),
            batch_size,
        }
    }

    pub fn executor(&self) -> &QueryExecutor<E> {
        &self.executor
    }

    pub fn destination(&self) -> &D {
        self.writer.destination()
    }

    pub fn tracker(&self) -> &CheckpointTracker<C> {
        &self.tracker
    }

    /// Creates the forecast table and the sync log when missing.
    pub async fn create_schema(&self) -> SyncResult<()> {
        self.writer.destination().create_schema().await?;
        self.tracker.create_schema().await?;
        info!("forecast schema is ready");

        Ok(())
    }

    /// Syncs the source into the destination.
    ///
    /// Exactly one checkpoint row is appended per call: a success row carrying the highest
    /// business date now stored, or a failed row with the error message. The error of the run is
    /// returned even when its failed row could not be written.
    ///
    /// When the records were committed but the success row could not be appended, the returned
    /// error aggregates a [`ErrorKind::CheckpointFailed`] error saying so with the append error.
    pub async fn sync(&self, mode: SyncMode) -> SyncResult<SyncOutcome> {
        info!(%mode, source_table = %self.source_table, "starting forecast sync");

        let checkpoint = self.tracker.current().await;

        match self.transfer(mode, checkpoint.as_ref()).await {
            Ok((records_synced, last_sync_date)) => {
                if let Err(record_err) = self
                    .tracker
                    .record_outcome(
                        mode,
                        SyncStatus::Success,
                        records_synced,
                        last_sync_date,
                        None,
                    )
                    .await
                {
                    error!(
                        %mode,
                        records_synced,
                        error = %record_err,
                        "forecast records were committed but the sync could not be recorded"
                    );

                    return Err(SyncError::many(vec![
                        sync_error!(
                            ErrorKind::CheckpointFailed,
                            "Forecast records were committed but the sync was not recorded",
                            format!("{records_synced} records committed")
                        ),
                        record_err,
                    ]));
                }

                info!(%mode, records_synced, ?last_sync_date, "forecast sync succeeded");
                Ok(SyncOutcome {
                    mode,
                    records_synced,
                    last_sync_date,
                })
            }
            Err(err) => {
                error!(%mode, error = %err, "forecast sync failed");
                self.record_failure(mode, &err).await;

                Err(err)
            }
        }
    }

    /// Prepares the schema, then syncs.
    ///
    /// A schema failure is logged to the sync log when the log itself is usable.
    pub async fn run(&self, mode: SyncMode) -> SyncResult<SyncOutcome> {
        if let Err(err) = self.create_schema().await {
            error!(%mode, error = %err, "could not prepare the forecast schema");
            self.record_failure(mode, &err).await;

            return Err(err);
        }

        self.sync(mode).await
    }

    /// Reads the planned rows and writes them, returning the written count and the checkpoint
    /// date to store.
    async fn transfer(
        &self,
        mode: SyncMode,
        checkpoint: Option<&SyncCheckpoint>,
    ) -> SyncResult<(u64, Option<NaiveDate>)> {
        let previous_date = checkpoint.and_then(|checkpoint| checkpoint.last_sync_date);
        let plan = StrategySelector::new(&self.executor, &self.source_table)
            .plan(mode, checkpoint)
            .await?;

        let Some(query) = plan.data_query(&self.source_table) else {
            return Ok((0, previous_date));
        };

        let result = self.executor.submit_and_fetch(&query).await?;
        let records = decode_records(&result)?;
        info!(records = records.len(), ?plan, "fetched forecast rows");

        let written = self.writer.write(&records, self.batch_size).await?;
        let last_sync_date = records
            .iter()
            .map(|record| record.business_date)
            .max()
            .max(previous_date);

        Ok((written, last_sync_date))
    }

    async fn record_failure(&self, mode: SyncMode, err: &SyncError) {
        if let Err(record_err) = self
            .tracker
            .record_outcome(mode, SyncStatus::Failed, 0, None, Some(err))
            .await
        {
            warn!(error = %record_err, "could not record the failed sync");
        }
    }
}
