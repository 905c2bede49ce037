use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;
use tracing::debug;

use crate::checkpoint::base::CheckpointStore;
use crate::clients::postgres::PgSession;
use crate::error::{ErrorKind, SyncResult};
use crate::sync_error;
use crate::types::SyncCheckpoint;

const CREATE_CHECKPOINT_TABLE: &str = r#"
    create table if not exists forecast_sync_status (
        id serial primary key,
        sync_type varchar(50) not null,
        last_sync_timestamp timestamp not null,
        last_sync_date date,
        records_synced integer default 0,
        status varchar(20) not null,
        error_message text,
        created_at timestamp default current_timestamp
    )
"#;

/// [`CheckpointStore`] backed by the `forecast_sync_status` table.
///
/// Timestamps are stored as UTC in `timestamp` columns.
#[derive(Clone)]
pub struct PostgresCheckpointStore {
    session: Arc<PgSession>,
}

impl PostgresCheckpointStore {
    pub fn new(session: Arc<PgSession>) -> Self {
        Self { session }
    }
}

impl CheckpointStore for PostgresCheckpointStore {
    async fn create_schema(&self) -> SyncResult<()> {
        let client = self.session.client().await;
        client
            .batch_execute(CREATE_CHECKPOINT_TABLE)
            .await
            .map_err(|err| {
                sync_error!(
                    ErrorKind::DestinationSchemaError,
                    "Failed to create the checkpoint table",
                    err
                )
            })?;

        Ok(())
    }

    async fn latest_successful(&self) -> SyncResult<Option<SyncCheckpoint>> {
        let client = self.session.client().await;
        let row = client
            .query_opt(
                r#"
                select sync_type, last_sync_timestamp, last_sync_date, records_synced, status, error_message
                from forecast_sync_status
                where status = 'success'
                order by created_at desc, id desc
                limit 1
                "#,
                &[],
            )
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let sync_type: String = row.try_get("sync_type")?;
        let last_sync_timestamp: NaiveDateTime = row.try_get("last_sync_timestamp")?;
        let last_sync_date: Option<NaiveDate> = row.try_get("last_sync_date")?;
        let records_synced: Option<i32> = row.try_get("records_synced")?;
        let status: String = row.try_get("status")?;

        let checkpoint = SyncCheckpoint {
            sync_type: sync_type.parse()?,
            last_sync_timestamp: last_sync_timestamp.and_utc(),
            last_sync_date,
            records_synced: records_synced.unwrap_or_default().max(0) as u64,
            status: status.parse()?,
            error_message: row.try_get("error_message")?,
        };
        debug!(?checkpoint, "loaded latest successful checkpoint");

        Ok(Some(checkpoint))
    }

    async fn append(&self, checkpoint: SyncCheckpoint) -> SyncResult<()> {
        let records_synced = i32::try_from(checkpoint.records_synced).map_err(|_| {
            sync_error!(
                ErrorKind::CheckpointFailed,
                "Record count does not fit the checkpoint table",
                checkpoint.records_synced
            )
        })?;

        let client = self.session.client().await;
        client
            .execute(
                r#"
                insert into forecast_sync_status
                    (sync_type, last_sync_timestamp, last_sync_date, records_synced, status, error_message)
                values ($1, $2, $3, $4, $5, $6)
                "#,
                &[
                    &checkpoint.sync_type.as_str(),
                    &checkpoint.last_sync_timestamp.naive_utc(),
                    &checkpoint.last_sync_date,
                    &records_synced,
                    &checkpoint.status.as_str(),
                    &checkpoint.error_message,
                ],
            )
            .await
            .map_err(|err| {
                sync_error!(ErrorKind::CheckpointFailed, "Failed to append the checkpoint", err)
            })?;

        Ok(())
    }
}
