use chrono::NaiveDate;
use std::sync::Arc;
use tokio_postgres::types::ToSql;
use tracing::info;

use crate::clients::postgres::PgSession;
use crate::destination::base::Destination;
use crate::error::{ErrorKind, SyncResult};
use crate::sync_error;
use crate::types::ForecastRecord;

/// Forecast table, its indexes and the trigger keeping `updated_at` current on direct updates.
const CREATE_FORECAST_SCHEMA: &str = r#"
    create table if not exists forecast_data (
        id serial primary key,
        restaurant_id integer not null,
        inventory_item_id integer not null,
        business_date date not null,
        dma_id varchar(50),
        dc_id integer,
        state varchar(2) not null,
        y_05 decimal(10, 2),
        y_50 decimal(10, 2) not null,
        y_95 decimal(10, 2),
        created_at timestamp default current_timestamp,
        updated_at timestamp default current_timestamp,
        unique (restaurant_id, inventory_item_id, business_date)
    );

    create index if not exists idx_forecast_business_date on forecast_data (business_date);
    create index if not exists idx_forecast_state on forecast_data (state);
    create index if not exists idx_forecast_state_date on forecast_data (state, business_date);
    create index if not exists idx_forecast_dma on forecast_data (dma_id) where dma_id is not null;
    create index if not exists idx_forecast_dc on forecast_data (dc_id) where dc_id is not null;
    create index if not exists idx_forecast_restaurant on forecast_data (restaurant_id);
    create index if not exists idx_forecast_inventory on forecast_data (inventory_item_id);
    create index if not exists idx_forecast_composite
        on forecast_data (state, dma_id, dc_id, business_date);

    create or replace function update_updated_at_column()
    returns trigger as $$
    begin
        new.updated_at = current_timestamp;
        return new;
    end;
    $$ language plpgsql;

    drop trigger if exists update_forecast_data_updated_at on forecast_data;
    create trigger update_forecast_data_updated_at
        before update on forecast_data
        for each row execute function update_updated_at_column();
"#;

/// Multi-row upsert of one batch, passed as one array per column.
const UPSERT_FORECAST_BATCH: &str = r#"
    insert into forecast_data (
        restaurant_id, inventory_item_id, business_date,
        dma_id, dc_id, state, y_05, y_50, y_95
    )
    select * from unnest(
        $1::int8[], $2::int8[], $3::date[],
        $4::text[], $5::int8[], $6::text[],
        $7::float8[], $8::float8[], $9::float8[]
    )
    on conflict (restaurant_id, inventory_item_id, business_date)
    do update set
        dma_id = excluded.dma_id,
        dc_id = excluded.dc_id,
        state = excluded.state,
        y_05 = excluded.y_05,
        y_50 = excluded.y_50,
        y_95 = excluded.y_95,
        updated_at = current_timestamp
"#;

/// Column-wise view of a batch, bound as the nine array parameters of the upsert.
#[derive(Debug, Default)]
struct ForecastColumns {
    restaurant_ids: Vec<i64>,
    inventory_item_ids: Vec<i64>,
    business_dates: Vec<NaiveDate>,
    dma_ids: Vec<Option<String>>,
    dc_ids: Vec<Option<i64>>,
    states: Vec<String>,
    y_05: Vec<Option<f64>>,
    y_50: Vec<f64>,
    y_95: Vec<Option<f64>>,
}

impl ForecastColumns {
    fn from_batch(batch: Vec<ForecastRecord>) -> Self {
        let mut columns = ForecastColumns::default();
        for record in batch {
            columns.restaurant_ids.push(record.restaurant_id);
            columns.inventory_item_ids.push(record.inventory_item_id);
            columns.business_dates.push(record.business_date);
            columns.dma_ids.push(record.dma_id);
            columns.dc_ids.push(record.dc_id);
            columns.states.push(record.state);
            columns.y_05.push(record.y_05);
            columns.y_50.push(record.y_50);
            columns.y_95.push(record.y_95);
        }

        columns
    }

    fn params(&self) -> [&(dyn ToSql + Sync); 9] {
        [
            &self.restaurant_ids,
            &self.inventory_item_ids,
            &self.business_dates,
            &self.dma_ids,
            &self.dc_ids,
            &self.states,
            &self.y_05,
            &self.y_50,
            &self.y_95,
        ]
    }
}

/// [`Destination`] writing into the `forecast_data` table of a Postgres database.
#[derive(Clone)]
pub struct PostgresDestination {
    session: Arc<PgSession>,
}

impl PostgresDestination {
    pub fn new(session: Arc<PgSession>) -> Self {
        Self { session }
    }
}

impl Destination for PostgresDestination {
    async fn create_schema(&self) -> SyncResult<()> {
        let mut client = self.session.client().await;
        let transaction = client.transaction().await?;
        transaction
            .batch_execute(CREATE_FORECAST_SCHEMA)
            .await
            .map_err(|err| {
                sync_error!(
                    ErrorKind::DestinationSchemaError,
                    "Failed to create the forecast schema",
                    err
                )
            })?;
        transaction.commit().await?;

        info!("forecast schema is in place");

        Ok(())
    }

    async fn upsert_batches(&self, batches: Vec<Vec<ForecastRecord>>) -> SyncResult<()> {
        let batch_count = batches.len();
        let mut client = self.session.client().await;

        // Dropping the transaction without committing rolls every batch back.
        let transaction = client.transaction().await.map_err(|err| {
            sync_error!(ErrorKind::WriteFailed, "Failed to open the write transaction", err)
        })?;
        let statement = transaction.prepare(UPSERT_FORECAST_BATCH).await.map_err(|err| {
            sync_error!(ErrorKind::WriteFailed, "Failed to prepare the forecast upsert", err)
        })?;

        for (index, batch) in batches.into_iter().enumerate() {
            let records = batch.len();
            let columns = ForecastColumns::from_batch(batch);
            let affected = transaction
                .execute(&statement, &columns.params())
                .await
                .map_err(|err| {
                    sync_error!(
                        ErrorKind::WriteFailed,
                        "Forecast batch upsert failed",
                        format!("batch {} of {batch_count}: {err}", index + 1)
                    )
                })?;

            info!(batch = index + 1, batch_count, records, affected, "upserted forecast batch");
        }

        transaction.commit().await.map_err(|err| {
            sync_error!(ErrorKind::WriteFailed, "Failed to commit the forecast batches", err)
        })?;

        Ok(())
    }
}
