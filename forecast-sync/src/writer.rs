use std::collections::HashMap;
use tracing::{debug, info};

use crate::bail;
use crate::destination::Destination;
use crate::error::{ErrorKind, SyncResult};
use crate::types::{ForecastKey, ForecastRecord};

/// Splits records into fixed-size batches and hands them to the [`Destination`] as one
/// transactional write.
#[derive(Debug, Clone)]
pub struct BatchUpsertWriter<D> {
    destination: D,
}

impl<D> BatchUpsertWriter<D>
where
    D: Destination,
{
    pub fn new(destination: D) -> Self {
        Self { destination }
    }

    pub fn destination(&self) -> &D {
        &self.destination
    }

    /// Writes `records` in batches of `batch_size` and returns how many records were written.
    ///
    /// Either every batch is committed or none is.
    pub async fn write(&self, records: &[ForecastRecord], batch_size: usize) -> SyncResult<u64> {
        if batch_size == 0 {
            bail!(ErrorKind::ConfigError, "Batch size must be greater than zero");
        }

        if records.is_empty() {
            info!("no forecast records to write");
            return Ok(0);
        }

        let batches = partition(records, batch_size);
        let batch_count = batches.len();
        self.destination.upsert_batches(batches).await?;

        let written = records.len() as u64;
        info!(written, batch_count, batch_size, "wrote forecast records");

        Ok(written)
    }
}

/// Cuts `records` into consecutive batches of at most `batch_size`.
///
/// Within a batch a natural key appears once, holding the values of its last occurrence, since a
/// single upsert statement cannot touch the same row twice.
pub fn partition(records: &[ForecastRecord], batch_size: usize) -> Vec<Vec<ForecastRecord>> {
    records
        .chunks(batch_size)
        .map(|chunk| {
            let mut positions: HashMap<ForecastKey, usize> = HashMap::with_capacity(chunk.len());
            let mut batch: Vec<ForecastRecord> = Vec::with_capacity(chunk.len());

            for record in chunk {
                match positions.get(&record.key()) {
                    Some(&position) => batch[position] = record.clone(),
                    None => {
                        positions.insert(record.key(), batch.len());
                        batch.push(record.clone());
                    }
                }
            }

            if batch.len() < chunk.len() {
                debug!(
                    duplicates = chunk.len() - batch.len(),
                    "collapsed repeated natural keys in batch"
                );
            }

            batch
        })
        .collect()
}
