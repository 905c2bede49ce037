use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::bail;
use crate::destination::base::Destination;
use crate::error::{ErrorKind, SyncResult};
use crate::types::{ForecastKey, ForecastRecord};

/// A stored row together with the transaction that inserted it and the one that last wrote it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredForecast {
    pub record: ForecastRecord,
    pub created_in: u64,
    pub updated_in: u64,
}

#[derive(Debug, Default)]
struct Inner {
    rows: BTreeMap<ForecastKey, StoredForecast>,
    schema_creations: usize,
    committed_transactions: u64,
    fail_on_batch: Option<usize>,
}

/// In-memory [`Destination`] with the same upsert and all-or-nothing semantics as Postgres.
///
/// Batches are applied to a copy of the table that replaces the real one only once every batch
/// went through. [`MemoryDestination::fail_on_batch`] injects a write failure.
#[derive(Debug, Clone, Default)]
pub struct MemoryDestination {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryDestination {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next run fail while writing the batch at `batch_index`.
    pub async fn fail_on_batch(&self, batch_index: usize) {
        self.inner.lock().await.fail_on_batch = Some(batch_index);
    }

    /// Current rows, ordered by natural key.
    pub async fn records(&self) -> Vec<ForecastRecord> {
        let inner = self.inner.lock().await;
        inner
            .rows
            .values()
            .map(|stored| stored.record.clone())
            .collect()
    }

    pub async fn stored(&self, key: &ForecastKey) -> Option<StoredForecast> {
        self.inner.lock().await.rows.get(key).cloned()
    }

    pub async fn schema_creations(&self) -> usize {
        self.inner.lock().await.schema_creations
    }

    pub async fn committed_transactions(&self) -> u64 {
        self.inner.lock().await.committed_transactions
    }
}

impl Destination for MemoryDestination {
    async fn create_schema(&self) -> SyncResult<()> {
        self.inner.lock().await.schema_creations += 1;

        Ok(())
    }

    async fn upsert_batches(&self, batches: Vec<Vec<ForecastRecord>>) -> SyncResult<()> {
        let mut inner = self.inner.lock().await;
        let transaction = inner.committed_transactions + 1;
        let mut staged = inner.rows.clone();

        for (index, batch) in batches.into_iter().enumerate() {
            if inner.fail_on_batch == Some(index) {
                inner.fail_on_batch = None;
                bail!(
                    ErrorKind::WriteFailed,
                    "Forecast batch upsert failed",
                    format!("injected failure on batch {index}")
                );
            }

            info!(batch = index, records = batch.len(), "writing forecast batch to memory");
            for record in batch {
                let key = record.key();
                match staged.get_mut(&key) {
                    Some(stored) => {
                        stored.record = record;
                        stored.updated_in = transaction;
                    }
                    None => {
                        staged.insert(
                            key,
                            StoredForecast {
                                record,
                                created_in: transaction,
                                updated_in: transaction,
                            },
                        );
                    }
                }
            }
        }

        inner.rows = staged;
        inner.committed_transactions = transaction;

        Ok(())
    }
}
