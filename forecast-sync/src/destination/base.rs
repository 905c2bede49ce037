use std::future::Future;

use crate::error::SyncResult;
use crate::types::ForecastRecord;

/// Target store of forecast rows.
pub trait Destination {
    /// Creates the forecast table and its supporting objects when missing. Safe to call on every
    /// invocation.
    fn create_schema(&self) -> impl Future<Output = SyncResult<()>> + Send;

    /// Upserts `batches` on the natural key, one statement per batch.
    ///
    /// All batches are applied in a single transaction: when any batch fails none of them is
    /// visible afterwards. A batch never repeats a natural key.
    fn upsert_batches(
        &self,
        batches: Vec<Vec<ForecastRecord>>,
    ) -> impl Future<Output = SyncResult<()>> + Send;
}
