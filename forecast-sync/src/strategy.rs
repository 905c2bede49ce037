use chrono::NaiveDate;
use tracing::info;

use crate::analytics::{QueryEngine, QueryExecutor};
use crate::decoder::decode_bounds;
use crate::error::SyncResult;
use crate::types::{DateBounds, SyncCheckpoint, SyncMode};

/// Columns selected from the source table, in decode order.
pub const FORECAST_COLUMNS: &[&str] = &[
    "restaurant_id",
    "inventory_item_id",
    "business_date",
    "dma_id",
    "dc_id",
    "state",
    "y_05",
    "y_50",
    "y_95",
];

/// Scope decided for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPlan {
    /// Rows strictly after the checkpoint date.
    Incremental { after: NaiveDate },
    /// Every row within the inclusive source bounds.
    DateRange(DateBounds),
    /// The source has no rows.
    NothingToSync,
}

impl SyncPlan {
    /// Returns the data query for this plan, or `None` when there is nothing to read.
    ///
    /// Rows are always ordered by `(business_date, restaurant_id, inventory_item_id)` so batch
    /// contents are deterministic and the highest written date only grows across runs.
    pub fn data_query(&self, source_table: &str) -> Option<String> {
        let filter = match self {
            SyncPlan::Incremental { after } => {
                format!("business_date > date '{}'", after.format("%Y-%m-%d"))
            }
            SyncPlan::DateRange(bounds) => format!(
                "business_date >= date '{}' and business_date <= date '{}'",
                bounds.min_date.format("%Y-%m-%d"),
                bounds.max_date.format("%Y-%m-%d")
            ),
            SyncPlan::NothingToSync => return None,
        };

        Some(format!(
            "select {} from {source_table} where {filter} order by business_date, restaurant_id, inventory_item_id",
            FORECAST_COLUMNS.join(", ")
        ))
    }
}

/// Query returning the inclusive date range of the source table.
pub fn bounds_query(source_table: &str) -> String {
    format!(
        "select min(business_date) as min_date, max(business_date) as max_date from {source_table}"
    )
}

/// Decides how much of the source a run reads.
#[derive(Debug)]
pub struct StrategySelector<'a, E> {
    executor: &'a QueryExecutor<E>,
    source_table: &'a str,
}

impl<'a, E> StrategySelector<'a, E>
where
    E: QueryEngine,
{
    pub fn new(executor: &'a QueryExecutor<E>, source_table: &'a str) -> Self {
        Self {
            executor,
            source_table,
        }
    }

    /// Plans a run of `mode` from the current checkpoint.
    ///
    /// Incremental runs with a dated checkpoint read only newer dates. Everything else reads the
    /// whole source, which costs one extra bounds query.
    pub async fn plan(
        &self,
        mode: SyncMode,
        checkpoint: Option<&SyncCheckpoint>,
    ) -> SyncResult<SyncPlan> {
        if mode == SyncMode::Incremental {
            if let Some(after) = checkpoint.and_then(|checkpoint| checkpoint.last_sync_date) {
                info!(%after, "planning incremental sync from checkpoint");
                return Ok(SyncPlan::Incremental { after });
            }
        }

        let result = self
            .executor
            .submit_and_fetch(&bounds_query(self.source_table))
            .await?;

        match decode_bounds(&result)? {
            Some(bounds) => {
                info!(
                    min_date = %bounds.min_date,
                    max_date = %bounds.max_date,
                    %mode,
                    "planning full range sync"
                );
                Ok(SyncPlan::DateRange(bounds))
            }
            None => {
                info!(%mode, "source table is empty, nothing to sync");
                Ok(SyncPlan::NothingToSync)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::test_engine::{row, ScriptedQuery, ScriptedQueryEngine};
    use crate::analytics::PollSettings;
    use crate::types::SyncStatus;
    use chrono::Utc;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn checkpoint(last_sync_date: Option<NaiveDate>) -> SyncCheckpoint {
        SyncCheckpoint {
            sync_type: SyncMode::Incremental,
            last_sync_timestamp: Utc::now(),
            last_sync_date,
            records_synced: 10,
            status: SyncStatus::Success,
            error_message: None,
        }
    }

    #[test]
    fn test_incremental_query_filters_after_checkpoint() {
        let query = SyncPlan::Incremental { after: date(1) }
            .data_query("forecast")
            .unwrap();

        assert_eq!(
            query,
            "select restaurant_id, inventory_item_id, business_date, dma_id, dc_id, state, y_05, y_50, y_95 \
             from forecast where business_date > date '2024-01-01' \
             order by business_date, restaurant_id, inventory_item_id"
        );
    }

    #[test]
    fn test_range_query_is_inclusive() {
        let query = SyncPlan::DateRange(DateBounds {
            min_date: date(1),
            max_date: date(3),
        })
        .data_query("forecast")
        .unwrap();

        assert!(query.contains(
            "where business_date >= date '2024-01-01' and business_date <= date '2024-01-03'"
        ));
        assert!(query.ends_with("order by business_date, restaurant_id, inventory_item_id"));
    }

    #[test]
    fn test_nothing_to_sync_has_no_query() {
        assert_eq!(SyncPlan::NothingToSync.data_query("forecast"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_incremental_with_checkpoint_skips_bounds_query() {
        let executor = QueryExecutor::new(ScriptedQueryEngine::default(), PollSettings::default());
        let selector = StrategySelector::new(&executor, "forecast");

        let plan = selector
            .plan(SyncMode::Incremental, Some(&checkpoint(Some(date(1)))))
            .await
            .unwrap();

        assert_eq!(plan, SyncPlan::Incremental { after: date(1) });
        assert!(executor.engine().submitted().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_incremental_without_checkpoint_reads_bounds() {
        let engine = ScriptedQueryEngine::default();
        engine.push(ScriptedQuery::succeeded(vec![
            row(&["min_date", "max_date"]),
            row(&["2024-01-01", "2024-01-03"]),
        ]));
        let executor = QueryExecutor::new(engine, PollSettings::default());
        let selector = StrategySelector::new(&executor, "forecast");

        let plan = selector.plan(SyncMode::Incremental, None).await.unwrap();

        assert_eq!(
            plan,
            SyncPlan::DateRange(DateBounds {
                min_date: date(1),
                max_date: date(3),
            })
        );
        assert_eq!(executor.engine().submitted(), vec![bounds_query("forecast")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_mode_ignores_checkpoint() {
        let engine = ScriptedQueryEngine::default();
        engine.push(ScriptedQuery::succeeded(vec![
            row(&["min_date", "max_date"]),
            row(&["2024-01-01", "2024-01-02"]),
        ]));
        let executor = QueryExecutor::new(engine, PollSettings::default());
        let selector = StrategySelector::new(&executor, "forecast");

        let plan = selector
            .plan(SyncMode::Full, Some(&checkpoint(Some(date(2)))))
            .await
            .unwrap();

        assert!(matches!(plan, SyncPlan::DateRange(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_source_plans_nothing() {
        let engine = ScriptedQueryEngine::default();
        engine.push(ScriptedQuery::succeeded(vec![
            row(&["min_date", "max_date"]),
            vec![None, None],
        ]));
        let executor = QueryExecutor::new(engine, PollSettings::default());
        let selector = StrategySelector::new(&executor, "forecast");

        let plan = selector.plan(SyncMode::Full, None).await.unwrap();

        assert_eq!(plan, SyncPlan::NothingToSync);
    }

    #[tokio::test(start_paused = true)]
    async fn test_checkpoint_without_date_falls_back_to_bounds() {
        let engine = ScriptedQueryEngine::default();
        engine.push(ScriptedQuery::succeeded(vec![row(&["min_date", "max_date"])]));
        let executor = QueryExecutor::new(engine, PollSettings::default());
        let selector = StrategySelector::new(&executor, "forecast");

        let plan = selector
            .plan(SyncMode::Incremental, Some(&checkpoint(None)))
            .await
            .unwrap();

        assert_eq!(plan, SyncPlan::NothingToSync);
        assert_eq!(executor.engine().submitted().len(), 1);
    }
}
