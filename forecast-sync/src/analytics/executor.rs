use forecast_sync_config::shared::AthenaConfig;
use std::time::Duration;
use tracing::{debug, info};

use crate::analytics::base::{QueryEngine, QueryExecutionId, QueryState, RawRow};
use crate::bail;
use crate::error::{ErrorKind, SyncResult};

/// Bounds of the status poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            max_attempts: 60,
            interval: Duration::from_secs(2),
        }
    }
}

impl From<&AthenaConfig> for PollSettings {
    fn from(config: &AthenaConfig) -> Self {
        Self {
            max_attempts: config.max_poll_attempts,
            interval: config.poll_interval(),
        }
    }
}

/// Lowercased column names and data rows of a finished query, header row removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// A submitted execution and the last state observed for it.
#[derive(Debug)]
pub struct QueryExecutionHandle {
    pub id: QueryExecutionId,
    pub state: QueryState,
}

/// Runs queries to completion on a [`QueryEngine`].
///
/// Every call to [`QueryExecutor::submit_and_fetch`] creates exactly one remote execution and
/// never retries it. A query that does not reach a terminal state within
/// [`PollSettings::max_attempts`] polls fails with [`ErrorKind::QueryTimeout`]; the remote
/// execution itself is left running.
#[derive(Debug)]
pub struct QueryExecutor<E> {
    engine: E,
    poll: PollSettings,
}

impl<E> QueryExecutor<E>
where
    E: QueryEngine,
{
    pub fn new(engine: E, poll: PollSettings) -> Self {
        Self { engine, poll }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Submits `query`, waits for it to succeed and returns every result row.
    pub async fn submit_and_fetch(&self, query: &str) -> SyncResult<QueryResult> {
        let id = self.engine.start_query(query).await?;
        info!(query_id = %id, "submitted athena query");

        let mut handle = QueryExecutionHandle {
            id,
            state: QueryState::Queued,
        };
        self.wait_for_completion(&mut handle).await?;

        let result = self.fetch_results(&handle.id).await?;
        info!(
            query_id = %handle.id,
            rows = result.rows.len(),
            "fetched athena query results"
        );

        Ok(result)
    }

    async fn wait_for_completion(&self, handle: &mut QueryExecutionHandle) -> SyncResult<()> {
        for attempt in 1..=self.poll.max_attempts {
            let status = self.engine.query_status(&handle.id).await?;
            handle.state = status.state;

            match status.state {
                QueryState::Succeeded => return Ok(()),
                QueryState::Failed | QueryState::Cancelled => {
                    let reason = status
                        .state_change_reason
                        .unwrap_or_else(|| "unknown error".to_owned());
                    info!(query_id = %handle.id, state = ?handle.state, %reason, "athena query did not succeed");

                    bail!(ErrorKind::QueryFailed, "Athena query failed", reason);
                }
                QueryState::Queued | QueryState::Running => {
                    debug!(query_id = %handle.id, attempt, state = ?handle.state, "athena query still in progress");
                }
            }

            if attempt < self.poll.max_attempts {
                tokio::time::sleep(self.poll.interval).await;
            }
        }

        bail!(
            ErrorKind::QueryTimeout,
            "Athena query did not finish within the polling bound",
            format!(
                "query {} still {:?} after {} polls",
                handle.id, handle.state, self.poll.max_attempts
            )
        );
    }

    /// Walks every result page. The first row seen is the header.
    async fn fetch_results(&self, id: &QueryExecutionId) -> SyncResult<QueryResult> {
        let mut columns: Option<Vec<String>> = None;
        let mut rows = Vec::new();
        let mut next_token = None;

        loop {
            let page = self.engine.query_results(id, next_token.take()).await?;

            let mut page_rows = page.rows.into_iter();
            if columns.is_none() {
                if let Some(header) = page_rows.next() {
                    columns = Some(
                        header
                            .into_iter()
                            .map(|name| name.unwrap_or_default().to_lowercase())
                            .collect(),
                    );
                }
            }
            rows.extend(page_rows);

            match page.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        Ok(QueryResult {
            columns: columns.unwrap_or_default(),
            rows,
        })
    }
}
