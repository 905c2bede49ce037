use std::fmt;
use std::future::Future;

use crate::error::SyncResult;

/// Opaque identifier of a remote query execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryExecutionId(String);

impl QueryExecutionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a remote query execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl QueryState {
    /// Whether polling can stop at this state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QueryState::Succeeded | QueryState::Failed | QueryState::Cancelled
        )
    }
}

/// State reported by one status poll, with the engine's reason for failed executions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryStatus {
    pub state: QueryState,
    pub state_change_reason: Option<String>,
}

impl QueryStatus {
    pub fn new(state: QueryState) -> Self {
        Self {
            state,
            state_change_reason: None,
        }
    }

    pub fn with_reason(state: QueryState, reason: impl Into<String>) -> Self {
        Self {
            state,
            state_change_reason: Some(reason.into()),
        }
    }
}

/// A row as returned by the engine: one nullable string per column.
pub type RawRow = Vec<Option<String>>;

/// One page of results. The first page starts with the header row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultPage {
    pub rows: Vec<RawRow>,
    pub next_token: Option<String>,
}

/// Remote analytical query service.
///
/// Implementations are only transport: they submit, report state and hand back pages. Polling
/// bounds, header handling and pagination live in [`crate::analytics::QueryExecutor`].
pub trait QueryEngine {
    /// Submits `query` and returns the id of the new execution.
    fn start_query(
        &self,
        query: &str,
    ) -> impl Future<Output = SyncResult<QueryExecutionId>> + Send;

    /// Returns the current state of an execution.
    fn query_status(
        &self,
        id: &QueryExecutionId,
    ) -> impl Future<Output = SyncResult<QueryStatus>> + Send;

    /// Fetches the result page addressed by `next_token`, or the first page when it is `None`.
    fn query_results(
        &self,
        id: &QueryExecutionId,
        next_token: Option<String>,
    ) -> impl Future<Output = SyncResult<ResultPage>> + Send;
}
