//! Scripted [`QueryEngine`] for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::analytics::base::{
    QueryEngine, QueryExecutionId, QueryState, QueryStatus, RawRow, ResultPage,
};
use crate::bail;
use crate::error::{ErrorKind, SyncResult};

/// Builds a raw row from string cells.
pub(crate) fn row(cells: &[&str]) -> RawRow {
    cells.iter().map(|cell| Some((*cell).to_owned())).collect()
}

/// Behaviour of one submitted query, consumed in submission order.
#[derive(Debug, Clone)]
pub(crate) struct ScriptedQuery {
    statuses: Vec<QueryStatus>,
    pages: Vec<Vec<RawRow>>,
}

impl ScriptedQuery {
    /// Succeeds on the first poll with a single result page.
    pub(crate) fn succeeded(rows: Vec<RawRow>) -> Self {
        Self::paged(vec![rows])
    }

    pub(crate) fn paged(pages: Vec<Vec<RawRow>>) -> Self {
        Self {
            statuses: vec![QueryStatus::new(QueryState::Succeeded)],
            pages,
        }
    }

    /// Statuses returned by successive polls. The last one repeats forever.
    pub(crate) fn with_statuses(mut self, statuses: Vec<QueryStatus>) -> Self {
        self.statuses = statuses;
        self
    }
}

#[derive(Debug, Default)]
struct Inner {
    scripts: VecDeque<ScriptedQuery>,
    running: HashMap<QueryExecutionId, (ScriptedQuery, usize)>,
    submitted: Vec<String>,
    status_polls: usize,
}

#[derive(Debug, Default)]
pub(crate) struct ScriptedQueryEngine {
    inner: Mutex<Inner>,
}

impl ScriptedQueryEngine {
    pub(crate) fn push(&self, script: ScriptedQuery) {
        self.inner.lock().unwrap().scripts.push_back(script);
    }

    pub(crate) fn submitted(&self) -> Vec<String> {
        self.inner.lock().unwrap().submitted.clone()
    }

    pub(crate) fn status_polls(&self) -> usize {
        self.inner.lock().unwrap().status_polls
    }
}

impl QueryEngine for ScriptedQueryEngine {
    async fn start_query(&self, query: &str) -> SyncResult<QueryExecutionId> {
        let mut inner = self.inner.lock().unwrap();
        let Some(script) = inner.scripts.pop_front() else {
            bail!(ErrorKind::SourceQueryFailed, "No scripted query left", query);
        };

        inner.submitted.push(query.to_owned());
        let id = QueryExecutionId::new(format!("query-{}", inner.submitted.len()));
        inner.running.insert(id.clone(), (script, 0));

        Ok(id)
    }

    async fn query_status(&self, id: &QueryExecutionId) -> SyncResult<QueryStatus> {
        let mut inner = self.inner.lock().unwrap();
        inner.status_polls += 1;
        let Some((script, polls)) = inner.running.get_mut(id) else {
            bail!(ErrorKind::InvalidState, "Unknown query execution", id);
        };

        let index = (*polls).min(script.statuses.len().saturating_sub(1));
        *polls += 1;

        Ok(script.statuses[index].clone())
    }

    async fn query_results(
        &self,
        id: &QueryExecutionId,
        next_token: Option<String>,
    ) -> SyncResult<ResultPage> {
        let inner = self.inner.lock().unwrap();
        let Some((script, _)) = inner.running.get(id) else {
            bail!(ErrorKind::InvalidState, "Unknown query execution", id);
        };

        let index = match next_token {
            Some(token) => token.parse::<usize>()?,
            None => 0,
        };
        let rows = script.pages.get(index).cloned().unwrap_or_default();
        let next_token = (index + 1 < script.pages.len()).then(|| (index + 1).to_string());

        Ok(ResultPage { rows, next_token })
    }
}
