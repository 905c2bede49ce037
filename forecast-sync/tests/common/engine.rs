use chrono::NaiveDate;
use forecast_sync::analytics::{
    QueryEngine, QueryExecutionId, QueryState, QueryStatus, RawRow, ResultPage,
};
use forecast_sync::bail;
use forecast_sync::error::{ErrorKind, SyncResult};
use forecast_sync::strategy::FORECAST_COLUMNS;
use forecast_sync::types::ForecastRecord;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const PAGE_SIZE: usize = 3;

/// How the next executions end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Behavior {
    Succeed,
    NeverFinish,
    Fail(String),
}

#[derive(Debug)]
struct Inner {
    table: Vec<ForecastRecord>,
    behavior: Behavior,
    executions: HashMap<QueryExecutionId, (Behavior, Vec<RawRow>)>,
    submitted: Vec<String>,
    overrides: Vec<CellOverride>,
}

/// Replaces one cell of the data query output, addressed by data row and column.
#[derive(Debug, Clone)]
struct CellOverride {
    row: usize,
    column: String,
    value: Option<String>,
}

/// Fake Athena backed by an in-memory forecast table.
///
/// It answers the bounds query and the two shapes of data query by evaluating their date
/// filters against the table, and serves results in small pages with the header row first.
#[derive(Debug, Clone)]
pub struct TableQueryEngine {
    inner: Arc<Mutex<Inner>>,
}

impl TableQueryEngine {
    pub fn new(table: Vec<ForecastRecord>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                table,
                behavior: Behavior::Succeed,
                executions: HashMap::new(),
                submitted: Vec::new(),
                overrides: Vec::new(),
            })),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn set_table(&self, table: Vec<ForecastRecord>) {
        self.inner.lock().unwrap().table = table;
    }

    pub fn extend_table(&self, records: Vec<ForecastRecord>) {
        self.inner.lock().unwrap().table.extend(records);
    }

    pub fn set_behavior(&self, behavior: Behavior) {
        self.inner.lock().unwrap().behavior = behavior;
    }

    /// Makes data queries return `value` in `column` of their data row at index `row`.
    pub fn override_cell(&self, row: usize, column: &str, value: Option<&str>) {
        self.inner.lock().unwrap().overrides.push(CellOverride {
            row,
            column: column.to_owned(),
            value: value.map(ToOwned::to_owned),
        });
    }

    pub fn submitted(&self) -> Vec<String> {
        self.inner.lock().unwrap().submitted.clone()
    }

    fn answer(table: &[ForecastRecord], overrides: &[CellOverride], query: &str) -> Vec<RawRow> {
        if query.contains("min(business_date)") {
            let min_date = table.iter().map(|record| record.business_date).min();
            let max_date = table.iter().map(|record| record.business_date).max();

            return vec![
                header(&["min_date", "max_date"]),
                vec![min_date.map(format_date), max_date.map(format_date)],
            ];
        }

        let after = date_after(query, "business_date > date '");
        let from = date_after(query, "business_date >= date '");
        let to = date_after(query, "business_date <= date '");

        let mut selected: Vec<&ForecastRecord> = table
            .iter()
            .filter(|record| after.map_or(true, |after| record.business_date > after))
            .filter(|record| from.map_or(true, |from| record.business_date >= from))
            .filter(|record| to.map_or(true, |to| record.business_date <= to))
            .collect();
        selected.sort_by_key(|record| {
            (
                record.business_date,
                record.restaurant_id,
                record.inventory_item_id,
            )
        });

        let mut rows = vec![header(FORECAST_COLUMNS)];
        rows.extend(selected.into_iter().map(to_raw_row));

        for cell in overrides {
            let column = FORECAST_COLUMNS.iter().position(|name| *name == cell.column);
            if let (Some(row), Some(column)) = (rows.get_mut(cell.row + 1), column) {
                row[column] = cell.value.clone();
            }
        }

        rows
    }
}

impl QueryEngine for TableQueryEngine {
    async fn start_query(&self, query: &str) -> SyncResult<QueryExecutionId> {
        let mut inner = self.inner.lock().unwrap();
        inner.submitted.push(query.to_owned());
        let id = QueryExecutionId::new(format!("execution-{}", inner.submitted.len()));

        let rows = Self::answer(&inner.table, &inner.overrides, query);
        let behavior = inner.behavior.clone();
        inner.executions.insert(id.clone(), (behavior, rows));

        Ok(id)
    }

    async fn query_status(&self, id: &QueryExecutionId) -> SyncResult<QueryStatus> {
        let inner = self.inner.lock().unwrap();
        let Some((behavior, _)) = inner.executions.get(id) else {
            bail!(ErrorKind::InvalidState, "Unknown query execution", id);
        };

        let status = match behavior {
            Behavior::Succeed => QueryStatus::new(QueryState::Succeeded),
            Behavior::NeverFinish => QueryStatus::new(QueryState::Running),
            Behavior::Fail(reason) => QueryStatus::with_reason(QueryState::Failed, reason.clone()),
        };

        Ok(status)
    }

    async fn query_results(
        &self,
        id: &QueryExecutionId,
        next_token: Option<String>,
    ) -> SyncResult<ResultPage> {
        let inner = self.inner.lock().unwrap();
        let Some((_, rows)) = inner.executions.get(id) else {
            bail!(ErrorKind::InvalidState, "Unknown query execution", id);
        };

        let start = match next_token {
            Some(token) => token.parse::<usize>()?,
            None => 0,
        };
        let end = (start + PAGE_SIZE).min(rows.len());
        let next_token = (end < rows.len()).then(|| end.to_string());

        Ok(ResultPage {
            rows: rows[start..end].to_vec(),
            next_token,
        })
    }
}

fn header(columns: &[&str]) -> RawRow {
    columns
        .iter()
        .map(|column| Some((*column).to_owned()))
        .collect()
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn date_after(query: &str, marker: &str) -> Option<NaiveDate> {
    let start = query.find(marker)? + marker.len();
    let raw = query.get(start..start + 10)?;

    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

fn to_raw_row(record: &ForecastRecord) -> RawRow {
    vec![
        Some(record.restaurant_id.to_string()),
        Some(record.inventory_item_id.to_string()),
        Some(format_date(record.business_date)),
        record.dma_id.clone(),
        record.dc_id.map(|dc_id| dc_id.to_string()),
        Some(record.state.clone()),
        record.y_05.map(|y| y.to_string()),
        Some(record.y_50.to_string()),
        record.y_95.map(|y| y.to_string()),
    ]
}
