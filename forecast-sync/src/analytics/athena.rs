use aws_config::{BehaviorVersion, Region};
use aws_sdk_athena::error::DisplayErrorContext;
use aws_sdk_athena::types::{QueryExecutionContext, QueryExecutionState, ResultConfiguration};
use aws_sdk_athena::Client;
use forecast_sync_config::shared::AthenaConfig;
use tracing::debug;

use crate::analytics::base::{
    QueryEngine, QueryExecutionId, QueryState, QueryStatus, RawRow, ResultPage,
};
use crate::error::{ErrorKind, SyncResult};
use crate::{bail, sync_error};

/// [`QueryEngine`] backed by Amazon Athena.
///
/// The client is built once per invocation and passed in explicitly, credentials come from the
/// default AWS provider chain.
#[derive(Debug, Clone)]
pub struct AthenaQueryEngine {
    client: Client,
    database: String,
    output_location: String,
}

impl AthenaQueryEngine {
    pub fn new(client: Client, database: String, output_location: String) -> Self {
        Self {
            client,
            database,
            output_location,
        }
    }

    /// Loads the AWS configuration for the configured region and builds the engine.
    pub async fn from_config(config: &AthenaConfig) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        Self::new(
            Client::new(&sdk_config),
            config.database.clone(),
            config.output_location.clone(),
        )
    }
}

impl QueryEngine for AthenaQueryEngine {
    async fn start_query(&self, query: &str) -> SyncResult<QueryExecutionId> {
        let context = QueryExecutionContext::builder()
            .database(&self.database)
            .build();
        let result_configuration = ResultConfiguration::builder()
            .output_location(&self.output_location)
            .build();

        let output = self
            .client
            .start_query_execution()
            .query_string(query)
            .query_execution_context(context)
            .result_configuration(result_configuration)
            .send()
            .await
            .map_err(|err| {
                sync_error!(
                    ErrorKind::SourceQueryFailed,
                    "Athena query submission failed",
                    DisplayErrorContext(&err)
                )
            })?;

        let Some(id) = output.query_execution_id() else {
            bail!(
                ErrorKind::SourceQueryFailed,
                "Athena did not return a query execution id"
            );
        };

        Ok(QueryExecutionId::new(id))
    }

    async fn query_status(&self, id: &QueryExecutionId) -> SyncResult<QueryStatus> {
        let output = self
            .client
            .get_query_execution()
            .query_execution_id(id.as_str())
            .send()
            .await
            .map_err(|err| {
                sync_error!(
                    ErrorKind::SourceQueryFailed,
                    "Athena query status request failed",
                    DisplayErrorContext(&err)
                )
            })?;

        let status = output
            .query_execution()
            .and_then(|execution| execution.status());
        let Some(status) = status else {
            bail!(
                ErrorKind::SourceQueryFailed,
                "Athena returned no status for the query execution",
                id
            );
        };

        let state = match status.state() {
            Some(QueryExecutionState::Queued) | None => QueryState::Queued,
            Some(QueryExecutionState::Running) => QueryState::Running,
            Some(QueryExecutionState::Succeeded) => QueryState::Succeeded,
            Some(QueryExecutionState::Failed) => QueryState::Failed,
            Some(QueryExecutionState::Cancelled) => QueryState::Cancelled,
            Some(other) => {
                debug!(query_id = %id, state = other.as_str(), "unrecognized athena query state");
                QueryState::Running
            }
        };

        Ok(QueryStatus {
            state,
            state_change_reason: status.state_change_reason().map(str::to_owned),
        })
    }

    async fn query_results(
        &self,
        id: &QueryExecutionId,
        next_token: Option<String>,
    ) -> SyncResult<ResultPage> {
        let output = self
            .client
            .get_query_results()
            .query_execution_id(id.as_str())
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|err| {
                sync_error!(
                    ErrorKind::SourceQueryFailed,
                    "Athena query results request failed",
                    DisplayErrorContext(&err)
                )
            })?;

        let rows = output
            .result_set()
            .map(|result_set| {
                result_set
                    .rows()
                    .iter()
                    .map(|row| {
                        row.data()
                            .iter()
                            .map(|datum| datum.var_char_value().map(str::to_owned))
                            .collect::<RawRow>()
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(ResultPage {
            rows,
            next_token: output.next_token().map(str::to_owned),
        })
    }
}
