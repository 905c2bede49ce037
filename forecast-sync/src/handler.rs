use chrono::Utc;
use forecast_sync_config::shared::SyncConfig;
use forecast_sync_config::Environment;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};

use crate::analytics::{PollSettings, QueryEngine, QueryExecutor};
use crate::checkpoint::postgres::PostgresCheckpointStore;
use crate::checkpoint::CheckpointStore;
use crate::clients::postgres::PgSession;
use crate::destination::postgres::PostgresDestination;
use crate::destination::Destination;
use crate::error::SyncResult;
use crate::orchestrator::SyncOrchestrator;
use crate::resolver::{ConfiguredUrlResolver, DatabaseUrlResolver};
use crate::trigger::TriggerEvent;
use crate::types::SyncOutcome;

/// Reply of one invocation. `body` holds a serialized JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl SyncResponse {
    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }

    /// Parses `body` back into JSON.
    pub fn body_json(&self) -> SyncResult<Value> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Turns the result of a run into the invocation reply.
pub fn respond(result: &SyncResult<SyncOutcome>) -> SyncResponse {
    let timestamp = Utc::now().to_rfc3339();

    match result {
        Ok(outcome) => SyncResponse {
            status_code: 200,
            body: json!({
                "message": format!("Successfully synced {} records", outcome.records_synced),
                "sync_type": outcome.mode,
                "records_synced": outcome.records_synced,
                "timestamp": timestamp,
            })
            .to_string(),
        },
        Err(err) => SyncResponse {
            status_code: 500,
            body: json!({
                "error": err.to_string(),
                "timestamp": timestamp,
            })
            .to_string(),
        },
    }
}

/// Runs the sync an event asks for on an already built orchestrator.
pub async fn run_invocation<E, D, C>(
    event: &Value,
    orchestrator: &SyncOrchestrator<E, D, C>,
) -> SyncResponse
where
    E: QueryEngine,
    D: Destination,
    C: CheckpointStore,
{
    let trigger = TriggerEvent::parse(event);
    let mode = trigger.sync_mode();
    info!(?trigger, %mode, "handling sync trigger");

    respond(&orchestrator.run(mode).await)
}

/// Handles one invocation against the configured Postgres target.
///
/// The connection lives for this call only and is closed on every path.
pub async fn handle_event<E>(
    config: &SyncConfig,
    environment: Environment,
    engine: E,
    event: &Value,
) -> SyncResponse
where
    E: QueryEngine,
{
    let resolver = ConfiguredUrlResolver::new(&config.target, environment);
    let session = match connect(&resolver, config).await {
        Ok(session) => Arc::new(session),
        Err(err) => {
            error!(error = %err, "could not connect to the target database");
            return respond(&Err(err));
        }
    };

    let orchestrator = SyncOrchestrator::new(
        QueryExecutor::new(engine, PollSettings::from(&config.athena)),
        PostgresDestination::new(session.clone()),
        PostgresCheckpointStore::new(session.clone()),
        config.source_table.clone(),
        config.batch.max_size,
    );
    let response = run_invocation(event, &orchestrator).await;

    drop(orchestrator);
    close(session).await;

    response
}

/// Creates the target schema without syncing.
pub async fn prepare_schema(config: &SyncConfig, environment: Environment) -> SyncResult<()> {
    let resolver = ConfiguredUrlResolver::new(&config.target, environment);
    let session = Arc::new(connect(&resolver, config).await?);

    let result = async {
        PostgresDestination::new(session.clone())
            .create_schema()
            .await?;
        PostgresCheckpointStore::new(session.clone())
            .create_schema()
            .await
    }
    .await;

    close(session).await;
    result
}

async fn connect<R>(resolver: &R, config: &SyncConfig) -> SyncResult<PgSession>
where
    R: DatabaseUrlResolver,
{
    let database_url = resolver.resolve().await?;
    PgSession::connect(&database_url, &config.target.tls).await
}

async fn close(session: Arc<PgSession>) {
    // Other holders only exist on early exits, in which case dropping aborts the connection.
    if let Ok(session) = Arc::try_unwrap(session) {
        session.close().await;
    }
}
