use anyhow::Context;
use forecast_sync::analytics::AthenaQueryEngine;
use forecast_sync::handler::{handle_event, prepare_schema};
use forecast_sync_config::shared::{AthenaConfig, SyncConfig, TargetConfig};
use forecast_sync_config::Environment;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

/// What the binary was asked to do.
#[derive(Debug)]
pub enum Invocation {
    /// Handle the event in the given file, or on stdin.
    Event(Option<PathBuf>),
    SchemaOnly,
}

/// Runs one invocation and returns whether it succeeded.
///
/// For events the reply is printed to stdout whatever the outcome; a failed sync is reported
/// through the reply and the return value, not as an error.
pub async fn run_with_config(
    sync_config: SyncConfig,
    environment: Environment,
    invocation: Invocation,
) -> anyhow::Result<bool> {
    let invocation_id = Uuid::new_v4();
    let span = info_span!("invocation", %invocation_id, %environment);

    async move {
        info!("starting forecast sync");
        log_config(&sync_config);

        match invocation {
            Invocation::SchemaOnly => {
                prepare_schema(&sync_config, environment).await?;
                info!("target schema is ready");

                Ok(true)
            }
            Invocation::Event(path) => {
                let event = read_event(path.as_deref()).await?;
                let engine = AthenaQueryEngine::from_config(&sync_config.athena).await;

                let response = handle_event(&sync_config, environment, engine, &event).await;
                println!("{}", serde_json::to_string(&response)?);
                info!(status_code = response.status_code, "forecast sync finished");

                Ok(response.is_success())
            }
        }
    }
    .instrument(span)
    .await
}

/// Reads the trigger event. Empty input is the empty event.
async fn read_event(path: Option<&Path>) -> anyhow::Result<Value> {
    let raw = match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read event file {}", path.display()))?,
        None => {
            let mut raw = String::new();
            tokio::io::stdin()
                .read_to_string(&mut raw)
                .await
                .context("failed to read event from stdin")?;
            raw
        }
    };

    if raw.trim().is_empty() {
        return Ok(json!({}));
    }

    serde_json::from_str(&raw).context("event is not valid json")
}

fn log_config(config: &SyncConfig) {
    debug!(
        source_table = config.source_table,
        batch_max_size = config.batch.max_size,
        "sync config"
    );
    log_athena_config(&config.athena);
    log_target_config(&config.target);
}

fn log_athena_config(config: &AthenaConfig) {
    debug!(
        database = config.database,
        output_location = config.output_location,
        region = config.region,
        max_poll_attempts = config.max_poll_attempts,
        poll_interval_ms = config.poll_interval_ms,
        "athena config"
    );
}

fn log_target_config(config: &TargetConfig) {
    debug!(
        database_url_configured = config.database_url.is_some(),
        tls_enabled = config.tls.enabled,
        neon_project_id = config.neon.as_ref().map(|neon| neon.project_id.as_str()),
        "target config"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn event_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("{name}-{}.json", Uuid::new_v4()));
        tokio::fs::write(&path, contents).await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_read_event_from_file() {
        let path = event_file("schedule", r#"{"source": "aws.events"}"#).await;

        let event = read_event(Some(&path)).await.unwrap();

        assert_eq!(event, json!({"source": "aws.events"}));
        tokio::fs::remove_file(path).await.unwrap();
    }

    #[tokio::test]
    async fn test_blank_event_is_empty_object() {
        let path = event_file("blank", "  \n").await;

        let event = read_event(Some(&path)).await.unwrap();

        assert_eq!(event, json!({}));
        tokio::fs::remove_file(path).await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_event_is_rejected() {
        let path = event_file("invalid", "{source").await;

        assert!(read_event(Some(&path)).await.is_err());
        tokio::fs::remove_file(path).await.unwrap();
    }
}
