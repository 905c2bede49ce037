use crate::config::load_sync_config;
use crate::core::{run_with_config, Invocation};
use clap::Parser;
use forecast_sync_config::shared::SyncConfig;
use forecast_sync_config::Environment;
use forecast_sync_telemetry::tracing::init_tracing;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

mod config;
mod core;

/// Syncs the Athena forecast table into Postgres for one trigger event.
#[derive(Debug, Parser)]
#[command(name = "forecast-sync", version)]
struct Args {
    /// JSON file holding the trigger event. Read from stdin when omitted.
    #[arg(long, value_name = "FILE")]
    event: Option<PathBuf>,

    /// Create the target tables and exit without syncing.
    #[arg(long)]
    schema_only: bool,
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let environment = Environment::load()?;
    let sync_config = load_sync_config(environment)?;

    let _log_flusher = init_tracing(env!("CARGO_BIN_NAME"), environment)?;

    let invocation = if args.schema_only {
        Invocation::SchemaOnly
    } else {
        Invocation::Event(args.event)
    };

    let succeeded = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(sync_config, environment, invocation))?;

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn async_main(
    sync_config: SyncConfig,
    environment: Environment,
    invocation: Invocation,
) -> anyhow::Result<bool> {
    match run_with_config(sync_config, environment, invocation).await {
        Ok(succeeded) => Ok(succeeded),
        Err(err) => {
            error!("an error occurred in the forecast sync: {err:#}");

            Err(err)
        }
    }
}
