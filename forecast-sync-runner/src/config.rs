use forecast_sync_config::load_config;
use forecast_sync_config::shared::SyncConfig;
use forecast_sync_config::Environment;

/// Loads the [`SyncConfig`] of `environment` and validates it.
pub fn load_sync_config(environment: Environment) -> anyhow::Result<SyncConfig> {
    let config = load_config::<SyncConfig>(environment)?;
    config.validate()?;

    Ok(config)
}
