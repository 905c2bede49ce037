use forecast_sync_config::shared::TargetConfig;
use forecast_sync_config::Environment;
use secrecy::SecretString;
use std::future::Future;
use tracing::info;

use crate::bail;
use crate::clients::neon::NeonClient;
use crate::error::{ErrorKind, SyncResult};

/// Produces the connection string of the target database, or fails with
/// [`ErrorKind::NoDatabaseUrl`].
pub trait DatabaseUrlResolver {
    fn resolve(&self) -> impl Future<Output = SyncResult<SecretString>> + Send;
}

/// Neon branch holding the database of `environment`.
pub fn branch_for_environment(environment: Environment) -> Option<&'static str> {
    match environment {
        Environment::Prod => Some("main"),
        Environment::Dev => Some("dev"),
        Environment::Staging => None,
    }
}

/// Resolves from configuration: an explicit url wins, otherwise the Neon branch of the
/// environment is looked up.
#[derive(Clone)]
pub struct ConfiguredUrlResolver {
    database_url: Option<SecretString>,
    neon: Option<NeonClient>,
    environment: Environment,
}

impl ConfiguredUrlResolver {
    pub fn new(target: &TargetConfig, environment: Environment) -> Self {
        Self {
            database_url: target.database_url.clone().map(Into::into),
            neon: target.neon.as_ref().map(NeonClient::new),
            environment,
        }
    }
}

impl DatabaseUrlResolver for ConfiguredUrlResolver {
    async fn resolve(&self) -> SyncResult<SecretString> {
        if let Some(database_url) = &self.database_url {
            return Ok(database_url.clone());
        }

        let Some(neon) = &self.neon else {
            bail!(
                ErrorKind::NoDatabaseUrl,
                "No database url available",
                "neither `target.database_url` nor `target.neon` is configured"
            );
        };

        let Some(branch) = branch_for_environment(self.environment) else {
            bail!(
                ErrorKind::NoDatabaseUrl,
                "No database branch for the environment",
                self.environment
            );
        };

        info!(branch, "resolving database url from neon");
        Ok(neon.branch_connection_string(branch).await?)
    }
}
