use serde::{Deserialize, Serialize};

use crate::SerializableSecretString;
use crate::shared::ValidationError;

/// Default base url of the Neon management API.
pub const DEFAULT_NEON_API_URL: &str = "https://console.neon.tech/api/v2";

/// Where the forecast rows are written.
///
/// Either `database_url` is set explicitly, or the connection string is looked up through the Neon
/// API for the branch matching the running environment.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct TargetConfig {
    /// Full Postgres connection string. Takes precedence over [`TargetConfig::neon`].
    pub database_url: Option<SerializableSecretString>,
    /// TLS settings for the Postgres connection.
    pub tls: TlsConfig,
    /// Neon project used to resolve the connection string when no url is configured.
    pub neon: Option<NeonConfig>,
}

impl TargetConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.tls.validate()?;

        if let Some(neon) = &self.neon {
            neon.validate()?;
        }

        Ok(())
    }
}

/// TLS settings for the Postgres connection.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct TlsConfig {
    /// PEM-encoded trusted root certificates.
    pub trusted_root_certs: String,
    /// Whether TLS is enabled for the connection.
    pub enabled: bool,
}

impl TlsConfig {
    /// Returns [`ValidationError::MissingTrustedRootCerts`] if TLS is enabled but no certificates
    /// are provided.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.enabled && self.trusted_root_certs.is_empty() {
            return Err(ValidationError::MissingTrustedRootCerts);
        }

        Ok(())
    }
}

/// Credentials for the Neon management API.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NeonConfig {
    pub api_key: SerializableSecretString,
    pub project_id: String,
    #[serde(default = "default_neon_api_url")]
    pub api_url: String,
}

impl NeonConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.project_id.trim().is_empty() {
            return Err(ValidationError::MissingNeonProjectId);
        }

        Ok(())
    }
}

fn default_neon_api_url() -> String {
    DEFAULT_NEON_API_URL.to_owned()
}
