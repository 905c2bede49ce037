use forecast_sync_config::shared::NeonConfig;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::error::{ErrorKind, SyncError};

#[derive(Debug, Error)]
pub enum NeonError {
    #[error("Neon API rejected the credentials ({0})")]
    Unauthorized(StatusCode),

    #[error("Neon API request failed with status {status}: {body}")]
    RequestFailed { status: StatusCode, body: String },

    #[error("Branch `{0}` not found in the Neon project")]
    BranchNotFound(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

impl From<NeonError> for SyncError {
    fn from(err: NeonError) -> SyncError {
        let (kind, description) = match &err {
            NeonError::Unauthorized(_) => (
                ErrorKind::AuthenticationError,
                "Neon API rejected the credentials",
            ),
            NeonError::BranchNotFound(_) => {
                (ErrorKind::NoDatabaseUrl, "Neon branch for the environment not found")
            }
            NeonError::RequestFailed { .. } | NeonError::HttpError(_) => {
                (ErrorKind::NoDatabaseUrl, "Neon API request failed")
            }
        };

        SyncError::from((kind, description, err.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct BranchesResponse {
    branches: Vec<Branch>,
}

#[derive(Debug, Deserialize)]
struct Branch {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ConnectionStringResponse {
    connection_string: String,
}

/// Minimal client of the Neon management API, used to look up branch connection strings.
#[derive(Clone)]
pub struct NeonClient {
    client: Client,
    api_url: String,
    api_key: SecretString,
    project_id: String,
}

impl NeonClient {
    pub fn new(config: &NeonConfig) -> Self {
        Self {
            client: Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone().into(),
            project_id: config.project_id.clone(),
        }
    }

    async fn get<T>(&self, url: &str) -> Result<T, NeonError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .get(url)
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(NeonError::Unauthorized(status));
        }
        if !status.is_success() {
            let body = response.text().await?;
            return Err(NeonError::RequestFailed { status, body });
        }

        Ok(response.json().await?)
    }

    /// Returns the connection string of the branch named `branch_name`.
    pub async fn branch_connection_string(
        &self,
        branch_name: &str,
    ) -> Result<SecretString, NeonError> {
        let branches: BranchesResponse = self
            .get(&format!(
                "{}/projects/{}/branches",
                self.api_url, self.project_id
            ))
            .await?;

        let Some(branch) = branches
            .branches
            .into_iter()
            .find(|branch| branch.name == branch_name)
        else {
            return Err(NeonError::BranchNotFound(branch_name.to_owned()));
        };

        info!(branch = branch_name, branch_id = %branch.id, "resolved neon branch");

        let response: ConnectionStringResponse = self
            .get(&format!(
                "{}/projects/{}/branches/{}/connection_string",
                self.api_url, self.project_id, branch.id
            ))
            .await?;

        Ok(response.connection_string.into())
    }
}
