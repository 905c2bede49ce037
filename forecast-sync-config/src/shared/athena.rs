use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::shared::ValidationError;

/// Connection and polling settings for the Athena query engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct AthenaConfig {
    /// Glue database the source table lives in.
    pub database: String,
    /// `s3://` prefix where Athena writes query results.
    pub output_location: String,
    /// AWS region of the Athena workgroup.
    pub region: String,
    /// Maximum number of status polls before a query is abandoned.
    pub max_poll_attempts: u32,
    /// Fixed sleep between two status polls, in milliseconds.
    pub poll_interval_ms: u64,
}

impl AthenaConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_poll_attempts == 0 {
            return Err(ValidationError::MaxPollAttemptsZero);
        }

        if !self.output_location.starts_with("s3://") {
            return Err(ValidationError::InvalidOutputLocation(
                self.output_location.clone(),
            ));
        }

        Ok(())
    }
}

impl Default for AthenaConfig {
    fn default() -> Self {
        Self {
            database: "default".to_owned(),
            output_location: "s3://forecast-athena-results/".to_owned(),
            region: "us-east-2".to_owned(),
            max_poll_attempts: 60,
            poll_interval_ms: 2_000,
        }
    }
}
