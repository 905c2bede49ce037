use serde::{Deserialize, Serialize};

use crate::shared::{AthenaConfig, BatchConfig, TargetConfig, ValidationError};

/// Top level configuration of a sync invocation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct SyncConfig {
    /// Source side: the Athena engine and its polling bounds.
    pub athena: AthenaConfig,
    /// Table in the Athena database holding the forecast rows.
    pub source_table: String,
    /// Write batching.
    pub batch: BatchConfig,
    /// Target Postgres database.
    pub target: TargetConfig,
}

impl SyncConfig {
    /// Validates the whole configuration tree.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.batch.max_size == 0 {
            return Err(ValidationError::BatchSizeZero);
        }

        if !is_plain_identifier(&self.source_table) {
            return Err(ValidationError::InvalidTableName(self.source_table.clone()));
        }

        self.athena.validate()?;
        self.target.validate()
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            athena: AthenaConfig::default(),
            source_table: "forecast".to_owned(),
            batch: BatchConfig::default(),
            target: TargetConfig::default(),
        }
    }
}

/// `source_table` ends up verbatim in the generated queries.
fn is_plain_identifier(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.ends_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}
