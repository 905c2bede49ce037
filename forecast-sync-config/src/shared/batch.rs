use serde::{Deserialize, Serialize};

/// Default number of records per upsert statement.
pub const DEFAULT_BATCH_MAX_SIZE: usize = 10_000;

/// Batching configuration for writes into the target store.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct BatchConfig {
    /// Maximum number of records written by a single upsert statement.
    pub max_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_BATCH_MAX_SIZE,
        }
    }
}
