use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::bail;
use crate::error::{ErrorKind, SyncError, SyncResult};

/// Scope of a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Only source dates newer than the current checkpoint.
    #[default]
    Incremental,
    /// The whole source date range.
    Full,
}

impl SyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::Incremental => "incremental",
            SyncMode::Full => "full",
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncMode {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "incremental" => Ok(SyncMode::Incremental),
            "full" => Ok(SyncMode::Full),
            other => bail!(ErrorKind::InvalidData, "Unknown sync mode", other),
        }
    }
}

/// Outcome stored with every checkpoint row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Success,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Success => "success",
            SyncStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(SyncStatus::Success),
            "failed" => Ok(SyncStatus::Failed),
            other => bail!(ErrorKind::InvalidState, "Unknown checkpoint status", other),
        }
    }
}

/// One row of the append-only sync log.
///
/// The most recent [`SyncStatus::Success`] row is the checkpoint the next incremental run starts
/// from. Rows are never updated once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncCheckpoint {
    pub sync_type: SyncMode,
    pub last_sync_timestamp: DateTime<Utc>,
    /// Highest business date durably written by the run, if any.
    pub last_sync_date: Option<NaiveDate>,
    pub records_synced: u64,
    pub status: SyncStatus,
    pub error_message: Option<String>,
}

impl SyncCheckpoint {
    pub fn is_success(&self) -> bool {
        self.status == SyncStatus::Success
    }
}

/// Result of a completed sync run.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutcome {
    pub mode: SyncMode,
    pub records_synced: u64,
    pub last_sync_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_mode_parsing() {
        assert_eq!("incremental".parse::<SyncMode>().unwrap(), SyncMode::Incremental);
        assert_eq!(" FULL ".parse::<SyncMode>().unwrap(), SyncMode::Full);
        assert_eq!(
            "nightly".parse::<SyncMode>().unwrap_err().kind(),
            ErrorKind::InvalidData
        );
    }

    #[test]
    fn test_status_round_trip() {
        for status in [SyncStatus::Success, SyncStatus::Failed] {
            assert_eq!(status.as_str().parse::<SyncStatus>().unwrap(), status);
        }
    }
}
