use serde_json::Value;
use tracing::{info, warn};

use crate::types::SyncMode;

const FORECAST_KEY_PREFIX: &str = "forecast/";

/// What started an invocation, reduced to the parts that select the sync mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerEvent {
    /// Object storage notification, with the object keys it carries.
    ObjectCreated { keys: Vec<String> },
    /// Scheduled run.
    Schedule,
    /// Deployment hook, with the mode it asked for.
    Deployment { sync_type: Option<String> },
    /// Generic event with a `detail-type`, with `detail.sync_type`.
    Custom { sync_type: Option<String> },
    Unknown,
}

impl TriggerEvent {
    /// Classifies a raw event. Shapes are checked in a fixed order and the first match wins.
    pub fn parse(event: &Value) -> Self {
        if let Some(records) = event.get("Records").and_then(Value::as_array) {
            let keys = records
                .iter()
                .filter_map(|record| record.pointer("/s3/object/key"))
                .filter_map(Value::as_str)
                .map(ToOwned::to_owned)
                .collect();

            return TriggerEvent::ObjectCreated { keys };
        }

        match event.get("source").and_then(Value::as_str) {
            Some("aws.events") => return TriggerEvent::Schedule,
            Some("github.actions") => {
                return TriggerEvent::Deployment {
                    sync_type: string_field(event, "/sync_type"),
                }
            }
            _ => {}
        }

        if event.get("detail-type").is_some() {
            return TriggerEvent::Custom {
                sync_type: string_field(event, "/detail/sync_type"),
            };
        }

        TriggerEvent::Unknown
    }

    /// The sync mode this event asks for.
    pub fn sync_mode(&self) -> SyncMode {
        match self {
            TriggerEvent::ObjectCreated { keys } => {
                for key in keys.iter().filter(|key| key.starts_with(FORECAST_KEY_PREFIX)) {
                    info!(key = %key, "new forecast object");
                }
                SyncMode::Incremental
            }
            TriggerEvent::Schedule | TriggerEvent::Unknown => SyncMode::Incremental,
            TriggerEvent::Deployment { sync_type } => {
                mode_or_incremental(sync_type.as_deref().unwrap_or("full"))
            }
            TriggerEvent::Custom { sync_type } => sync_type
                .as_deref()
                .map_or(SyncMode::Incremental, mode_or_incremental),
        }
    }
}

fn string_field(event: &Value, pointer: &str) -> Option<String> {
    event
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
}

fn mode_or_incremental(sync_type: &str) -> SyncMode {
    sync_type.parse().unwrap_or_else(|_| {
        warn!(sync_type, "unrecognized sync type, using incremental");
        SyncMode::Incremental
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_notification_is_incremental() {
        let event = json!({
            "Records": [
                {"s3": {"object": {"key": "forecast/2024-01-01.parquet"}}},
                {"s3": {"object": {"key": "other/file.csv"}}}
            ],
            "source": "github.actions",
            "sync_type": "full"
        });

        let trigger = TriggerEvent::parse(&event);

        assert_eq!(
            trigger,
            TriggerEvent::ObjectCreated {
                keys: vec![
                    "forecast/2024-01-01.parquet".to_owned(),
                    "other/file.csv".to_owned()
                ]
            }
        );
        assert_eq!(trigger.sync_mode(), SyncMode::Incremental);
    }

    #[test]
    fn test_schedule_is_incremental() {
        let trigger = TriggerEvent::parse(&json!({"source": "aws.events"}));

        assert_eq!(trigger, TriggerEvent::Schedule);
        assert_eq!(trigger.sync_mode(), SyncMode::Incremental);
    }

    #[test]
    fn test_deployment_defaults_to_full() {
        let default = TriggerEvent::parse(&json!({"source": "github.actions"}));
        let explicit =
            TriggerEvent::parse(&json!({"source": "github.actions", "sync_type": "incremental"}));

        assert_eq!(default.sync_mode(), SyncMode::Full);
        assert_eq!(explicit.sync_mode(), SyncMode::Incremental);
    }

    #[test]
    fn test_custom_event_reads_detail() {
        let full = TriggerEvent::parse(&json!({
            "detail-type": "Forecast Sync",
            "detail": {"sync_type": "full"}
        }));
        let bare = TriggerEvent::parse(&json!({"detail-type": "Forecast Sync"}));

        assert_eq!(full.sync_mode(), SyncMode::Full);
        assert_eq!(bare.sync_mode(), SyncMode::Incremental);
    }

    #[test]
    fn test_unknown_shapes_and_modes_are_incremental() {
        assert_eq!(TriggerEvent::parse(&json!({})).sync_mode(), SyncMode::Incremental);
        assert_eq!(TriggerEvent::parse(&json!([1, 2])), TriggerEvent::Unknown);

        let odd = TriggerEvent::parse(&json!({"source": "github.actions", "sync_type": "nightly"}));
        assert_eq!(odd.sync_mode(), SyncMode::Incremental);
    }
}
