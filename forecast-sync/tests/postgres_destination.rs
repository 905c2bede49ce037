#![cfg(feature = "postgres-tests")]

mod common;

use common::records::{date, forecast};
use forecast_sync::checkpoint::postgres::PostgresCheckpointStore;
use forecast_sync::checkpoint::CheckpointStore;
use forecast_sync::clients::postgres::PgSession;
use forecast_sync::destination::postgres::PostgresDestination;
use forecast_sync::destination::Destination;
use forecast_sync::error::ErrorKind;
use forecast_sync::types::{SyncCheckpoint, SyncMode, SyncStatus};
use forecast_sync_config::shared::TlsConfig;
use forecast_sync_telemetry::tracing::init_test_tracing;
use secrecy::SecretString;
use std::sync::Arc;

/// Connects to the database in `TESTS_DATABASE_URL` and empties the sync tables.
async fn session() -> Arc<PgSession> {
    let database_url = std::env::var("TESTS_DATABASE_URL")
        .expect("TESTS_DATABASE_URL must be set to run postgres tests");
    let session = PgSession::connect(&SecretString::from(database_url), &TlsConfig::default())
        .await
        .unwrap();
    let session = Arc::new(session);

    PostgresDestination::new(session.clone())
        .create_schema()
        .await
        .unwrap();
    PostgresCheckpointStore::new(session.clone())
        .create_schema()
        .await
        .unwrap();
    session
        .client()
        .await
        .batch_execute("truncate forecast_data, forecast_sync_status restart identity")
        .await
        .unwrap();

    session
}

async fn stored_y_50(session: &PgSession) -> Vec<(i32, String)> {
    session
        .client()
        .await
        .query(
            "select restaurant_id, y_50::text from forecast_data order by restaurant_id",
            &[],
        )
        .await
        .unwrap()
        .iter()
        .map(|row| (row.get(0), row.get(1)))
        .collect()
}

// The tests share two fixed tables, so they run as one sequence.
#[tokio::test(flavor = "multi_thread")]
async fn test_postgres_destination_and_checkpoints() {
    init_test_tracing();

    let session = session().await;
    let destination = PostgresDestination::new(session.clone());
    let checkpoints = PostgresCheckpointStore::new(session.clone());

    // Schema creation is repeatable.
    destination.create_schema().await.unwrap();
    checkpoints.create_schema().await.unwrap();

    destination
        .upsert_batches(vec![
            vec![forecast(1, "2024-01-01", 10.0), forecast(2, "2024-01-01", 20.0)],
            vec![forecast(3, "2024-01-01", 30.0)],
        ])
        .await
        .unwrap();
    destination
        .upsert_batches(vec![vec![forecast(1, "2024-01-01", 15.5)]])
        .await
        .unwrap();

    assert_eq!(
        stored_y_50(&session).await,
        vec![
            (1, "15.50".to_owned()),
            (2, "20.00".to_owned()),
            (3, "30.00".to_owned())
        ]
    );

    // A failing batch rolls the earlier ones back.
    let mut bad = forecast(5, "2024-01-02", 10.0);
    bad.state = "CAL".to_owned();
    let err = destination
        .upsert_batches(vec![vec![forecast(4, "2024-01-02", 10.0)], vec![bad]])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WriteFailed);
    assert_eq!(stored_y_50(&session).await.len(), 3);

    assert_eq!(checkpoints.latest_successful().await.unwrap(), None);
    for (status, day) in [
        (SyncStatus::Success, "2024-01-01"),
        (SyncStatus::Success, "2024-01-02"),
        (SyncStatus::Failed, "2024-01-03"),
    ] {
        checkpoints
            .append(SyncCheckpoint {
                sync_type: SyncMode::Incremental,
                last_sync_timestamp: chrono::Utc::now(),
                last_sync_date: Some(date(day)),
                records_synced: 3,
                status,
                error_message: (status == SyncStatus::Failed).then(|| "boom".to_owned()),
            })
            .await
            .unwrap();
    }

    let latest = checkpoints.latest_successful().await.unwrap().unwrap();
    assert_eq!(latest.last_sync_date, Some(date("2024-01-02")));
    assert_eq!(latest.records_synced, 3);
    assert_eq!(latest.sync_type, SyncMode::Incremental);

    drop(destination);
    drop(checkpoints);
    if let Ok(session) = Arc::try_unwrap(session) {
        session.close().await;
    }
}
