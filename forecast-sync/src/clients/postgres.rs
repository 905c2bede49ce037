use forecast_sync_config::shared::TlsConfig;
use rustls::ClientConfig;
use secrecy::{ExposeSecret, SecretString};
use std::io::BufReader;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio_postgres::tls::MakeTlsConnect;
use tokio_postgres::{Client, Config, Connection, NoTls, Socket};
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::{error, info, Instrument};

use crate::error::{ErrorKind, SyncResult};
use crate::sync_error;

/// Drives the connection future on its own task, in the span of the caller.
fn spawn_postgres_connection<T>(connection: Connection<Socket, T::Stream>) -> JoinHandle<()>
where
    T: MakeTlsConnect<Socket>,
    T::Stream: Send + 'static,
{
    let span = tracing::Span::current();
    let task = async move {
        if let Err(e) = connection.await {
            error!("an error occurred during the Postgres connection: {}", e);
            return;
        }

        info!("postgres connection terminated successfully")
    }
    .instrument(span);

    tokio::spawn(task)
}

/// A Postgres connection held for the duration of one invocation.
///
/// The session owns both the client and the task driving the connection. Dropping it tears the
/// connection down, so an early return or a failed run cannot leak it. [`PgSession::close`]
/// does the same gracefully.
pub struct PgSession {
    client: Mutex<Client>,
    connection_task: Option<JoinHandle<()>>,
}

impl PgSession {
    /// Connects to the database behind `database_url`, with TLS when enabled in `tls`.
    pub async fn connect(database_url: &SecretString, tls: &TlsConfig) -> SyncResult<Self> {
        // The parse error may echo the url, which carries the password.
        let config = database_url
            .expose_secret()
            .parse::<Config>()
            .map_err(|_| sync_error!(ErrorKind::ConfigError, "Invalid database connection url"))?;

        if tls.enabled {
            Self::connect_tls(config, tls).await
        } else {
            Self::connect_no_tls(config).await
        }
    }

    async fn connect_no_tls(config: Config) -> SyncResult<Self> {
        let (client, connection) = config.connect(NoTls).await?;
        let connection_task = spawn_postgres_connection::<NoTls>(connection);

        info!("successfully connected to postgres without tls");

        Ok(Self::new(client, connection_task))
    }

    async fn connect_tls(config: Config, tls: &TlsConfig) -> SyncResult<Self> {
        let mut root_store = rustls::RootCertStore::empty();
        let mut root_certs_reader = BufReader::new(tls.trusted_root_certs.as_bytes());
        for cert in rustls_pemfile::certs(&mut root_certs_reader) {
            let cert = cert?;
            root_store.add(cert)?;
        }

        let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
        let tls_config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .with_root_certificates(root_store)
            .with_no_client_auth();

        let (client, connection) = config.connect(MakeRustlsConnect::new(tls_config)).await?;
        let connection_task = spawn_postgres_connection::<MakeRustlsConnect>(connection);

        info!("successfully connected to postgres with tls");

        Ok(Self::new(client, connection_task))
    }

    fn new(client: Client, connection_task: JoinHandle<()>) -> Self {
        Self {
            client: Mutex::new(client),
            connection_task: Some(connection_task),
        }
    }

    /// Locks the client. Holding the guard gives `&mut Client`, needed to open a transaction.
    pub async fn client(&self) -> MutexGuard<'_, Client> {
        self.client.lock().await
    }

    /// Closes the connection and waits for its task to finish.
    pub async fn close(mut self) {
        let connection_task = self.connection_task.take();
        // Dropping the client makes the connection future resolve.
        drop(self);

        if let Some(connection_task) = connection_task {
            let _ = connection_task.await;
        }
    }
}

impl Drop for PgSession {
    fn drop(&mut self) {
        if let Some(connection_task) = self.connection_task.take() {
            connection_task.abort();
        }
    }
}
