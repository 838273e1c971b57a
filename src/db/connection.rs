//! Per-call connection lifecycle.
//!
//! Every driver operation opens one dedicated connection, runs, and closes it.
//! Nothing is pooled or shared between calls. [`scoped`] is the only way the
//! drivers obtain a connection, so the release guarantee lives in one place:
//!
//! - the op returns `Ok` or `Err`: the connection is closed gracefully
//! - the op exceeds the query timeout: the op future is dropped and the
//!   connection is aborted
//! - opening fails or times out: there is nothing to close
//!
//! A panic inside the op unwinds through `scoped`, dropping the connection,
//! which closes its socket.

use crate::config::DriverOptions;
use crate::error::{DriverError, DriverResult};
use futures_util::future::BoxFuture;
use sqlx::Connection;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use std::future::Future;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Opens and releases connections for one engine.
pub trait Connector: Send + Sync {
    type Connection: Send;

    /// Establish a new connection (network handshake + auth).
    fn open(&self) -> impl Future<Output = DriverResult<Self::Connection>> + Send;

    /// Close gracefully.
    fn close(&self, conn: Self::Connection) -> impl Future<Output = DriverResult<()>> + Send;

    /// Close without a shutdown handshake; used after a timeout, when the
    /// connection may be mid-query.
    fn abort(&self, conn: Self::Connection) -> impl Future<Output = ()> + Send;
}

/// Run `op` against a fresh connection and release it on every exit path.
///
/// `operation` names the call in logs and timeout errors.
pub async fn scoped<C, F, T>(
    connector: &C,
    options: &DriverOptions,
    operation: &'static str,
    op: F,
) -> DriverResult<T>
where
    C: Connector,
    F: for<'c> FnOnce(&'c mut C::Connection) -> BoxFuture<'c, DriverResult<T>> + Send,
    T: Send,
{
    let mut conn = match timeout(options.connect_timeout, connector.open()).await {
        Ok(opened) => opened?,
        Err(_) => {
            return Err(DriverError::timeout(
                format!("{}: connect", operation),
                options.connect_timeout.as_secs(),
            ));
        }
    };
    debug!(operation, "Connection opened");

    match timeout(options.query_timeout, op(&mut conn)).await {
        Ok(result) => {
            if let Err(e) = connector.close(conn).await {
                warn!(operation, error = %e, "Connection did not close cleanly");
            } else {
                debug!(operation, "Connection closed");
            }
            result
        }
        Err(_) => {
            warn!(
                operation,
                timeout_secs = options.query_timeout.as_secs(),
                "Operation timed out, aborting connection"
            );
            connector.abort(conn).await;
            Err(DriverError::timeout(
                operation,
                options.query_timeout.as_secs(),
            ))
        }
    }
}

// =============================================================================
// sqlx Connectors
// =============================================================================

/// Opens a single `PgConnection` per call.
#[derive(Debug, Clone)]
pub struct PgConnector {
    options: PgConnectOptions,
}

impl PgConnector {
    pub fn new(options: PgConnectOptions) -> Self {
        Self { options }
    }
}

impl Connector for PgConnector {
    type Connection = PgConnection;

    async fn open(&self) -> DriverResult<PgConnection> {
        PgConnection::connect_with(&self.options)
            .await
            .map_err(DriverError::from_connect)
    }

    async fn close(&self, conn: PgConnection) -> DriverResult<()> {
        conn.close().await.map_err(DriverError::from)
    }

    async fn abort(&self, conn: PgConnection) {
        // Dropping the connection closes the socket without a Terminate message.
        drop(conn);
    }
}

/// Opens a single `MySqlConnection` per call.
#[derive(Debug, Clone)]
pub struct MySqlConnector {
    options: MySqlConnectOptions,
}

impl MySqlConnector {
    pub fn new(options: MySqlConnectOptions) -> Self {
        Self { options }
    }
}

impl Connector for MySqlConnector {
    type Connection = MySqlConnection;

    async fn open(&self) -> DriverResult<MySqlConnection> {
        MySqlConnection::connect_with(&self.options)
            .await
            .map_err(DriverError::from_connect)
    }

    async fn close(&self, conn: MySqlConnection) -> DriverResult<()> {
        conn.close().await.map_err(DriverError::from)
    }

    async fn abort(&self, conn: MySqlConnection) {
        drop(conn);
    }
}
