//! Connection lifecycle and health check.
//!
//! A [`CqlConnection`] starts without a session. The first [`Conn::ping`] or
//! [`Conn::prepare`] opens one through the [`SessionFactory`] and validates it
//! with a single-row health query. Any failure on that path tears the session
//! down and is reported as [`DriverError::BadConnection`]; the root cause only
//! goes to the `tracing` subscriber.

use super::contract::{Conn, Stmt, Tx, TxOptions};
use super::statement::CqlStatement;
use crate::config::ClusterConfig;
use crate::context::Context;
use crate::error::{DriverError, NativeError};
use crate::native::{Cell, NativeQuery, NativeSession, SessionFactory};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Health query issued by [`Conn::ping`].
pub const PING_QUERY: &str = "select cql_version from system.local";

/// A session together with the health query prepared on it. One never exists
/// without the other.
struct LiveSession {
    session: Arc<dyn NativeSession>,
    ping_query: Box<dyn NativeQuery>,
}

/// Why a health check failed.
#[derive(Debug)]
enum PingFailure {
    CreateSession(NativeError),
    RowData(NativeError),
    ColumnCount(usize),
    Scan(Option<NativeError>),
    IterClose(NativeError),
    NotText,
    EmptyValue,
}

impl fmt::Display for PingFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PingFailure::CreateSession(e) => write!(f, "Ping create session error: {}", e),
            PingFailure::RowData(e) => write!(f, "Ping row data error: {}", e),
            PingFailure::ColumnCount(n) => write!(f, "Ping column count {} != 1", n),
            PingFailure::Scan(Some(e)) => write!(f, "Ping scan error: {}", e),
            PingFailure::Scan(None) => write!(f, "Ping scan error: no row"),
            PingFailure::IterClose(e) => write!(f, "Ping iter close error: {}", e),
            PingFailure::NotText => write!(f, "Ping value not text"),
            PingFailure::EmptyValue => write!(f, "Ping empty value"),
        }
    }
}

/// Connection to a cluster with a lazily opened session.
pub struct CqlConnection {
    cluster_config: ClusterConfig,
    factory: Arc<dyn SessionFactory>,
    context: Context,
    live: Option<LiveSession>,
}

impl CqlConnection {
    /// Create an unconnected connection. `context` is used by
    /// [`Conn::prepare`].
    pub fn new(
        cluster_config: ClusterConfig,
        factory: Arc<dyn SessionFactory>,
        context: Context,
    ) -> Self {
        Self {
            cluster_config,
            factory,
            context,
            live: None,
        }
    }

    pub fn cluster_config(&self) -> &ClusterConfig {
        &self.cluster_config
    }

    /// Mutable access to the configuration. Changes apply to the next session
    /// opened by this connection.
    pub fn cluster_config_mut(&mut self) -> &mut ClusterConfig {
        &mut self.cluster_config
    }

    /// Whether a session is currently open.
    pub fn is_connected(&self) -> bool {
        self.live.is_some()
    }

    /// Replace the cached health query. Has no effect without a session.
    pub fn set_ping_query(&mut self, statement: &str) {
        if let Some(live) = self.live.as_mut() {
            live.ping_query = live.session.query(statement);
        }
    }

    async fn open_session(&mut self, ctx: &Context) -> Result<(), PingFailure> {
        let session = self
            .factory
            .create_session(&self.cluster_config, ctx)
            .await
            .map_err(PingFailure::CreateSession)?;
        let ping_query = session.query(PING_QUERY);
        debug!(hosts = ?self.cluster_config.hosts, "Session opened");
        self.live = Some(LiveSession {
            session,
            ping_query,
        });
        Ok(())
    }

    async fn check_health(&mut self, ctx: &Context) -> Result<(), PingFailure> {
        if self.live.is_none() {
            self.open_session(ctx).await?;
        }
        let Some(live) = self.live.as_mut() else {
            return Ok(());
        };

        live.ping_query.with_context(ctx);
        let mut iter = live.ping_query.iter().await;

        let mut row = match iter.row_data() {
            Ok(row) => row,
            Err(err) => {
                let _ = iter.close().await;
                return Err(PingFailure::RowData(err));
            }
        };
        if row.values.len() != 1 {
            let _ = iter.close().await;
            return Err(PingFailure::ColumnCount(row.values.len()));
        }

        if !iter.scan(&mut row.values).await {
            return Err(PingFailure::Scan(iter.close().await.err()));
        }
        iter.close().await.map_err(PingFailure::IterClose)?;

        match &row.values[0] {
            Cell::Slot(None) => Err(PingFailure::EmptyValue),
            Cell::Slot(Some(value)) => match value.as_text() {
                Some("") => Err(PingFailure::EmptyValue),
                Some(_) => Ok(()),
                None => Err(PingFailure::NotText),
            },
            Cell::Direct(_) => Err(PingFailure::NotText),
        }
    }

    async fn close_session(&mut self) {
        if let Some(live) = self.live.take() {
            live.session.close().await;
            debug!(hosts = ?self.cluster_config.hosts, "Session closed");
        }
    }
}

#[async_trait]
impl Conn for CqlConnection {
    async fn ping(&mut self, ctx: &Context) -> Result<(), DriverError> {
        match self.check_health(ctx).await {
            Ok(()) => Ok(()),
            Err(failure) => {
                self.close_session().await;
                warn!(cause = %failure, "Connection health check failed");
                Err(DriverError::BadConnection)
            }
        }
    }

    async fn prepare(&mut self, query: &str) -> Result<Box<dyn Stmt>, DriverError> {
        let ctx = self.context.clone();
        self.prepare_context(&ctx, query).await
    }

    async fn prepare_context(
        &mut self,
        ctx: &Context,
        query: &str,
    ) -> Result<Box<dyn Stmt>, DriverError> {
        if self.live.is_none() {
            self.ping(ctx).await?;
        }
        let live = self.live.as_ref().ok_or(DriverError::BadConnection)?;

        let mut native_query = live.session.query(query);
        native_query.with_context(ctx);
        debug!(query, "Statement prepared");
        Ok(Box::new(CqlStatement::new(native_query)))
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        self.close_session().await;
        Ok(())
    }

    async fn begin(&mut self) -> Result<Box<dyn Tx>, DriverError> {
        Err(DriverError::NotSupported)
    }

    async fn begin_tx(
        &mut self,
        _ctx: &Context,
        _opts: TxOptions,
    ) -> Result<Box<dyn Tx>, DriverError> {
        Err(DriverError::NotSupported)
    }
}
