//! The generic driver contract.
//!
//! These traits describe the driver-neutral "connection / statement / rows /
//! result" shape a generic caller (a pool, a query builder) programs against.
//! The CQL implementations live next to this module.

use crate::context::Context;
use crate::error::DriverError;
use crate::types::{NamedValue, Value, ValueConverter};
use async_trait::async_trait;
use std::sync::Arc;

/// Opens connections from a configuration string.
pub trait Driver: Send + Sync {
    /// Create a connection. No I/O happens until the connection is used.
    fn open(&self, config_string: &str) -> Result<Box<dyn Conn>, DriverError>;
}

/// A driver that can parse a configuration string once and hand out a
/// reusable [`Connector`].
pub trait DriverContext: Driver {
    fn open_connector(&self, config_string: &str) -> Result<Box<dyn Connector>, DriverError>;
}

/// Produces connections from an already parsed configuration.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, ctx: &Context) -> Result<Box<dyn Conn>, DriverError>;

    fn driver(&self) -> Arc<dyn Driver>;
}

/// A single logical connection. Used by one caller at a time.
#[async_trait]
pub trait Conn: Send {
    /// Verify the connection, establishing the session first if needed.
    async fn ping(&mut self, ctx: &Context) -> Result<(), DriverError>;

    /// Prepare `query` under the connection's own context.
    async fn prepare(&mut self, query: &str) -> Result<Box<dyn Stmt>, DriverError>;

    async fn prepare_context(
        &mut self,
        ctx: &Context,
        query: &str,
    ) -> Result<Box<dyn Stmt>, DriverError>;

    async fn close(&mut self) -> Result<(), DriverError>;

    async fn begin(&mut self) -> Result<Box<dyn Tx>, DriverError>;

    async fn begin_tx(
        &mut self,
        ctx: &Context,
        opts: TxOptions,
    ) -> Result<Box<dyn Tx>, DriverError>;
}

/// A prepared statement.
#[async_trait]
pub trait Stmt: Send {
    async fn close(&mut self) -> Result<(), DriverError>;

    /// Number of placeholders, or -1 if unknown.
    fn num_input(&self) -> i32;

    async fn exec(&mut self, args: &[Value]) -> Result<Box<dyn ExecResult>, DriverError>;

    async fn exec_context(
        &mut self,
        ctx: &Context,
        args: &[NamedValue],
    ) -> Result<Box<dyn ExecResult>, DriverError>;

    async fn query(&mut self, args: &[Value]) -> Result<Box<dyn Rows>, DriverError>;

    async fn query_context(
        &mut self,
        ctx: &Context,
        args: &[NamedValue],
    ) -> Result<Box<dyn Rows>, DriverError>;

    /// Converter for values read from column `index`.
    fn column_converter(&self, index: usize) -> Box<dyn ValueConverter>;
}

/// Iterator over the rows of a query.
#[async_trait]
pub trait Rows: Send {
    /// Column names in projection order.
    fn columns(&self) -> &[String];

    /// Read the next row into `dest`. Returns `Ok(false)` at end of stream.
    async fn next(&mut self, dest: &mut [Value]) -> Result<bool, DriverError>;

    async fn close(&mut self) -> Result<(), DriverError>;
}

/// Outcome of a statement that returns no rows.
pub trait ExecResult: Send + Sync {
    fn last_insert_id(&self) -> Result<i64, DriverError>;

    fn rows_affected(&self) -> Result<i64, DriverError>;
}

/// A transaction.
#[async_trait]
pub trait Tx: Send {
    async fn commit(&mut self) -> Result<(), DriverError>;

    async fn rollback(&mut self) -> Result<(), DriverError>;
}

/// Transaction isolation requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    #[default]
    Default,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

/// Options for [`Conn::begin_tx`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TxOptions {
    pub isolation: IsolationLevel,
    pub read_only: bool,
}
