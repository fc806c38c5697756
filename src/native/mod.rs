//! Native client abstraction.
//!
//! This module defines the small set of operations the driver needs from a
//! native CQL client: open a session, build a query, execute it, and iterate
//! its rows. Wire protocol, topology, pooling, retries, authentication and TLS
//! all live behind these traits.

#[cfg(test)]
pub(crate) mod mock;
#[cfg(feature = "scylla")]
pub mod scylla;

use crate::config::ClusterConfig;
use crate::context::Context;
use crate::error::NativeError;
use crate::types::{CqlValue, Value};
use async_trait::async_trait;
use std::sync::Arc;

/// Metadata of one result column.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnInfo {
    pub keyspace: String,
    pub table: String,
    pub name: String,
    /// Type name as reported by the native client, e.g. `text`
    pub type_name: String,
}

impl ColumnInfo {
    pub fn new(name: &str, type_name: &str) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
            ..Self::default()
        }
    }
}

/// One column of a row as handed out by a cursor.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Decode slot filled in by [`NativeIter::scan`]. `None` until scanned, or
    /// for a null column.
    Slot(Option<CqlValue>),
    /// A bare value that was never decoded into a slot.
    Direct(CqlValue),
}

impl Cell {
    pub fn empty_slot() -> Self {
        Cell::Slot(None)
    }
}

/// Column metadata plus one decode slot per column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowData {
    pub columns: Vec<String>,
    pub values: Vec<Cell>,
}

impl RowData {
    /// Build row data with an empty decode slot for every column.
    pub fn with_slots(columns: &[ColumnInfo]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.name.clone()).collect(),
            values: vec![Cell::empty_slot(); columns.len()],
        }
    }
}

/// Opens sessions against a cluster.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn create_session(
        &self,
        config: &ClusterConfig,
        ctx: &Context,
    ) -> Result<Arc<dyn NativeSession>, NativeError>;
}

/// A live session to the cluster.
#[async_trait]
pub trait NativeSession: Send + Sync {
    /// Build a query for `statement`. Nothing is sent until it is executed.
    fn query(&self, statement: &str) -> Box<dyn NativeQuery>;

    async fn close(&self);
}

/// A query bound to a session.
#[async_trait]
pub trait NativeQuery: Send {
    /// Context honoured by the next `exec` or `iter`.
    fn with_context(&mut self, ctx: &Context);

    /// Replace the bound arguments.
    fn bind(&mut self, values: Vec<Value>);

    /// Execute without reading rows.
    async fn exec(&mut self) -> Result<(), NativeError>;

    /// Execute and open a cursor over the result. Failures are reported by the
    /// cursor's `row_data` and `close`.
    async fn iter(&mut self) -> Box<dyn NativeIter>;

    /// Free the native resources of this query.
    fn release(&mut self);
}

/// Cursor over the rows of an executed query.
#[async_trait]
pub trait NativeIter: Send {
    fn columns(&self) -> Vec<ColumnInfo>;

    /// One decode slot per column, or the error the query failed with.
    fn row_data(&self) -> Result<RowData, NativeError>;

    /// Decode the next row into `cells`. Returns false when there are no more
    /// rows or decoding failed; the failure is then reported by `close`.
    async fn scan(&mut self, cells: &mut [Cell]) -> bool;

    async fn close(&mut self) -> Result<(), NativeError>;
}
