//! Generic driver contract and its CQL implementation.
//!
//! Control flows from a [`CqlDriver`] or [`CqlConnector`] to a lazily
//! connected [`CqlConnection`], then to a [`CqlStatement`] that yields either a
//! [`CqlResult`] or [`CqlRows`].

mod connection;
mod connector;
mod contract;
mod cql;
pub mod registry;
mod result;
mod rows;
mod statement;

pub use connection::{CqlConnection, PING_QUERY};
pub use connector::CqlConnector;
pub use contract::{
    Conn, Connector, Driver, DriverContext, ExecResult, IsolationLevel, Rows, Stmt, Tx, TxOptions,
};
pub use cql::CqlDriver;
pub use registry::DRIVER_NAME;
pub use result::CqlResult;
pub use rows::CqlRows;
pub use statement::CqlStatement;
