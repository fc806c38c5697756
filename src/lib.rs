//! # cql-driver-rs
//!
//! Generic "connection / statement / rows / result" driver for Cassandra
//! compatible clusters.
//!
//! The crate translates calls in the driver-neutral shape into operations on a
//! native CQL client and translates results and errors back. The native client
//! sits behind the [`native`] traits; the `scylla` feature bundles an
//! implementation built on the scylla driver.
//!
//! ## Example
//!
//! ```no_run
//! # #[cfg(feature = "scylla")]
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use cql_driver::driver::{registry, Conn, Rows, Stmt};
//! use cql_driver::{Context, NamedValue, Value};
//!
//! // Open a connection; the session is created on first use
//! let mut conn = registry::open("cql", "127.0.0.1?consistency=one&keyspace=system")?;
//! conn.ping(&Context::background()).await?;
//!
//! // Query with ordinal arguments
//! let mut stmt = conn
//!     .prepare("SELECT keyspace_name FROM system_schema.keyspaces WHERE keyspace_name = ?")
//!     .await?;
//! let ctx = Context::background();
//! let mut rows = stmt
//!     .query_context(&ctx, &[NamedValue::positional(1, "system")])
//!     .await?;
//!
//! let mut row = vec![Value::Null; rows.columns().len()];
//! while rows.next(&mut row).await? {
//!     println!("{:?}", row);
//! }
//!
//! rows.close().await?;
//! stmt.close().await?;
//! conn.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod driver;
pub mod error;
pub mod native;
pub mod types;

// Re-export public API
pub use config::{decode_config, encode_config, ClusterConfig, Consistency};
pub use context::Context;
pub use driver::{CqlConnection, CqlConnector, CqlDriver, CqlRows, CqlStatement};
pub use error::{ConfigError, ConversionError, DriverError, ErrorKind, NativeError};
pub use types::{CqlDuration, CqlValue, NamedValue, Value};
