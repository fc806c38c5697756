//! Driver entry point.

use super::connection::CqlConnection;
use super::connector::CqlConnector;
use super::contract::{Conn, Connector, Driver, DriverContext};
use crate::config::decode_config;
use crate::context::Context;
use crate::error::DriverError;
use crate::native::SessionFactory;
use std::sync::Arc;

/// Opens CQL connections from configuration strings.
///
/// # Example
///
/// ```no_run
/// # #[cfg(feature = "scylla")]
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// use cql_driver::driver::{Conn, CqlDriver, Driver};
/// use cql_driver::Context;
///
/// let driver = CqlDriver::scylla();
/// let mut conn = driver.open("127.0.0.1?consistency=one&timeout=5s")?;
/// conn.ping(&Context::background()).await?;
/// conn.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CqlDriver {
    factory: Arc<dyn SessionFactory>,
}

impl CqlDriver {
    pub fn new(factory: Arc<dyn SessionFactory>) -> Self {
        Self { factory }
    }

    /// Driver backed by the bundled scylla client.
    #[cfg(feature = "scylla")]
    pub fn scylla() -> Self {
        Self::new(Arc::new(crate::native::scylla::ScyllaSessionFactory))
    }

    /// Create a connector for `hosts` with default options.
    pub fn connector<I, S>(&self, hosts: I) -> CqlConnector
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CqlConnector::new(Arc::clone(&self.factory), hosts)
    }
}

impl Driver for CqlDriver {
    fn open(&self, config_string: &str) -> Result<Box<dyn Conn>, DriverError> {
        let cluster_config = decode_config(config_string)?;
        Ok(Box::new(CqlConnection::new(
            cluster_config,
            Arc::clone(&self.factory),
            Context::background(),
        )))
    }
}

impl DriverContext for CqlDriver {
    fn open_connector(&self, config_string: &str) -> Result<Box<dyn Connector>, DriverError> {
        let cluster_config = decode_config(config_string)?;
        Ok(Box::new(CqlConnector::from_config(
            Arc::clone(&self.factory),
            cluster_config,
        )))
    }
}
