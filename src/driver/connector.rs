//! Connector: opens connections from a parsed configuration.

use super::connection::CqlConnection;
use super::contract::{Conn, Connector, Driver};
use super::cql::CqlDriver;
use crate::config::ClusterConfig;
use crate::context::Context;
use crate::error::DriverError;
use crate::native::SessionFactory;
use async_trait::async_trait;
use std::sync::Arc;

/// Hands out connections that share one [`ClusterConfig`].
///
/// # Example
///
/// ```
/// # use cql_driver::driver::CqlConnector;
/// # use cql_driver::native::SessionFactory;
/// # use std::sync::Arc;
/// # fn example(factory: Arc<dyn SessionFactory>) {
/// let mut connector = CqlConnector::new(factory, ["10.0.0.1", "10.0.0.2"]);
/// connector.cluster_config_mut().keyspace = "metrics".to_string();
/// # }
/// ```
pub struct CqlConnector {
    cluster_config: ClusterConfig,
    factory: Arc<dyn SessionFactory>,
}

impl CqlConnector {
    /// Create a connector for `hosts` with default options. An empty host
    /// list uses the default host.
    pub fn new<I, S>(factory: Arc<dyn SessionFactory>, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_config(factory, ClusterConfig::new(hosts))
    }

    pub fn from_config(factory: Arc<dyn SessionFactory>, cluster_config: ClusterConfig) -> Self {
        Self {
            cluster_config,
            factory,
        }
    }

    pub fn cluster_config(&self) -> &ClusterConfig {
        &self.cluster_config
    }

    /// Options changed here apply to connections created afterwards.
    pub fn cluster_config_mut(&mut self) -> &mut ClusterConfig {
        &mut self.cluster_config
    }
}

#[async_trait]
impl Connector for CqlConnector {
    /// Create an unconnected connection. `ctx` becomes the connection's
    /// context for [`Conn::prepare`].
    async fn connect(&self, ctx: &Context) -> Result<Box<dyn Conn>, DriverError> {
        Ok(Box::new(CqlConnection::new(
            self.cluster_config.clone(),
            Arc::clone(&self.factory),
            ctx.clone(),
        )))
    }

    fn driver(&self) -> Arc<dyn Driver> {
        Arc::new(CqlDriver::new(Arc::clone(&self.factory)))
    }
}
