//! Process-wide driver registry.
//!
//! Drivers are registered under a unique name and looked up by generic
//! callers that only know the name and a configuration string. With the
//! `scylla` feature the bundled driver is registered as [`DRIVER_NAME`] the
//! first time the registry is touched.

use super::contract::{Conn, Driver};
use crate::error::DriverError;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use tracing::debug;

/// Name the bundled driver is registered under.
pub const DRIVER_NAME: &str = "cql";

type Registry = RwLock<BTreeMap<String, Arc<dyn Driver>>>;

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        #[allow(unused_mut)]
        let mut drivers: BTreeMap<String, Arc<dyn Driver>> = BTreeMap::new();
        #[cfg(feature = "scylla")]
        drivers.insert(
            DRIVER_NAME.to_string(),
            Arc::new(super::cql::CqlDriver::scylla()),
        );
        RwLock::new(drivers)
    })
}

/// Register `driver` under `name`. Names are unique.
pub fn register(name: &str, driver: Arc<dyn Driver>) -> Result<(), DriverError> {
    let mut drivers = registry().write().unwrap_or_else(PoisonError::into_inner);
    if drivers.contains_key(name) {
        return Err(DriverError::DuplicateDriver(name.to_string()));
    }
    drivers.insert(name.to_string(), driver);
    debug!(name, "Driver registered");
    Ok(())
}

/// The driver registered under `name`.
pub fn lookup(name: &str) -> Result<Arc<dyn Driver>, DriverError> {
    registry()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(name)
        .cloned()
        .ok_or_else(|| DriverError::UnknownDriver(name.to_string()))
}

/// Names of all registered drivers, sorted.
pub fn drivers() -> Vec<String> {
    registry()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .keys()
        .cloned()
        .collect()
}

/// Open a connection with the driver registered under `name`.
pub fn open(name: &str, config_string: &str) -> Result<Box<dyn Conn>, DriverError> {
    lookup(name)?.open(config_string)
}
