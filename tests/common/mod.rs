//! Shared helpers for the live-cluster integration tests.
//!
//! # Prerequisites
//!
//! The tests need a reachable node speaking the CQL native protocol, for
//! example a single Scylla container:
//!
//! ```bash
//! docker run -d --name cql-test -p 9042:9042 scylladb/scylla --smp 1
//! ```
//!
//! # Configuration
//!
//! | Default Constant   | Environment Variable | Default Value |
//! |--------------------|----------------------|---------------|
//! | `DEFAULT_HOST`     | `CQL_HOST`           | "127.0.0.1"   |
//! | `DEFAULT_PORT`     | `CQL_PORT`           | 9042          |
//! | -                  | `CQL_USERNAME`       | unset         |
//! | -                  | `CQL_PASSWORD`       | unset         |
//!
//! Tests skip themselves when nothing listens on the configured address.

#![allow(dead_code)]

use cql_driver::driver::{Conn, CqlDriver, Driver};
use cql_driver::DriverError;
use std::env;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";

pub const DEFAULT_PORT: u16 = 9042;

const ENV_CQL_HOST: &str = "CQL_HOST";
const ENV_CQL_PORT: &str = "CQL_PORT";
const ENV_CQL_USERNAME: &str = "CQL_USERNAME";
const ENV_CQL_PASSWORD: &str = "CQL_PASSWORD";

/// Install a `RUST_LOG` driven subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn get_host() -> String {
    env::var(ENV_CQL_HOST).unwrap_or_else(|_| DEFAULT_HOST.to_string())
}

/// Falls back to [`DEFAULT_PORT`] when `CQL_PORT` is unset or not a port.
pub fn get_port() -> u16 {
    env::var(ENV_CQL_PORT)
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

/// Credentials, when both `CQL_USERNAME` and `CQL_PASSWORD` are set.
pub fn get_credentials() -> Option<(String, String)> {
    match (env::var(ENV_CQL_USERNAME), env::var(ENV_CQL_PASSWORD)) {
        (Ok(user), Ok(password)) => Some((user, password)),
        _ => None,
    }
}

/// Configuration string for the test cluster with an optional keyspace.
pub fn get_test_config_string(keyspace: Option<&str>) -> String {
    let mut config = format!(
        "{}:{}?consistency=one&timeout=10s",
        get_host(),
        get_port()
    );
    if let Some(keyspace) = keyspace {
        config.push_str(&format!("&keyspace={}", keyspace));
    }
    if let Some((user, password)) = get_credentials() {
        config.push_str(&format!(
            "&username={}&password={}",
            urlencoding::encode(&user),
            urlencoding::encode(&password)
        ));
    }
    config
}

pub fn get_test_connection(keyspace: Option<&str>) -> Result<Box<dyn Conn>, DriverError> {
    CqlDriver::scylla().open(&get_test_config_string(keyspace))
}

/// Whether a TCP connection to the configured node can be made. Says
/// nothing about authentication or schema agreement.
pub fn is_cql_available() -> bool {
    let addr = format!("{}:{}", get_host(), get_port());
    let socket_addrs: Vec<_> = match addr.to_socket_addrs() {
        Ok(addrs) => addrs.collect(),
        Err(_) => return false,
    };

    socket_addrs
        .iter()
        .any(|socket_addr| TcpStream::connect_timeout(socket_addr, Duration::from_secs(2)).is_ok())
}

#[macro_export]
macro_rules! skip_if_no_cql {
    () => {
        if !$crate::common::is_cql_available() {
            eprintln!(
                "Skipping test: no CQL node at {}:{}",
                $crate::common::get_host(),
                $crate::common::get_port()
            );
            return;
        }
    };
}

/// Unique keyspace name so parallel runs do not collide.
pub fn generate_test_keyspace_name() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();

    format!("cql_driver_it_{}", timestamp)
}
