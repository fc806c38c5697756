//! Cluster configuration and its string encoding.
//!
//! A [`ClusterConfig`] can be built directly or decoded from a configuration
//! string of the form `host1,host2?key=value&key=value`.

mod cluster;
mod codec;

pub use cluster::{ClusterConfig, Consistency, PasswordAuthenticator, SslOptions, DEFAULT_HOST};
pub use codec::{decode_config, encode_config};
