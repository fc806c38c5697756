//! Structured cluster configuration.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Host used when a configuration names no hosts.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Consistency level requested for every operation on a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Consistency {
    Any,
    One,
    Two,
    Three,
    Quorum,
    All,
    LocalQuorum,
    EachQuorum,
    LocalOne,
}

/// Name and protocol code of every consistency level.
const CONSISTENCY_TABLE: [(Consistency, &str, u16); 9] = [
    (Consistency::Any, "any", 0x00),
    (Consistency::One, "one", 0x01),
    (Consistency::Two, "two", 0x02),
    (Consistency::Three, "three", 0x03),
    (Consistency::Quorum, "quorum", 0x04),
    (Consistency::All, "all", 0x05),
    (Consistency::LocalQuorum, "localQuorum", 0x06),
    (Consistency::EachQuorum, "eachQuorum", 0x07),
    (Consistency::LocalOne, "localOne", 0x0A),
];

impl Consistency {
    /// Look up a level by its configuration name.
    pub fn from_name(name: &str) -> Option<Self> {
        CONSISTENCY_TABLE
            .iter()
            .find(|(_, n, _)| *n == name)
            .map(|(c, _, _)| *c)
    }

    /// Look up a level by its protocol code.
    pub fn from_code(code: u16) -> Option<Self> {
        CONSISTENCY_TABLE
            .iter()
            .find(|(_, _, c)| *c == code)
            .map(|(c, _, _)| *c)
    }

    pub fn name(&self) -> &'static str {
        CONSISTENCY_TABLE
            .iter()
            .find(|(c, _, _)| c == self)
            .map(|(_, n, _)| *n)
            .unwrap_or("quorum")
    }

    pub fn code(&self) -> u16 {
        CONSISTENCY_TABLE
            .iter()
            .find(|(c, _, _)| c == self)
            .map(|(_, _, code)| *code)
            .unwrap_or(0x04)
    }
}

impl Default for Consistency {
    fn default() -> Self {
        Consistency::Quorum
    }
}

impl fmt::Display for Consistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Consistency {
    type Err = ConfigError;

    /// Accepts either a level name (`localQuorum`) or its numeric code (`6`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let found = match s.parse::<u16>() {
            Ok(code) => Consistency::from_code(code),
            Err(_) => Consistency::from_name(s),
        };
        found.ok_or_else(|| ConfigError::InvalidValue {
            key: "consistency".to_string(),
            value: s.to_string(),
        })
    }
}

/// Username/password credential sent during the authentication handshake.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordAuthenticator {
    pub username: String,
    pub password: String,
}

impl PasswordAuthenticator {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// Prevent password from being displayed in debug output
impl fmt::Debug for PasswordAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordAuthenticator")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// TLS material paths. Negotiation itself belongs to the native client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SslOptions {
    pub ca_path: String,
    pub cert_path: String,
    pub key_path: String,
    pub enable_host_verification: bool,
}

/// Everything needed to open a session against a cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Contact points, never empty
    pub hosts: Vec<String>,

    /// Default consistency for every request
    pub consistency: Consistency,

    /// Per-request timeout
    pub timeout: Duration,

    /// Timeout for establishing each connection
    pub connect_timeout: Duration,

    /// Connections per host
    pub num_conns: usize,

    /// Keyspace selected after connecting (empty for none)
    pub keyspace: String,

    /// How long writes wait to be coalesced into one flush
    pub write_coalesce_wait_time: Duration,

    /// Use the contact address instead of the address a peer advertises
    pub ignore_peer_addr: bool,

    /// Skip the initial topology lookup and use the contact points only
    pub disable_initial_host_lookup: bool,

    pub authenticator: Option<PasswordAuthenticator>,

    pub ssl_opts: Option<SslOptions>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            hosts: vec![DEFAULT_HOST.to_string()],
            consistency: Consistency::Quorum,
            timeout: Duration::from_secs(11),
            connect_timeout: Duration::from_secs(11),
            num_conns: 2,
            keyspace: String::new(),
            write_coalesce_wait_time: Duration::from_micros(200),
            ignore_peer_addr: false,
            disable_initial_host_lookup: false,
            authenticator: None,
            ssl_opts: None,
        }
    }
}

impl ClusterConfig {
    /// Create a configuration for the given hosts with every other field at
    /// its default. An empty host list falls back to [`DEFAULT_HOST`].
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let hosts: Vec<String> = hosts.into_iter().map(Into::into).collect();
        let mut config = Self::default();
        if !hosts.is_empty() {
            config.hosts = hosts;
        }
        config
    }

    pub fn with_consistency(mut self, consistency: Consistency) -> Self {
        self.consistency = consistency;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set connections per host. Zero is ignored.
    pub fn with_num_conns(mut self, num_conns: usize) -> Self {
        if num_conns > 0 {
            self.num_conns = num_conns;
        }
        self
    }

    pub fn with_keyspace(mut self, keyspace: &str) -> Self {
        self.keyspace = keyspace.to_string();
        self
    }

    pub fn with_write_coalesce_wait_time(mut self, wait: Duration) -> Self {
        self.write_coalesce_wait_time = wait;
        self
    }

    pub fn with_ignore_peer_addr(mut self, ignore: bool) -> Self {
        self.ignore_peer_addr = ignore;
        self
    }

    pub fn with_disable_initial_host_lookup(mut self, disable: bool) -> Self {
        self.disable_initial_host_lookup = disable;
        self
    }

    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.authenticator = Some(PasswordAuthenticator::new(username, password));
        self
    }

    pub fn with_ssl_opts(mut self, ssl_opts: SslOptions) -> Self {
        self.ssl_opts = Some(ssl_opts);
        self
    }
}

impl FromStr for ClusterConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        super::codec::decode_config(s)
    }
}

impl fmt::Display for ClusterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&super::codec::encode_config(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_round_trip() {
        let config = ClusterConfig::new(["node1", "node2"])
            .with_consistency(Consistency::LocalQuorum)
            .with_keyspace("metrics")
            .with_credentials("app", "s3cr3t")
            .with_ssl_opts(SslOptions {
                ca_path: "/etc/ca.pem".to_string(),
                ..SslOptions::default()
            });

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"consistency\":\"localQuorum\""));

        let decoded: ClusterConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, config);
    }

    #[test]
    fn test_consistency_serde_names_match_table() {
        for (level, name, _) in CONSISTENCY_TABLE {
            let json = serde_json::to_string(&level).unwrap();
            assert_eq!(json, format!("\"{}\"", name));
            let decoded: Consistency = serde_json::from_str(&json).unwrap();
            assert_eq!(decoded, level);
        }
    }

    #[test]
    fn test_defaults() {
        let config = ClusterConfig::default();
        assert_eq!(config.hosts, vec!["127.0.0.1".to_string()]);
        assert_eq!(config.consistency, Consistency::Quorum);
        assert_eq!(config.timeout, Duration::from_secs(11));
        assert_eq!(config.connect_timeout, Duration::from_secs(11));
        assert_eq!(config.num_conns, 2);
        assert_eq!(config.write_coalesce_wait_time, Duration::from_micros(200));
        assert!(config.authenticator.is_none());
        assert!(config.ssl_opts.is_none());
    }

    #[test]
    fn test_new_with_empty_hosts_uses_default_host() {
        let config = ClusterConfig::new(Vec::<String>::new());
        assert_eq!(config.hosts, vec![DEFAULT_HOST.to_string()]);

        let config = ClusterConfig::new(["node1", "node2"]);
        assert_eq!(config.hosts, vec!["node1".to_string(), "node2".to_string()]);
    }

    #[test]
    fn test_builder_setters() {
        let config = ClusterConfig::new(["node1"])
            .with_consistency(Consistency::LocalOne)
            .with_keyspace("system")
            .with_num_conns(0)
            .with_credentials("cassandra", "secret");

        assert_eq!(config.consistency, Consistency::LocalOne);
        assert_eq!(config.keyspace, "system");
        assert_eq!(config.num_conns, 2);
        assert_eq!(
            config.authenticator,
            Some(PasswordAuthenticator::new("cassandra", "secret"))
        );
    }

    #[test]
    fn test_consistency_table() {
        assert_eq!(Consistency::from_name("localOne"), Some(Consistency::LocalOne));
        assert_eq!(Consistency::from_code(10), Some(Consistency::LocalOne));
        assert_eq!(Consistency::from_code(8), None);
        assert_eq!(Consistency::EachQuorum.code(), 7);
        assert_eq!(Consistency::LocalQuorum.name(), "localQuorum");
    }

    #[test]
    fn test_consistency_from_str_accepts_name_and_code() {
        assert_eq!("one".parse::<Consistency>(), Ok(Consistency::One));
        assert_eq!("1".parse::<Consistency>(), Ok(Consistency::One));
        assert!("ONE".parse::<Consistency>().is_err());
        assert!("99".parse::<Consistency>().is_err());
    }

    #[test]
    fn test_debug_no_password_leak() {
        let config = ClusterConfig::default().with_credentials("admin", "super_secret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super_secret"));
        assert!(debug.contains("admin"));
    }
}
