//! Configuration string codec.
//!
//! The grammar is `hosts[?key=value[&key=value...]]` where `hosts` is a
//! comma-separated list. Encoding emits keys in a fixed order so that two equal
//! configurations always produce the same string.

use super::cluster::{ClusterConfig, Consistency, PasswordAuthenticator, SslOptions};
use crate::error::ConfigError;
use std::time::Duration;

/// Decode a configuration string into a [`ClusterConfig`].
///
/// Negative durations and non-positive `numConns` values are accepted but
/// leave the default in place. Supplying `username` or `password` creates the
/// credential even when the value is empty, and any TLS key creates the TLS
/// options.
///
/// # Examples
///
/// ```
/// # use cql_driver::config::{decode_config, Consistency};
/// let config = decode_config("one,two,three?consistency=one")?;
/// assert_eq!(config.hosts, vec!["one", "two", "three"]);
/// assert_eq!(config.consistency, Consistency::One);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn decode_config(config_string: &str) -> Result<ClusterConfig, ConfigError> {
    let mut config = ClusterConfig::default();

    let (hosts_part, options_part) = match config_string.split_once('?') {
        Some((hosts, options)) => (hosts, Some(options)),
        None => (config_string, None),
    };

    let hosts: Vec<String> = hosts_part
        .split(',')
        .map(str::trim)
        .filter(|host| !host.is_empty())
        .map(String::from)
        .collect();
    if !hosts.is_empty() {
        config.hosts = hosts;
    }

    if let Some(options) = options_part.filter(|options| !options.is_empty()) {
        for pair in options.split('&') {
            let (key, value) = pair.split_once('=').ok_or(ConfigError::MissingEquals)?;
            apply_option(&mut config, key.trim(), value.trim())?;
        }
    }

    Ok(config)
}

/// Encode a [`ClusterConfig`] into its configuration string.
pub fn encode_config(config: &ClusterConfig) -> String {
    let defaults = ClusterConfig::default();
    let mut options: Vec<String> = Vec::new();

    if config.consistency != defaults.consistency {
        options.push(format!("consistency={}", config.consistency.name()));
    }
    options.push(format!("timeout={}", format_duration(config.timeout)));
    options.push(format!(
        "connectTimeout={}",
        format_duration(config.connect_timeout)
    ));
    if !config.keyspace.is_empty() {
        options.push(format!("keyspace={}", urlencoding::encode(&config.keyspace)));
    }
    if config.num_conns > 1 {
        options.push(format!("numConns={}", config.num_conns));
    }
    if config.ignore_peer_addr {
        options.push("ignorePeerAddr=true".to_string());
    }
    if config.disable_initial_host_lookup {
        options.push("disableInitialHostLookup=true".to_string());
    }
    options.push(format!(
        "writeCoalesceWaitTime={}",
        format_duration(config.write_coalesce_wait_time)
    ));

    if let Some(auth) = &config.authenticator {
        push_escaped(&mut options, "username", &auth.username);
        push_escaped(&mut options, "password", &auth.password);
    }

    if let Some(ssl) = &config.ssl_opts {
        push_escaped(&mut options, "caPath", &ssl.ca_path);
        push_escaped(&mut options, "certPath", &ssl.cert_path);
        push_escaped(&mut options, "keyPath", &ssl.key_path);
        if ssl.enable_host_verification {
            options.push("enableHostVerification=true".to_string());
        }
    }

    let hosts = config.hosts.join(",");
    if options.is_empty() {
        hosts
    } else {
        format!("{}?{}", hosts, options.join("&"))
    }
}

fn push_escaped(options: &mut Vec<String>, key: &str, value: &str) {
    if !value.is_empty() {
        options.push(format!("{}={}", key, urlencoding::encode(value)));
    }
}

fn apply_option(config: &mut ClusterConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    let invalid = || ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    };

    match key {
        "consistency" => {
            config.consistency = value.parse::<Consistency>().map_err(|_| invalid())?;
        }
        "timeout" => {
            if let Some(timeout) = parse_duration(value).ok_or_else(invalid)? {
                config.timeout = timeout;
            }
        }
        "connectTimeout" => {
            if let Some(timeout) = parse_duration(value).ok_or_else(invalid)? {
                config.connect_timeout = timeout;
            }
        }
        "writeCoalesceWaitTime" => {
            if let Some(wait) = parse_duration(value).ok_or_else(invalid)? {
                config.write_coalesce_wait_time = wait;
            }
        }
        "keyspace" => {
            config.keyspace = decode_text(value).ok_or_else(invalid)?;
        }
        "numConns" => {
            let num_conns = value.parse::<i64>().map_err(|_| invalid())?;
            if num_conns > 0 {
                config.num_conns = usize::try_from(num_conns).map_err(|_| invalid())?;
            }
        }
        "ignorePeerAddr" => {
            config.ignore_peer_addr = parse_bool(value).ok_or_else(invalid)?;
        }
        "disableInitialHostLookup" => {
            config.disable_initial_host_lookup = parse_bool(value).ok_or_else(invalid)?;
        }
        "username" => {
            let username = decode_text(value).ok_or_else(invalid)?;
            authenticator(config).username = username;
        }
        "password" => {
            let password = decode_text(value).ok_or_else(invalid)?;
            authenticator(config).password = password;
        }
        "caPath" => {
            let path = decode_text(value).ok_or_else(invalid)?;
            ssl_opts(config).ca_path = path;
        }
        "certPath" => {
            let path = decode_text(value).ok_or_else(invalid)?;
            ssl_opts(config).cert_path = path;
        }
        "keyPath" => {
            let path = decode_text(value).ok_or_else(invalid)?;
            ssl_opts(config).key_path = path;
        }
        "enableHostVerification" => {
            let enabled = parse_bool(value).ok_or_else(invalid)?;
            ssl_opts(config).enable_host_verification = enabled;
        }
        _ => return Err(ConfigError::InvalidKey(key.to_string())),
    }

    Ok(())
}

fn authenticator(config: &mut ClusterConfig) -> &mut PasswordAuthenticator {
    config
        .authenticator
        .get_or_insert_with(PasswordAuthenticator::default)
}

fn ssl_opts(config: &mut ClusterConfig) -> &mut SslOptions {
    config.ssl_opts.get_or_insert_with(SslOptions::default)
}

fn decode_text(value: &str) -> Option<String> {
    urlencoding::decode(value).ok().map(|text| text.into_owned())
}

/// Parse duration text such as `10s`, `1m30s` or `200us`.
///
/// Returns `Some(None)` for a well-formed negative duration, which callers
/// ignore, and `None` when the text does not parse.
fn parse_duration(value: &str) -> Option<Option<Duration>> {
    let (negative, magnitude) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };
    let duration = humantime::parse_duration(magnitude).ok()?;
    if negative && !duration.is_zero() {
        Some(None)
    } else {
        Some(Some(duration))
    }
}

fn format_duration(duration: Duration) -> String {
    humantime::format_duration(duration)
        .to_string()
        .replace(' ', "")
}

/// Parse boolean text. Accepts the same spellings as most URL-style DSNs.
fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_hosts_and_consistency() {
        let config = decode_config("one,two,three?consistency=one").unwrap();
        assert_eq!(config.hosts, vec!["one", "two", "three"]);
        assert_eq!(config.consistency, Consistency::One);

        let encoded = encode_config(&config);
        assert!(encoded.contains("one,two,three"));
        assert!(encoded.contains("consistency=one"));
    }

    #[test]
    fn test_decode_empty_string_gives_defaults() {
        assert_eq!(decode_config("").unwrap(), ClusterConfig::default());
        assert_eq!(decode_config("?").unwrap(), ClusterConfig::default());
    }

    #[test]
    fn test_decode_trims_hosts_and_options() {
        let config = decode_config(" node1 , node2 ? keyspace = ks &numConns= 4").unwrap();
        assert_eq!(config.hosts, vec!["node1", "node2"]);
        assert_eq!(config.keyspace, "ks");
        assert_eq!(config.num_conns, 4);
    }

    #[test]
    fn test_decode_empty_option_part() {
        let config = decode_config("node1?").unwrap();
        assert_eq!(config.hosts, vec!["node1"]);
        assert_eq!(config, ClusterConfig::new(["node1"]));
    }

    #[test]
    fn test_decode_empty_segment_is_missing_equals() {
        for config_string in [
            "h?numConns=3&",
            "h?&",
            "h?keyspace=ks&&numConns=4",
            "h?&timeout=1s",
        ] {
            assert_eq!(
                decode_config(config_string),
                Err(ConfigError::MissingEquals),
                "{}",
                config_string
            );
        }
    }

    #[test]
    fn test_decode_missing_equals() {
        assert_eq!(
            decode_config("?consistency"),
            Err(ConfigError::MissingEquals)
        );
    }

    #[test]
    fn test_decode_invalid_key() {
        let err = decode_config("?foo=bar").unwrap_err();
        assert_eq!(err.to_string(), "invalid key: foo");
    }

    #[test]
    fn test_decode_invalid_values() {
        let cases = [
            ("consistency", "strong"),
            ("consistency", "8"),
            ("timeout", "soon"),
            ("connectTimeout", ""),
            ("writeCoalesceWaitTime", "1x"),
            ("numConns", "two"),
            ("ignorePeerAddr", "yes"),
            ("disableInitialHostLookup", "2"),
            ("enableHostVerification", "maybe"),
        ];
        for (key, value) in cases {
            let err = decode_config(&format!("?{}={}", key, value)).unwrap_err();
            assert_eq!(
                err,
                ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string()
                },
                "key {}",
                key
            );
        }
    }

    #[test]
    fn test_decode_consistency_code() {
        let config = decode_config("?consistency=6").unwrap();
        assert_eq!(config.consistency, Consistency::LocalQuorum);
    }

    #[test]
    fn test_decode_ignores_non_positive_num_conns() {
        assert_eq!(decode_config("?numConns=0").unwrap().num_conns, 2);
        assert_eq!(decode_config("?numConns=-3").unwrap().num_conns, 2);
    }

    #[test]
    fn test_decode_ignores_negative_durations() {
        let config = decode_config("?timeout=-1s&connectTimeout=-5m&writeCoalesceWaitTime=-1ms")
            .unwrap();
        assert_eq!(config, ClusterConfig::default());
    }

    #[test]
    fn test_decode_durations() {
        let config = decode_config("?timeout=1m30s&connectTimeout=0s&writeCoalesceWaitTime=0ms")
            .unwrap();
        assert_eq!(config.timeout, Duration::from_secs(90));
        assert_eq!(config.connect_timeout, Duration::ZERO);
        assert_eq!(config.write_coalesce_wait_time, Duration::ZERO);
    }

    #[test]
    fn test_decode_flags() {
        let config = decode_config("?ignorePeerAddr=t&disableInitialHostLookup=TRUE").unwrap();
        assert!(config.ignore_peer_addr);
        assert!(config.disable_initial_host_lookup);
    }

    #[test]
    fn test_decode_empty_credential_creates_authenticator() {
        let config = decode_config("?username=").unwrap();
        assert_eq!(config.authenticator, Some(PasswordAuthenticator::default()));

        let config = decode_config("?keyPath=").unwrap();
        assert_eq!(config.ssl_opts, Some(SslOptions::default()));
    }

    #[test]
    fn test_decode_percent_escaped_credentials() {
        let config = decode_config("?username=cass%40ndra&password=p%26ss%3Dword").unwrap();
        let auth = config.authenticator.unwrap();
        assert_eq!(auth.username, "cass@ndra");
        assert_eq!(auth.password, "p&ss=word");
    }

    #[test]
    fn test_encode_defaults() {
        assert_eq!(
            encode_config(&ClusterConfig::default()),
            "127.0.0.1?timeout=11s&connectTimeout=11s&numConns=2&writeCoalesceWaitTime=200us"
        );
    }

    #[test]
    fn test_encode_key_order() {
        let config = ClusterConfig::new(["node1", "node2"])
            .with_consistency(Consistency::LocalOne)
            .with_timeout(Duration::from_secs(5))
            .with_connect_timeout(Duration::from_millis(1500))
            .with_keyspace("system")
            .with_num_conns(3)
            .with_ignore_peer_addr(true)
            .with_disable_initial_host_lookup(true)
            .with_write_coalesce_wait_time(Duration::ZERO)
            .with_credentials("user", "p&ss")
            .with_ssl_opts(SslOptions {
                ca_path: "/etc/ca.pem".to_string(),
                cert_path: "/etc/cert.pem".to_string(),
                key_path: "/etc/key.pem".to_string(),
                enable_host_verification: true,
            });

        assert_eq!(
            encode_config(&config),
            "node1,node2?consistency=localOne&timeout=5s&connectTimeout=1s500ms\
             &keyspace=system&numConns=3&ignorePeerAddr=true&disableInitialHostLookup=true\
             &writeCoalesceWaitTime=0s&username=user&password=p%26ss\
             &caPath=%2Fetc%2Fca.pem&certPath=%2Fetc%2Fcert.pem&keyPath=%2Fetc%2Fkey.pem\
             &enableHostVerification=true"
        );
    }

    #[test]
    fn test_round_trip() {
        let config = ClusterConfig::new(["10.0.0.1", "10.0.0.2"])
            .with_consistency(Consistency::EachQuorum)
            .with_timeout(Duration::from_millis(2500))
            .with_connect_timeout(Duration::ZERO)
            .with_keyspace("metrics")
            .with_num_conns(8)
            .with_ignore_peer_addr(true)
            .with_write_coalesce_wait_time(Duration::from_micros(50))
            .with_credentials("", "s3cr3t?&=")
            .with_ssl_opts(SslOptions {
                ca_path: "ca file.pem".to_string(),
                ..SslOptions::default()
            });

        let decoded = decode_config(&encode_config(&config)).unwrap();
        assert_eq!(decoded, config);
    }

    #[test]
    fn test_from_str_and_display() {
        let config: ClusterConfig = "node1?numConns=5".parse().unwrap();
        assert_eq!(config.num_conns, 5);
        assert_eq!(config.to_string(), encode_config(&config));
    }
}
