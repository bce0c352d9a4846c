#![forbid(unsafe_code)]

//! Cluster configuration.
//!
//! The mapper itself only reads the default consistency level; the remaining
//! settings are parsed and validated here and handed to the driver that
//! bootstraps the connection.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::types::{Consistency, Result, WidecolError};

/// Connection settings as written in TOML.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClusterConfig {
    /// Contact points.
    pub hosts: Vec<String>,
    /// Native protocol port.
    pub port: Option<u16>,
    /// Keyspace to connect to.
    pub keyspace: Option<String>,
    /// Username for password authentication.
    pub username: Option<String>,
    /// Password for password authentication.
    pub password: Option<String>,
    /// TLS material.
    pub ssl: Option<SslConfig>,
    /// Frame compression, e.g. `lz4` or `snappy`.
    pub compression: Option<String>,
    /// Load-balancing policy selector.
    pub load_balancing_policy: Option<String>,
    /// Reconnection policy selector.
    pub reconnection_policy: Option<String>,
    /// Retry policy selector.
    pub retry_policy: Option<String>,
    /// Default consistency level applied to statements.
    pub consistency: Option<Consistency>,
    /// Request tracing.
    pub trace: bool,
    /// Driver page size.
    pub page_size: Option<u32>,
}

/// TLS files and passphrase.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SslConfig {
    /// CA certificate used to verify the server.
    pub server_cert: Option<PathBuf>,
    /// Client certificate.
    pub client_cert: Option<PathBuf>,
    /// Client private key.
    pub private_key: Option<PathBuf>,
    /// Passphrase for the private key.
    pub passphrase: Option<String>,
}

/// Load-balancing policies understood by the driver.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LoadBalancingPolicy {
    /// Round robin over all hosts.
    RoundRobin,
    /// Round robin restricted to the local datacenter.
    DcAwareRoundRobin,
    /// Prefer replicas owning the partition.
    TokenAware,
}

/// Reconnection policies understood by the driver.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReconnectionPolicy {
    /// Fixed delay between attempts.
    Constant,
    /// Exponentially growing delay.
    Exponential,
}

/// Retry policies understood by the driver.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Driver default.
    Default,
    /// Never retry.
    Fallthrough,
    /// Retry at a lower consistency level.
    DowngradingConsistency,
}

/// Settings resolved for the driver.
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterOptions {
    /// Contact points, defaulting to `127.0.0.1`.
    pub hosts: Vec<String>,
    /// Port, defaulting to 9042.
    pub port: u16,
    /// Keyspace to connect to.
    pub keyspace: Option<String>,
    /// Username for password authentication.
    pub username: Option<String>,
    /// Password for password authentication.
    pub password: Option<String>,
    /// TLS material, passed through untouched.
    pub ssl: Option<SslConfig>,
    /// Frame compression.
    pub compression: Option<String>,
    /// Request tracing.
    pub trace: bool,
    /// Resolved load-balancing policy.
    pub load_balancing_policy: Option<LoadBalancingPolicy>,
    /// Resolved reconnection policy.
    pub reconnection_policy: Option<ReconnectionPolicy>,
    /// Resolved retry policy.
    pub retry_policy: Option<RetryPolicy>,
    /// Default consistency level.
    pub consistency: Option<Consistency>,
    /// Driver page size.
    pub page_size: Option<u32>,
}

impl ClusterConfig {
    /// Parses TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|err| WidecolError::Config(err.to_string()))
    }

    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Resolves policy selectors; unknown selectors are configuration errors.
    pub fn cluster_options(&self) -> Result<ClusterOptions> {
        Ok(ClusterOptions {
            hosts: if self.hosts.is_empty() {
                vec!["127.0.0.1".to_owned()]
            } else {
                self.hosts.clone()
            },
            port: self.port.unwrap_or(9042),
            keyspace: self.keyspace.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            ssl: self.ssl.clone(),
            compression: self.compression.clone(),
            trace: self.trace,
            load_balancing_policy: self
                .load_balancing_policy
                .as_deref()
                .map(parse_load_balancing)
                .transpose()?,
            reconnection_policy: self
                .reconnection_policy
                .as_deref()
                .map(parse_reconnection)
                .transpose()?,
            retry_policy: self.retry_policy.as_deref().map(parse_retry).transpose()?,
            consistency: self.consistency,
            page_size: self.page_size,
        })
    }
}

/// Case- and separator-insensitive form, so `DCAwareRoundRobin`,
/// `dc_aware_round_robin` and `dc-aware-round-robin` all match.
fn selector(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn unknown(kind: &str, name: &str) -> WidecolError {
    WidecolError::Config(format!("unknown {kind} policy '{name}'"))
}

fn parse_load_balancing(name: &str) -> Result<LoadBalancingPolicy> {
    match selector(name).as_str() {
        "roundrobin" => Ok(LoadBalancingPolicy::RoundRobin),
        "dcawareroundrobin" => Ok(LoadBalancingPolicy::DcAwareRoundRobin),
        "tokenaware" => Ok(LoadBalancingPolicy::TokenAware),
        _ => Err(unknown("load balancing", name)),
    }
}

fn parse_reconnection(name: &str) -> Result<ReconnectionPolicy> {
    match selector(name).as_str() {
        "constant" => Ok(ReconnectionPolicy::Constant),
        "exponential" => Ok(ReconnectionPolicy::Exponential),
        _ => Err(unknown("reconnection", name)),
    }
}

fn parse_retry(name: &str) -> Result<RetryPolicy> {
    match selector(name).as_str() {
        "default" => Ok(RetryPolicy::Default),
        "fallthrough" => Ok(RetryPolicy::Fallthrough),
        "downgradingconsistency" => Ok(RetryPolicy::DowngradingConsistency),
        _ => Err(unknown("retry", name)),
    }
}
