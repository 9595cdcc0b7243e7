//! Configuration types for overlay-dns.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// DNS server configuration.
    pub dns: DnsConfig,

    /// HTTP control plane configuration.
    pub http: HttpConfig,

    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// DNS server and nameserver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsConfig {
    /// Address for the DNS server to listen on (UDP and TCP).
    pub listen_addr: SocketAddr,

    /// Domain suffix served by this cluster (e.g. "cluster.local.").
    /// Only questions under this suffix are answered.
    pub domain: String,

    /// This peer's name; the origin stamped on every entry it authors.
    pub peer_name: String,

    /// TTL for DNS records in seconds.
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// How long tombstoned entries are retained before the reaper
    /// discards them, in seconds.
    #[serde(default = "default_tombstone_retention")]
    pub tombstone_retention_secs: u64,
}

/// HTTP control plane configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Address for the control plane to listen on.
    pub listen_addr: SocketAddr,
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level filter (e.g. "info", "debug", "overlay_dns=debug,warn").
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Prometheus metrics exporter address.
    #[serde(default)]
    pub prometheus_addr: Option<SocketAddr>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            prometheus_addr: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_ttl() -> u32 {
    60
}

fn default_tombstone_retention() -> u64 {
    600
}
