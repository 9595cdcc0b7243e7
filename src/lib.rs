//! Overlay DNS - a gossip-replicated, in-memory authoritative DNS
//! nameserver for containerised workloads.
//!
//! Every node in an overlay network runs one instance. Instances
//! exchange a shared set of (hostname -> IPv4) bindings over a gossip
//! transport, so any node can answer A-record queries for container
//! hostnames registered anywhere in the cluster. Clients publish and
//! retract bindings through an HTTP control plane; consumers resolve
//! them over DNS on UDP and TCP.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         overlay-dns                             │
//! │                                                                 │
//! │   HTTP control plane ──┐                 ┌── gossip transport   │
//! │   PUT/DELETE/GET       │                 │   (external, opaque  │
//! │   /name/...            ▼                 ▼    payloads)         │
//! │                 ┌──────────────────────────────┐                │
//! │                 │  Nameserver                  │                │
//! │                 │  sorted entry set, merge,    │                │
//! │                 │  tombstones, reaper          │                │
//! │                 └──────────────┬───────────────┘                │
//! │                                │                                │
//! │                                ▼                                │
//! │                 ┌──────────────────────────────┐                │
//! │                 │  Hickory DNS server          │◀── UDP/TCP     │
//! │                 │  A + reverse PTR             │                │
//! │                 └──────────────────────────────┘                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Replication
//!
//! The entry set is a grow-set with per-element last-writer-wins on
//! (version, tombstone), where only the authoring peer may bump a
//! version. Retractions are tombstones that linger for a retention
//! window (10 minutes by default) so they can propagate through gossip
//! before a background reaper discards them. Entries of a peer that
//! leaves the cluster are dropped outright on every node.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use overlay_dns::{DnsConfig, DnsServer, Nameserver};
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = DnsConfig {
//!         listen_addr: "0.0.0.0:5353".parse().unwrap(),
//!         domain: "cluster.local.".to_string(),
//!         peer_name: "node-1".to_string(),
//!         ttl: 60,
//!         tombstone_retention_secs: 600,
//!     };
//!
//!     let ns = Arc::new(Nameserver::new("node-1", Duration::from_secs(600)));
//!     ns.start();
//!
//!     let shutdown = CancellationToken::new();
//!     let server = DnsServer::new(config, ns);
//!     server.run(shutdown).await.unwrap();
//! }
//! ```

#![warn(missing_docs)]

pub mod authority;
pub mod config;
pub mod entry;
pub mod error;
pub mod gossip;
pub mod http;
pub mod metrics;
pub mod nameserver;
pub mod server;
pub mod telemetry;

// Re-export main types
pub use config::{Config, DnsConfig, HttpConfig, TelemetryConfig};
pub use entry::{Entries, Entry};
pub use error::NameError;
pub use gossip::{GossipData, GossipSender};
pub use nameserver::Nameserver;
pub use server::DnsServer;
