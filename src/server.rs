//! DNS server setup and lifecycle management.

use hickory_server::authority::{AuthorityObject, Catalog};
use hickory_server::ServerFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, UdpSocket};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::authority::{ClusterAuthority, ReverseAuthority};
use crate::config::DnsConfig;
use crate::error::NameError;
use crate::nameserver::Nameserver;

/// Timeout for idle TCP connections.
const TCP_TIMEOUT: Duration = Duration::from_secs(30);

/// Interval for emitting state metrics.
const METRICS_INTERVAL: Duration = Duration::from_secs(10);

/// Periodically emit state metrics.
async fn metrics_loop(ns: Arc<Nameserver>, shutdown: CancellationToken) {
    let mut interval = tokio::time::interval(METRICS_INTERVAL);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                ns.emit_metrics();
                debug!(entries = ns.entry_count(), "emitted state metrics");
            }
            _ = shutdown.cancelled() => {
                debug!("metrics loop shutting down");
                return;
            }
        }
    }
}

/// DNS front-end over the replicated entry set.
pub struct DnsServer {
    config: DnsConfig,
    ns: Arc<Nameserver>,
}

impl DnsServer {
    /// Create a new DNS server over the given nameserver.
    pub fn new(config: DnsConfig, ns: Arc<Nameserver>) -> Self {
        Self { config, ns }
    }

    /// Build the catalog serving the cluster domain and the reverse
    /// zone.
    pub fn catalog(&self) -> Result<Catalog, NameError> {
        let forward =
            ClusterAuthority::new(&self.config.domain, self.config.ttl, Arc::clone(&self.ns))?;
        let reverse = ReverseAuthority::new(self.config.ttl, Arc::clone(&self.ns))?;

        let mut catalog = Catalog::new();
        let forward: Arc<dyn AuthorityObject> = Arc::new(forward);
        catalog.upsert(forward.origin().clone(), vec![forward]);
        let reverse: Arc<dyn AuthorityObject> = Arc::new(reverse);
        catalog.upsert(reverse.origin().clone(), vec![reverse]);

        Ok(catalog)
    }

    /// Run the DNS server until the shutdown token fires.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), NameError> {
        info!(
            listen_addr = %self.config.listen_addr,
            domain = %self.config.domain,
            "Starting DNS server"
        );

        let mut server = ServerFuture::new(self.catalog()?);

        // Bind UDP
        let udp_socket = UdpSocket::bind(self.config.listen_addr).await?;
        info!(addr = %self.config.listen_addr, "DNS UDP listening");
        server.register_socket(udp_socket);

        // Bind TCP
        let tcp_listener = TcpListener::bind(self.config.listen_addr).await?;
        info!(addr = %self.config.listen_addr, "DNS TCP listening");
        server.register_listener(tcp_listener, TCP_TIMEOUT);

        info!(domain = %self.config.domain, "DNS server ready to serve queries");

        // Start metrics loop
        let metrics_handle = tokio::spawn(metrics_loop(
            Arc::clone(&self.ns),
            shutdown.clone(),
        ));
        self.ns.emit_metrics();

        // Run server until shutdown
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("DNS server shutdown requested");
            }
            result = server.block_until_done() => {
                if let Err(e) = result {
                    error!("DNS server error: {}", e);
                }
            }
        }

        let _ = metrics_handle.await;

        info!("DNS server stopped");
        Ok(())
    }
}
