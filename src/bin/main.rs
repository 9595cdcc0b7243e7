//! overlay-dns binary entry point.

use clap::Parser;
use overlay_dns::{http, telemetry, Config, DnsServer, Nameserver};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Gossip-replicated, in-memory authoritative DNS for containerised
/// workloads.
#[derive(Parser, Debug)]
#[command(name = "overlay-dns")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML).
    #[arg(short, long, default_value = "overlay-dns.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration
    let config: Config = config::Config::builder()
        .add_source(config::File::from(args.config.clone()))
        .add_source(
            config::Environment::with_prefix("OVERLAY_DNS")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;

    // Initialize telemetry
    telemetry::init(&config.telemetry).map_err(|e| e as Box<dyn std::error::Error>)?;

    info!(
        config_file = %args.config.display(),
        listen_addr = %config.dns.listen_addr,
        domain = %config.dns.domain,
        peer_name = %config.dns.peer_name,
        "Starting overlay-dns"
    );

    // Setup graceful shutdown
    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Unable to listen for shutdown signal: {}", e);
            }
            info!("Shutdown requested");
            shutdown.cancel();
        }
    });

    // Nameserver and tombstone reaper
    let ns = Arc::new(Nameserver::new(
        &config.dns.peer_name,
        Duration::from_secs(config.dns.tombstone_retention_secs),
    ));
    ns.start();

    // HTTP control plane
    let app = http::router(http::AppState {
        ns: Arc::clone(&ns),
        domain: config.dns.domain.clone(),
    });
    let http_listener = tokio::net::TcpListener::bind(config.http.listen_addr).await?;
    info!(addr = %config.http.listen_addr, "control plane listening");
    let http_shutdown = shutdown.clone();
    let http_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(http_listener, app)
            .with_graceful_shutdown(http_shutdown.cancelled_owned())
            .await
        {
            error!("control plane error: {}", e);
        }
    });

    // DNS front-end
    let server = DnsServer::new(config.dns, Arc::clone(&ns));
    let result = server.run(shutdown.clone()).await;

    // Stop the reaper and drain the control plane
    ns.stop();
    let _ = http_handle.await;

    if let Err(e) = result {
        error!("DNS server error: {}", e);
        return Err(e.into());
    }

    info!("overlay-dns shutdown complete");
    Ok(())
}
