//! Gossip-backed, in-memory nameserver.
//!
//! Holds the cluster-wide entry set for this peer and mediates every
//! way in or out of it: the HTTP control plane mutates it, the DNS
//! front-end reads it, the gossip receive paths merge foreign state
//! into it, and a background reaper discards tombstones older than the
//! retention window.
//!
//! Lock discipline: one reader-writer lock around the entry set.
//! Readers are `lookup`, `reverse_lookup` and `gossip`; everything else
//! writes. No guard is ever held across a transport call or an await
//! point.

use std::net::Ipv4Addr;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::entry::{fqdn, Entries, Entry};
use crate::error::NameError;
use crate::gossip::{GossipData, GossipSender};
use crate::metrics;

/// Default time a tombstone is kept before the reaper discards it.
///
/// Tombstones do not need to survive long peer disconnections, because
/// entries of a departed peer are deleted outright. They only need to
/// outlive gossip propagation delay.
pub const DEFAULT_TOMBSTONE_RETENTION: Duration = Duration::from_secs(600);

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Gossip-based, in-memory nameserver.
///
/// Holds a sorted set of (hostname, peer, container, IPv4) bindings for
/// the whole cluster, gossiped and merged around it. Lookups are
/// binary-search cheap; updates are linear in the set size.
pub struct Nameserver {
    our_name: String,
    retention: Duration,
    entries: RwLock<Entries>,
    gossip: OnceLock<Arc<dyn GossipSender>>,
    shutdown: CancellationToken,
}

impl Nameserver {
    /// Create a nameserver for the peer named `our_name`. The shutdown
    /// signal is initialised here, before the reaper can ever run, so
    /// `stop` is always able to reach it.
    pub fn new(our_name: impl Into<String>, retention: Duration) -> Self {
        Self {
            our_name: our_name.into(),
            retention,
            entries: RwLock::new(Entries::new()),
            gossip: OnceLock::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// The peer name this instance authors entries under.
    pub fn our_name(&self) -> &str {
        &self.our_name
    }

    /// Attach the gossip transport. Called once at startup, after the
    /// transport has been built around this nameserver's receive paths.
    /// Until then, broadcasts are silently skipped.
    pub fn set_gossip(&self, gossip: Arc<dyn GossipSender>) {
        if self.gossip.set(gossip).is_err() {
            warn!("gossip transport already attached, ignoring");
        }
    }

    /// Spawn the tombstone reaper. It wakes every retention interval,
    /// discards expired tombstones, and exits when `stop` is called.
    pub fn start(self: &Arc<Self>) {
        let ns = Arc::clone(self);
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(ns.retention);
            // The first tick of a tokio interval completes immediately.
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        debug!("tombstone reaper shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        ns.reap();
                    }
                }
            }
        });
    }

    /// Signal the reaper to exit at its next loop iteration.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// Register a binding authored by this peer and broadcast the novel
    /// delta. A transport failure is returned to the caller, but the
    /// entry is already merged locally and will reach peers through
    /// later gossip rounds.
    pub async fn add_entry(
        &self,
        hostname: &str,
        container_id: &str,
        addr: Ipv4Addr,
    ) -> Result<(), NameError> {
        let entry = Entry::new(fqdn(hostname), self.our_name.clone(), container_id, addr);
        debug!(hostname = %entry.hostname, container = %entry.container_id, addr = %entry.addr, "adding entry");

        let novel = {
            let mut entries = self.entries.write();
            entries.merge(Entries::from(vec![entry]))
        };
        metrics::record_merge_novel(novel.len());

        self.broadcast(GossipData::new(novel)).await
    }

    /// Resolve a hostname to its live addresses. Tombstoned bindings
    /// are filtered out here.
    pub fn lookup(&self, hostname: &str) -> Vec<Ipv4Addr> {
        let entries = self.entries.read();
        entries
            .lookup(hostname)
            .iter()
            .filter(|e| !e.is_tombstoned())
            .map(|e| e.addr)
            .collect()
    }

    /// Find the hostname bound to `addr`, if any.
    pub fn reverse_lookup(&self, addr: Ipv4Addr) -> Result<String, NameError> {
        let entries = self.entries.read();
        entries
            .first(|e| e.addr == addr && !e.is_tombstoned())
            .map(|e| e.hostname.clone())
            .ok_or(NameError::NotFound)
    }

    /// Tombstone every binding this peer authored for a dead container.
    pub fn container_died(&self, container_id: &str) {
        let touched = {
            let mut entries = self.entries.write();
            entries.tombstone(&self.our_name, unix_now(), |e| {
                e.container_id == container_id
            })
        };
        if touched > 0 {
            info!(container = container_id, touched, "tombstoned entries for dead container");
        }
    }

    /// A peer has left the cluster for good: drop its entries outright.
    /// No tombstones are emitted; every remaining peer learns of the
    /// departure from the transport and applies the same rule locally.
    pub fn peer_gone(&self, peer: &str) {
        let removed = {
            let mut entries = self.entries.write();
            entries.delete(|e| e.origin == peer)
        };
        if removed > 0 {
            info!(peer, removed, "dropped entries of departed peer");
        }
    }

    /// Tombstone this peer's bindings matching every supplied field.
    /// `None` is a wildcard, so `delete(None, None, None)` withdraws
    /// this peer's entire contribution.
    pub fn delete(
        &self,
        hostname: Option<&str>,
        container_id: Option<&str>,
        addr: Option<Ipv4Addr>,
    ) {
        let touched = {
            let mut entries = self.entries.write();
            entries.tombstone(&self.our_name, unix_now(), |e| {
                if let Some(hostname) = hostname {
                    if e.hostname != hostname {
                        return false;
                    }
                }
                if let Some(container_id) = container_id {
                    if e.container_id != container_id {
                        return false;
                    }
                }
                if let Some(addr) = addr {
                    if e.addr != addr {
                        return false;
                    }
                }
                true
            })
        };
        debug!(
            hostname = hostname.unwrap_or("*"),
            container = container_id.unwrap_or("*"),
            touched,
            "delete request"
        );
    }

    /// A copy of the full entry set, for full-state anti-entropy
    /// exchange.
    pub fn gossip(&self) -> GossipData {
        let entries = self.entries.read();
        GossipData::new(entries.clone())
    }

    /// Anti-entropy receive: merge a foreign payload and return only
    /// what was novel here, so the sender can tighten its next round.
    /// `None` means the payload taught us nothing.
    pub fn on_gossip(&self, msg: &[u8]) -> Result<Option<GossipData>, NameError> {
        let (novel, _) = self.receive_gossip(msg)?;
        Ok(if novel.is_empty() { None } else { Some(novel) })
    }

    /// Broadcast receive: merge a foreign payload and hand the whole
    /// batch back for onward propagation.
    pub fn on_gossip_broadcast(&self, msg: &[u8]) -> Result<GossipData, NameError> {
        let (_, incoming) = self.receive_gossip(msg)?;
        Ok(incoming)
    }

    fn receive_gossip(&self, msg: &[u8]) -> Result<(GossipData, GossipData), NameError> {
        let incoming = match GossipData::decode(msg) {
            Ok(data) => data,
            Err(err) => {
                metrics::record_gossip_decode_error();
                warn!(error = %err, "rejecting gossip batch");
                return Err(err);
            }
        };

        let novel = {
            let mut entries = self.entries.write();
            entries.merge(incoming.entries().clone())
        };
        metrics::record_merge_novel(novel.len());
        debug!(
            received = incoming.entries().len(),
            novel = novel.len(),
            "merged gossip batch"
        );

        Ok((GossipData::new(novel), incoming))
    }

    /// Emit gauge metrics for the current state.
    pub fn emit_metrics(&self) {
        let entries = self.entries.read();
        metrics::record_state_counts(entries.len(), entries.tombstone_count());
    }

    /// Total entries held, tombstoned ones included.
    pub fn entry_count(&self) -> usize {
        self.entries.read().len()
    }

    async fn broadcast(&self, data: GossipData) -> Result<(), NameError> {
        if data.is_empty() {
            return Ok(());
        }
        match self.gossip.get() {
            Some(gossip) => gossip.broadcast(data).await,
            None => {
                debug!("no gossip transport attached, skipping broadcast");
                Ok(())
            }
        }
    }

    fn reap(&self) {
        let now = unix_now();
        let horizon = self.retention.as_secs() as i64;
        let removed = {
            let mut entries = self.entries.write();
            entries.delete(|e| e.is_tombstoned() && now - e.tombstone > horizon)
        };
        if removed > 0 {
            info!(removed, "reaped expired tombstones");
            metrics::record_reaper_removed(removed);
        }
    }
}
