//! Gossip wire format and transport interface.
//!
//! The transport itself is external: something that ships opaque byte
//! payloads between named peers, best-effort and possibly duplicated.
//! This module owns the two things the nameserver needs from it: a
//! self-describing encoding of an entry set that round-trips exactly on
//! any peer, and the [`GossipSender`] seam the transport implements so
//! the nameserver can broadcast deltas without knowing how they travel.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::entry::Entries;
use crate::error::NameError;

/// An entry-set snapshot (or delta) as it travels between peers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GossipData {
    entries: Entries,
}

impl GossipData {
    /// Wrap a sorted, identity-unique entry set for the wire.
    pub fn new(entries: Entries) -> Self {
        Self { entries }
    }

    /// Borrow the carried entries.
    pub fn entries(&self) -> &Entries {
        &self.entries
    }

    /// Unwrap the carried entries.
    pub fn into_entries(self) -> Entries {
        self.entries
    }

    /// True when there is nothing to ship.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Coalesce another batch into this one, for transports that buffer
    /// pending gossip. Sort order and uniqueness are preserved.
    pub fn merge(&mut self, other: GossipData) {
        self.entries.merge(other.entries);
    }

    /// Serialise to a single opaque payload.
    pub fn encode(&self) -> Result<Vec<u8>, NameError> {
        Ok(serde_json::to_vec(&self.entries)?)
    }

    /// Decode a payload and validate the container invariants. A batch
    /// that is unsorted or carries duplicate identities is rejected in
    /// full; nothing of it is applied.
    pub fn decode(msg: &[u8]) -> Result<Self, NameError> {
        let entries: Entries = serde_json::from_slice(msg)?;
        entries.check()?;
        Ok(Self { entries })
    }
}

/// The seam between the nameserver and the gossip transport.
///
/// Implementations must be safe to call from multiple tasks; the
/// nameserver never holds its state lock across a broadcast.
#[async_trait]
pub trait GossipSender: Send + Sync {
    /// Ship a batch to all peers, best-effort. An error means this
    /// round failed; the local state already holds the change and
    /// periodic anti-entropy will export it eventually.
    async fn broadcast(&self, data: GossipData) -> Result<(), NameError>;
}
