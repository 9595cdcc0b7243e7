//! The replicated entry set.
//!
//! An [`Entry`] is one (hostname, origin peer, container, IPv4) binding
//! with version and tombstone metadata. [`Entries`] keeps them sorted by
//! the composite identity key and supports the convergent merge that
//! makes concurrent updates from different peers agree: per identity,
//! the higher version wins and carries its tombstone with it. Only the
//! origin peer ever bumps a version, so the write stream per identity is
//! totally ordered and the merge is conflict-free.

use std::cmp::Ordering;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::error::NameError;

/// One replicated hostname binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Fully-qualified hostname: lowercase, trailing dot.
    pub hostname: String,
    /// Peer that authored this entry. Only the origin may version-bump
    /// or tombstone it.
    pub origin: String,
    /// Identifier of the workload the binding describes.
    pub container_id: String,
    /// IPv4 address the hostname resolves to.
    pub addr: Ipv4Addr,
    /// Monotonic counter, bumped by the origin on every tombstone action.
    pub version: u64,
    /// 0 while live, otherwise the unix time (seconds) of retraction.
    pub tombstone: i64,
}

impl Entry {
    /// Create a live entry with fresh metadata (version 0, no tombstone).
    pub fn new(
        hostname: impl Into<String>,
        origin: impl Into<String>,
        container_id: impl Into<String>,
        addr: Ipv4Addr,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            origin: origin.into(),
            container_id: container_id.into(),
            addr,
            version: 0,
            tombstone: 0,
        }
    }

    /// True once the entry has been retracted.
    pub fn is_tombstoned(&self) -> bool {
        self.tombstone > 0
    }

    /// The composite identity key. Version and tombstone are metadata
    /// that evolve on an existing identity and take no part in ordering.
    fn key(&self) -> (&str, &str, &str, Ipv4Addr) {
        (&self.hostname, &self.origin, &self.container_id, self.addr)
    }

    fn same_identity(&self, other: &Entry) -> bool {
        self.key() == other.key()
    }

    fn cmp_key(&self, other: &Entry) -> Ordering {
        self.key().cmp(&other.key())
    }

    /// Per-identity merge: adopt the newer (version, tombstone) pair.
    fn merge_meta(&mut self, other: &Entry) {
        if other.version > self.version {
            self.version = other.version;
            self.tombstone = other.tombstone;
        }
    }
}

/// Normalise a name to FQDN form: lowercase with a trailing dot.
pub fn fqdn(name: &str) -> String {
    let mut name = name.to_ascii_lowercase();
    if !name.ends_with('.') {
        name.push('.');
    }
    name
}

/// A sorted, identity-unique sequence of entries.
///
/// The sort key is `(hostname, origin, container_id, addr)`, so all
/// entries for one hostname form a contiguous run and hostname lookup is
/// a binary search. Merge never reorders what is already present; it
/// only inserts new identities at their sort position or updates
/// metadata in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entries(Vec<Entry>);

impl Entries {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, tombstoned ones included.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the set holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the entries in sort order.
    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.0.iter()
    }

    /// Number of entries currently carrying a tombstone.
    pub fn tombstone_count(&self) -> usize {
        self.0.iter().filter(|e| e.is_tombstoned()).count()
    }

    /// Merge `incoming` (sorted, identity-unique) into this set.
    ///
    /// Returns the novel subset: entries whose identity was unknown
    /// locally. An already-known identity is never novel, even when its
    /// metadata advances. The novel set comes back in ascending order.
    pub fn merge(&mut self, incoming: Entries) -> Entries {
        let mut novel = Vec::new();
        let mut i = 0;

        for entry in incoming.0 {
            while i < self.0.len() && self.0[i].cmp_key(&entry) == Ordering::Less {
                i += 1;
            }
            if i < self.0.len() && self.0[i].same_identity(&entry) {
                self.0[i].merge_meta(&entry);
                continue;
            }
            self.0.insert(i, entry.clone());
            novel.push(entry);
        }

        Entries(novel)
    }

    /// Tombstone every entry matching `pred` that `our_name` authored:
    /// bump the version and stamp the retraction time. Entries authored
    /// by other peers are left untouched. Returns how many were touched.
    pub fn tombstone(
        &mut self,
        our_name: &str,
        now: i64,
        mut pred: impl FnMut(&Entry) -> bool,
    ) -> usize {
        let mut touched = 0;
        for e in &mut self.0 {
            if e.origin == our_name && pred(e) {
                e.version += 1;
                e.tombstone = now;
                touched += 1;
            }
        }
        touched
    }

    /// Remove every entry matching `pred`, without trace. Returns how
    /// many were removed.
    pub fn delete(&mut self, mut pred: impl FnMut(&Entry) -> bool) -> usize {
        let before = self.0.len();
        self.0.retain(|e| !pred(e));
        before - self.0.len()
    }

    /// The contiguous run of entries for `hostname`, tombstoned ones
    /// included; filtering live entries is the caller's business. An
    /// absent hostname yields an empty slice.
    pub fn lookup(&self, hostname: &str) -> &[Entry] {
        let start = self.0.partition_point(|e| e.hostname.as_str() < hostname);
        let run = self.0[start..]
            .iter()
            .take_while(|e| e.hostname == hostname)
            .count();
        &self.0[start..start + run]
    }

    /// First entry satisfying `pred`, if any.
    pub fn first(&self, mut pred: impl FnMut(&Entry) -> bool) -> Option<&Entry> {
        self.0.iter().find(|e| pred(e))
    }

    /// Validate the container invariants: strictly ascending by the
    /// composite key, hence identity-unique. Every decoded gossip batch
    /// passes through here; a violation rejects the batch in full.
    pub fn check(&self) -> Result<(), NameError> {
        for pair in self.0.windows(2) {
            match pair[0].cmp_key(&pair[1]) {
                Ordering::Less => {}
                Ordering::Equal => {
                    return Err(NameError::DuplicateEntry(pair[1].hostname.clone()))
                }
                Ordering::Greater => return Err(NameError::NotSorted),
            }
        }
        Ok(())
    }
}

impl From<Vec<Entry>> for Entries {
    fn from(entries: Vec<Entry>) -> Self {
        Self(entries)
    }
}

impl<'a> IntoIterator for &'a Entries {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
