//! Error types for overlay-dns.

use thiserror::Error;

/// Errors that can occur in the nameserver.
#[derive(Debug, Error)]
pub enum NameError {
    /// IO error (network, file, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Gossip payload could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// A decoded gossip batch was not sorted by the composite key.
    #[error("gossip batch not sorted")]
    NotSorted,

    /// A decoded gossip batch carried two entries with the same identity.
    #[error("duplicate entry in gossip batch: {0}")]
    DuplicateEntry(String),

    /// Failed to parse an IPv4 address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Hostname or reverse lookup found nothing.
    #[error("not found")]
    NotFound,

    /// Gossip broadcast failed after a successful local merge. The local
    /// state keeps the change; later gossip rounds will export it.
    #[error("gossip transport error: {0}")]
    Transport(String),

    /// DNS protocol error.
    #[error("DNS protocol error: {0}")]
    Proto(#[from] hickory_proto::ProtoError),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}
