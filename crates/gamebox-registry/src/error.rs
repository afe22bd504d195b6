//! Error types for the registry.

use gamebox_protocol::ConnectionId;

/// Errors that can occur while registering a game server.
///
/// Updates never fail: an update from a connection that registered nothing
/// is simply ignored.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The transport no longer knows the peer's address, so there is
    /// nothing trustworthy to record.
    #[error("no peer address for connection {0}")]
    UnknownPeer(ConnectionId),

    /// The registry already holds `max_records` servers.
    #[error("registry is full ({limit} records)")]
    Full { limit: usize },
}
