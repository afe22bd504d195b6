use crate::ConnectionId;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding the listen address failed. Fatal at startup.
    #[error("bind failed: {0}")]
    BindFailed(#[source] std::io::Error),

    /// No live connection has this id (never existed or already gone).
    #[error("unknown connection {0}")]
    UnknownConnection(ConnectionId),

    /// The connection's outbound queue is closed.
    #[error("connection {0} closed")]
    ConnectionClosed(ConnectionId),

    /// The host was shut down.
    #[error("transport shut down")]
    Shutdown,
}
