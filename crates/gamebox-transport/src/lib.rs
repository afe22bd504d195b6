//! Transport abstraction layer for Gamebox.
//!
//! Provides the [`Host`] trait: an event-pumping view of a set of peer
//! connections. A host turns network activity into a single ordered stream
//! of [`TransportEvent`]s, and sends bytes back to one peer or to everyone.
//!
//! Connection I/O may run on many tasks, but every event funnels through
//! one queue, so whoever polls the host sees connects, packets and
//! disconnects in one total order.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket host via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::WebSocketHost;

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

/// Opaque identifier for a connection.
///
/// Connection ids are also the client ids seen on the wire, so they are
/// 32-bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u32);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u32`.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the underlying `u32` value.
    pub fn into_inner(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Delivery guarantee requested for an outgoing packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delivery {
    /// Delivered in order, no loss.
    #[default]
    Reliable,

    /// May be lost. Hosts without an unreliable channel deliver reliably.
    Unreliable,
}

/// Something that happened on the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A peer connected.
    Connected { id: ConnectionId, peer: SocketAddr },

    /// A peer sent one packet.
    Received { id: ConnectionId, data: Vec<u8> },

    /// A peer went away. No further events carry this id.
    Disconnected { id: ConnectionId },
}

impl TransportEvent {
    /// The connection this event concerns.
    pub fn connection(&self) -> ConnectionId {
        match self {
            Self::Connected { id, .. }
            | Self::Received { id, .. }
            | Self::Disconnected { id } => *id,
        }
    }
}

/// A listening endpoint that multiplexes many peers.
pub trait Host: Send + 'static {
    /// The error type for host operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Waits up to `wait` for the next event.
    ///
    /// Returns `Ok(None)` if nothing happened within the wait.
    async fn poll_event(
        &mut self,
        wait: Duration,
    ) -> Result<Option<TransportEvent>, Self::Error>;

    /// Sends one packet to a single peer.
    async fn send(
        &self,
        id: ConnectionId,
        data: &[u8],
        delivery: Delivery,
    ) -> Result<(), Self::Error>;

    /// Sends one packet to every connected peer.
    async fn broadcast(
        &self,
        data: &[u8],
        delivery: Delivery,
    ) -> Result<(), Self::Error>;

    /// Returns the transport-level address of a connected peer.
    async fn peer_addr(&self, id: ConnectionId) -> Option<SocketAddr>;

    /// Closes one connection. A `Disconnected` event follows.
    async fn disconnect(&self, id: ConnectionId) -> Result<(), Self::Error>;

    /// Stops accepting connections and closes every open one.
    async fn shutdown(&mut self) -> Result<(), Self::Error>;
}
