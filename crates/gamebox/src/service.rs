//! The `Service` trait: what a session loop drives.
//!
//! A service owns all mutable state for one process (the registry, or one
//! table plus its client directory) and maps transport events to outgoing
//! packets. It never touches the network itself, which keeps it synchronous
//! and lets tests call it directly.

use std::net::SocketAddr;

use gamebox_protocol::{ConnectionId, Notice, Opcode, Outgoing, ProtocolError, Recipient};
use gamebox_registry::RegistryError;
use gamebox_session::DirectoryError;

/// Why a packet was discarded without a reply.
///
/// The session loop logs each of these once, with the connection id, and
/// carries on.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The packet did not decode, or a reply did not encode.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// A well-formed command this service does not serve.
    #[error("{0} is not handled here")]
    UnexpectedOpcode(Opcode),
}

/// Event handlers for one server process.
///
/// Each call runs to completion before the loop takes the next event, so
/// an implementation sees connects, packets and disconnects one at a time
/// in transport order.
pub trait Service: Send + 'static {
    /// A peer connected.
    fn on_connect(&mut self, conn: ConnectionId, peer: SocketAddr) -> Vec<Outgoing>;

    /// A peer sent one packet.
    fn on_packet(
        &mut self,
        conn: ConnectionId,
        peer: SocketAddr,
        data: &[u8],
    ) -> Result<Vec<Outgoing>, ServiceError>;

    /// A peer went away. Any state it held is released in this call.
    fn on_disconnect(&mut self, conn: ConnectionId) -> Vec<Outgoing>;

    /// One animation frame of `dt` seconds elapsed.
    fn on_frame(&mut self, _dt: f32) -> Vec<Outgoing> {
        Vec::new()
    }

    /// Whether frames are wanted right now.
    fn is_animating(&self) -> bool {
        false
    }
}

/// Encodes `notice` for reliable delivery, logging and skipping it if it
/// cannot be encoded.
///
/// For handlers that must not fail (connect, disconnect, frames).
pub(crate) fn push_notice(out: &mut Vec<Outgoing>, to: Recipient, notice: &Notice) {
    match Outgoing::reliable(to, notice) {
        Ok(packet) => out.push(packet),
        Err(e) => tracing::warn!(opcode = %notice.opcode(), error = %e, "notice dropped"),
    }
}
