//! The session loop.
//!
//! This is where every layer meets: transport events come in, the
//! [`Service`] decides what they mean, and the resulting packets go back
//! out. The loop is the only task that touches service state, so ordering
//! is simply the order the host hands events over.

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use gamebox_protocol::{ConnectionId, Outgoing, Recipient};
use gamebox_tick::{FrameClock, FrameConfig};
use gamebox_transport::{Host, TransportEvent};

use crate::{GameboxError, Service};

/// Default bound on one wait for a transport event.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Drives one [`Service`] from one [`Host`].
///
/// # Example
///
/// ```rust,ignore
/// let host = WebSocketHost::bind("0.0.0.0:13355", 256).await?;
/// let server = Server::new(host, RegistryService::new(config.registry));
/// server.run(shutdown_signal()).await?;
/// ```
pub struct Server<H: Host, S: Service> {
    host: H,
    service: S,
    clock: FrameClock,
    poll_interval: Duration,
    /// Addresses from `Connected`, so each packet does not ask the host.
    peers: HashMap<ConnectionId, SocketAddr>,
}

impl<H: Host, S: Service> Server<H, S> {
    /// A server with no frame clock and the default poll interval.
    pub fn new(host: H, service: S) -> Self {
        let mut clock = FrameClock::new(FrameConfig::with_rate(0));
        clock.pause();
        Self {
            host,
            service,
            clock,
            poll_interval: DEFAULT_POLL_INTERVAL,
            peers: HashMap::new(),
        }
    }

    /// Runs animation frames at `rate_hz` while the service animates.
    pub fn with_frame_rate(mut self, rate_hz: u32) -> Self {
        self.clock = FrameClock::new(FrameConfig::with_rate(rate_hz));
        self.clock.pause();
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Runs until `shutdown` resolves, then shuts the host down.
    ///
    /// Per-packet failures are logged and never end the loop. Only a
    /// failing host does, and then the error is returned.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> Result<(), GameboxError> {
        tokio::pin!(shutdown);
        tracing::info!("session loop running");

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("shutdown requested, draining");
                    break;
                }
                frame = self.clock.wait_for_frame() => {
                    let out = self.service.on_frame(frame.dt_secs());
                    Self::dispatch(&self.host, out).await;
                }
                event = self.host.poll_event(self.poll_interval) => {
                    match event {
                        Ok(Some(event)) => self.handle_event(event).await,
                        Ok(None) => {}
                        Err(e) => {
                            tracing::error!(error = %e, "host failed, stopping");
                            return Err(GameboxError::Host(Box::new(e)));
                        }
                    }
                }
            }
            self.sync_clock();
        }

        self.host
            .shutdown()
            .await
            .map_err(|e| GameboxError::Host(Box::new(e)))?;
        tracing::info!("session loop stopped");
        Ok(())
    }

    /// Runs the frame clock only while the service has something moving.
    fn sync_clock(&mut self) {
        if self.service.is_animating() {
            self.clock.resume();
        } else {
            self.clock.pause();
        }
    }

    async fn handle_event(&mut self, event: TransportEvent) {
        let out = match event {
            TransportEvent::Connected { id, peer } => {
                tracing::info!(conn_id = %id, %peer, "peer connected");
                self.peers.insert(id, peer);
                self.service.on_connect(id, peer)
            }
            TransportEvent::Received { id, data } => {
                let peer = match self.peers.get(&id) {
                    Some(peer) => *peer,
                    None => match self.host.peer_addr(id).await {
                        Some(peer) => peer,
                        None => {
                            tracing::debug!(conn_id = %id, "packet from unknown peer dropped");
                            return;
                        }
                    },
                };
                match self.service.on_packet(id, peer, &data) {
                    Ok(out) => out,
                    Err(e) => {
                        tracing::warn!(conn_id = %id, error = %e, "packet discarded");
                        return;
                    }
                }
            }
            TransportEvent::Disconnected { id } => {
                tracing::info!(conn_id = %id, "peer disconnected");
                self.peers.remove(&id);
                self.service.on_disconnect(id)
            }
        };
        Self::dispatch(&self.host, out).await;
    }

    /// Sends each packet to its recipients. A peer that vanished in the
    /// meantime is not an error worth more than a debug line.
    async fn dispatch(host: &H, out: Vec<Outgoing>) {
        for packet in out {
            match &packet.to {
                Recipient::Peer(id) => Self::send_to(host, *id, &packet).await,
                Recipient::Peers(ids) => {
                    for id in ids {
                        Self::send_to(host, *id, &packet).await;
                    }
                }
                Recipient::All => {
                    if let Err(e) = host.broadcast(&packet.data, packet.delivery).await {
                        tracing::debug!(error = %e, "broadcast failed");
                    }
                }
            }
        }
    }

    async fn send_to(host: &H, id: ConnectionId, packet: &Outgoing) {
        if let Err(e) = host.send(id, &packet.data, packet.delivery).await {
            tracing::debug!(conn_id = %id, error = %e, "send failed");
        }
    }
}
