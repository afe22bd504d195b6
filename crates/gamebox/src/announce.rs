//! Advertising a table server to a registry.
//!
//! The announcer opens its own WebSocket connection to the registry,
//! sends SERVER_REGISTER once, then SERVER_UPDATE every heartbeat with the
//! current player count. If the connection drops it reconnects after one
//! heartbeat and registers again.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use gamebox_protocol::{Command, ProtocolError};
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::{self, Message};

/// Why one announcer session ended.
#[derive(Debug, thiserror::Error)]
pub enum AnnounceError {
    #[error("registry connection failed: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("registry closed the connection")]
    Closed,
}

/// Keeps one table server listed in one registry.
pub struct Announcer {
    registry_url: String,
    port: u16,
    name: String,
    heartbeat: Duration,
    players: watch::Receiver<u16>,
}

impl Announcer {
    /// `port` is the table server's listen port; the registry takes the
    /// address from the connection itself.
    pub fn new(
        registry_url: impl Into<String>,
        port: u16,
        name: impl Into<String>,
        heartbeat: Duration,
        players: watch::Receiver<u16>,
    ) -> Self {
        Self {
            registry_url: registry_url.into(),
            port,
            name: name.into(),
            heartbeat: heartbeat.max(Duration::from_secs(1)),
            players,
        }
    }

    /// Announces until the player count's sender goes away (the table
    /// service was dropped), reconnecting on failure.
    pub async fn run(mut self) {
        loop {
            match self.session().await {
                Ok(()) => {
                    tracing::info!(url = %self.registry_url, "announcer stopped");
                    return;
                }
                Err(e) => {
                    tracing::warn!(
                        url = %self.registry_url,
                        error = %e,
                        retry_secs = self.heartbeat.as_secs(),
                        "registry announce failed"
                    );
                }
            }
            tokio::time::sleep(self.heartbeat).await;
            if self.players.has_changed().is_err() {
                return;
            }
        }
    }

    /// One connection: register, then heartbeat until something breaks.
    ///
    /// Returns `Ok(())` only when there is nothing left to announce.
    async fn session(&mut self) -> Result<(), AnnounceError> {
        let (ws, _) = tokio_tungstenite::connect_async(self.registry_url.as_str()).await?;
        let (mut sink, mut stream) = ws.split();

        let register = Command::ServerRegister {
            port: self.port,
            name: self.name.clone(),
            players: *self.players.borrow(),
        };
        sink.send(Message::Binary(register.encode()?.into())).await?;
        tracing::info!(url = %self.registry_url, port = self.port, name = %self.name, "registered with registry");

        let mut heartbeat = tokio::time::interval(self.heartbeat);
        // The first tick fires immediately; REGISTER already covered it.
        heartbeat.tick().await;

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    let update = Command::ServerUpdate {
                        name: self.name.clone(),
                        players: *self.players.borrow(),
                    };
                    sink.send(Message::Binary(update.encode()?.into())).await?;
                    tracing::debug!(url = %self.registry_url, "heartbeat sent");
                }
                changed = self.players.changed() => {
                    if changed.is_err() {
                        let _ = sink.close().await;
                        return Ok(());
                    }
                }
                frame = stream.next() => match frame {
                    // The registry sends nothing unprompted; reading keeps
                    // ping/pong and close handling alive.
                    Some(Ok(Message::Close(_))) | None => return Err(AnnounceError::Closed),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                },
            }
        }
    }
}
