//! WebSocket host implementation using `tokio-tungstenite`.
//!
//! One accept task, plus a reader and a writer task per peer. Readers push
//! into a single bounded event queue that [`WebSocketHost::poll_event`]
//! drains; writers drain a per-peer outbound queue.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use crate::{ConnectionId, Delivery, Host, TransportError, TransportEvent};

/// Capacity of the shared event queue. Readers wait when it is full.
const EVENT_QUEUE_SIZE: usize = 1024;

/// How long a closed peer's writer may take to flush before it is
/// aborted. A peer that stopped reading must not hold up `Disconnected`.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

type PeerMap = Arc<Mutex<HashMap<ConnectionId, Peer>>>;

struct Peer {
    addr: SocketAddr,
    outbound: mpsc::UnboundedSender<Message>,
}

/// A WebSocket-based [`Host`] listening for incoming peers.
pub struct WebSocketHost {
    local_addr: SocketAddr,
    events: mpsc::Receiver<TransportEvent>,
    peers: PeerMap,
    accept_task: JoinHandle<()>,
}

impl WebSocketHost {
    /// Binds a new WebSocket host to the given address.
    ///
    /// At most `max_connections` peers are served at once; further TCP
    /// connections are dropped on accept.
    pub async fn bind(
        addr: &str,
        max_connections: usize,
    ) -> Result<Self, TransportError> {
        let listener =
            TcpListener::bind(addr).await.map_err(TransportError::BindFailed)?;
        let local_addr =
            listener.local_addr().map_err(TransportError::BindFailed)?;

        let (tx, rx) = mpsc::channel(EVENT_QUEUE_SIZE);
        let peers: PeerMap = Arc::new(Mutex::new(HashMap::new()));
        let accept_task = tokio::spawn(accept_loop(
            listener,
            tx,
            Arc::clone(&peers),
            max_connections,
        ));

        tracing::info!(%local_addr, "WebSocket host listening");
        Ok(Self {
            local_addr,
            events: rx,
            peers,
            accept_task,
        })
    }

    /// The address the host is actually bound to (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    async fn outbound(
        &self,
        id: ConnectionId,
    ) -> Result<mpsc::UnboundedSender<Message>, TransportError> {
        self.peers
            .lock()
            .await
            .get(&id)
            .map(|peer| peer.outbound.clone())
            .ok_or(TransportError::UnknownConnection(id))
    }
}

impl Host for WebSocketHost {
    type Error = TransportError;

    async fn poll_event(
        &mut self,
        wait: Duration,
    ) -> Result<Option<TransportEvent>, Self::Error> {
        match tokio::time::timeout(wait, self.events.recv()).await {
            Ok(Some(event)) => Ok(Some(event)),
            Ok(None) => Err(TransportError::Shutdown),
            Err(_) => Ok(None),
        }
    }

    async fn send(
        &self,
        id: ConnectionId,
        data: &[u8],
        // WebSocket has no unreliable channel; everything goes reliable.
        _delivery: Delivery,
    ) -> Result<(), Self::Error> {
        let outbound = self.outbound(id).await?;
        outbound
            .send(Message::Binary(data.to_vec().into()))
            .map_err(|_| TransportError::ConnectionClosed(id))
    }

    async fn broadcast(
        &self,
        data: &[u8],
        _delivery: Delivery,
    ) -> Result<(), Self::Error> {
        let peers = self.peers.lock().await;
        for (id, peer) in peers.iter() {
            let msg = Message::Binary(data.to_vec().into());
            if peer.outbound.send(msg).is_err() {
                tracing::debug!(%id, "broadcast skipped closed peer");
            }
        }
        Ok(())
    }

    async fn peer_addr(&self, id: ConnectionId) -> Option<SocketAddr> {
        self.peers.lock().await.get(&id).map(|peer| peer.addr)
    }

    async fn disconnect(&self, id: ConnectionId) -> Result<(), Self::Error> {
        let outbound = self.outbound(id).await?;
        outbound
            .send(Message::Close(None))
            .map_err(|_| TransportError::ConnectionClosed(id))
    }

    async fn shutdown(&mut self) -> Result<(), Self::Error> {
        self.accept_task.abort();
        let mut peers = self.peers.lock().await;
        for (_, peer) in peers.drain() {
            let _ = peer.outbound.send(Message::Close(None));
        }
        tracing::info!(local_addr = %self.local_addr, "WebSocket host shut down");
        Ok(())
    }
}

impl Drop for WebSocketHost {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn accept_loop(
    listener: TcpListener,
    events: mpsc::Sender<TransportEvent>,
    peers: PeerMap,
    max_connections: usize,
) {
    let mut next_id: u32 = 1;

    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!(error = %e, "accept failed");
                continue;
            }
        };

        if peers.lock().await.len() >= max_connections {
            tracing::warn!(%addr, max_connections, "connection limit reached, refusing peer");
            continue;
        }

        let id = ConnectionId::new(next_id);
        // Id 0 is never handed out.
        next_id = next_id.checked_add(1).unwrap_or(1);

        tokio::spawn(serve_peer(
            id,
            stream,
            addr,
            events.clone(),
            Arc::clone(&peers),
        ));
    }
}

async fn serve_peer(
    id: ConnectionId,
    stream: TcpStream,
    addr: SocketAddr,
    events: mpsc::Sender<TransportEvent>,
    peers: PeerMap,
) {
    let ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            tracing::debug!(%addr, error = %e, "WebSocket upgrade failed");
            return;
        }
    };
    let (mut sink, mut stream) = ws.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();

    peers.lock().await.insert(
        id,
        Peer {
            addr,
            outbound: out_tx,
        },
    );
    tracing::debug!(%id, %addr, "accepted WebSocket peer");

    if events
        .send(TransportEvent::Connected { id, peer: addr })
        .await
        .is_err()
    {
        peers.lock().await.remove(&id);
        return;
    }

    let writer = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if sink.send(msg).await.is_err() || closing {
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(frame) = stream.next().await {
        let data = match frame {
            Ok(Message::Binary(data)) => data.into(),
            Ok(Message::Text(text)) => text.as_bytes().to_vec(),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue, // ping/pong/frame
            Err(e) => {
                tracing::debug!(%id, error = %e, "receive failed");
                break;
            }
        };
        if events
            .send(TransportEvent::Received { id, data })
            .await
            .is_err()
        {
            break;
        }
    }

    // Dropping the peer's sender ends the writer task.
    peers.lock().await.remove(&id);
    finish_writer(writer, WRITER_DRAIN_TIMEOUT).await;
    let _ = events.send(TransportEvent::Disconnected { id }).await;
    tracing::debug!(%id, "WebSocket peer closed");
}

/// Waits up to `grace` for `writer` to flush and close, then aborts it.
async fn finish_writer(mut writer: JoinHandle<()>, grace: Duration) {
    if tokio::time::timeout(grace, &mut writer).await.is_err() {
        tracing::debug!("peer writer stalled, aborting");
        writer.abort();
    }
}
