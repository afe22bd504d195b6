//! End-to-end tests: a real session loop behind a real WebSocket host,
//! driven by `tokio-tungstenite` clients.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use gamebox::{Announcer, RegistryService, Server, TableService};
use gamebox_protocol::{
    Color, Command, ConnectionId, Notice, Opcode, PieceId, RejectReason, Vec2,
};
use gamebox_registry::RegistryConfig;
use gamebox_table::TableConfig;
use gamebox_transport::WebSocketHost;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

type ClientStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

// =========================================================================
// Helpers
// =========================================================================

/// A server running on its own task until `stop` is called.
struct Running {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<Result<(), gamebox::GameboxError>>,
}

impl Running {
    async fn stop(self) {
        let _ = self.shutdown.send(());
        self.task
            .await
            .expect("server task should not panic")
            .expect("server should stop cleanly");
    }
}

async fn spawn<S: gamebox::Service>(service: S) -> Running {
    let host = WebSocketHost::bind("127.0.0.1:0", 16)
        .await
        .expect("should bind");
    let addr = host.local_addr();
    let (shutdown, rx) = oneshot::channel();
    let server = Server::new(host, service).with_poll_interval(Duration::from_millis(10));
    let task = tokio::spawn(server.run(async {
        let _ = rx.await;
    }));
    Running {
        addr,
        shutdown,
        task,
    }
}

async fn spawn_table() -> Running {
    spawn(TableService::with_seed(TableConfig::default(), 1)).await
}

async fn connect(addr: SocketAddr) -> ClientStream {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("client should connect");
    ws
}

async fn send(client: &mut ClientStream, command: Command) {
    let data = command.encode().expect("command should encode");
    client
        .send(Message::Binary(data.into()))
        .await
        .expect("client send");
}

/// Next binary frame as raw bytes, failing the test after a few seconds.
async fn recv_bytes(client: &mut ClientStream) -> Vec<u8> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let frame = tokio::time::timeout_at(deadline, client.next())
            .await
            .expect("no packet within 5s")
            .expect("connection closed")
            .expect("websocket error");
        if let Message::Binary(data) = frame {
            return data.to_vec();
        }
    }
}

async fn recv(client: &mut ClientStream) -> Notice {
    Notice::decode(&recv_bytes(client).await).expect("notice should decode")
}

/// Asserts nothing arrives for a short while.
async fn assert_silent(client: &mut ClientStream) {
    let frame = tokio::time::timeout(Duration::from_millis(200), client.next()).await;
    assert!(frame.is_err(), "unexpected packet: {frame:?}");
}

/// Handshake and join; returns the id the server assigned.
async fn join(client: &mut ClientStream, nick: &str) -> ConnectionId {
    send(client, Command::Handshake).await;
    let id = match recv(client).await {
        Notice::Handshake { client } => client,
        other => panic!("expected Handshake, got {other:?}"),
    };
    send(client, Command::Join {
        nick: nick.into(),
        color: Color(0x00ff_00ff),
    })
    .await;
    id
}

/// Reads notices until the JOIN broadcast about `id` arrives.
async fn until_joined(client: &mut ClientStream, id: ConnectionId) -> Vec<Notice> {
    let mut seen = Vec::new();
    loop {
        let notice = recv(client).await;
        let done = matches!(notice, Notice::Join { client, .. } if client == id);
        seen.push(notice);
        if done {
            return seen;
        }
    }
}

// =========================================================================
// Registry
// =========================================================================

#[tokio::test]
async fn test_registry_handshake_replies_with_empty_list() {
    let server = spawn(RegistryService::new(RegistryConfig::default())).await;
    let mut client = connect(server.addr).await;

    send(&mut client, Command::Handshake).await;

    assert_eq!(recv_bytes(&mut client).await, vec![Opcode::ServerQuery.as_u8()]);
    server.stop().await;
}

#[tokio::test]
async fn test_registry_register_then_query_lists_connection_address() {
    let server = spawn(RegistryService::new(RegistryConfig::default())).await;
    let mut table = connect(server.addr).await;
    let mut browser = connect(server.addr).await;

    send(&mut table, Command::ServerRegister {
        port: 13355,
        name: "Test".into(),
        players: 0,
    })
    .await;
    // Same connection, so the update is ordered after the register.
    send(&mut table, Command::ServerUpdate {
        name: "Test".into(),
        players: 2,
    })
    .await;
    send(&mut table, Command::ServerQuery).await;
    match recv(&mut table).await {
        Notice::ServerList { servers } => assert_eq!(servers.len(), 1),
        other => panic!("expected ServerList, got {other:?}"),
    }

    send(&mut browser, Command::ServerQuery).await;
    match recv(&mut browser).await {
        Notice::ServerList { servers } => {
            assert_eq!(servers.len(), 1);
            assert_eq!(servers[0].address, "127.0.0.1");
            assert_eq!(servers[0].port, 13355);
            assert_eq!(servers[0].name, "Test");
            assert_eq!(servers[0].players, 2);
        }
        other => panic!("expected ServerList, got {other:?}"),
    }
    server.stop().await;
}

#[tokio::test]
async fn test_announcer_registers_with_registry() {
    let server = spawn(RegistryService::new(RegistryConfig::default())).await;
    let (players_tx, players_rx) = watch::channel(3u16);
    let announcer = Announcer::new(
        format!("ws://{}", server.addr),
        4000,
        "Announced",
        Duration::from_secs(60),
        players_rx,
    );
    let announcing = tokio::spawn(announcer.run());

    let mut browser = connect(server.addr).await;
    let mut listed = Vec::new();
    for _ in 0..50 {
        send(&mut browser, Command::ServerQuery).await;
        if let Notice::ServerList { servers } = recv(&mut browser).await {
            if !servers.is_empty() {
                listed = servers;
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    assert_eq!(listed.len(), 1, "announcer never registered");
    assert_eq!(listed[0].port, 4000);
    assert_eq!(listed[0].name, "Announced");
    assert_eq!(listed[0].players, 3);

    // Dropping the sender ends the announcer.
    drop(players_tx);
    tokio::time::timeout(Duration::from_secs(5), announcing)
        .await
        .expect("announcer should stop")
        .expect("announcer should not panic");
    server.stop().await;
}

// =========================================================================
// Table
// =========================================================================

#[tokio::test]
async fn test_table_join_broadcasts_to_newcomer() {
    let server = spawn_table().await;
    let mut x = connect(server.addr).await;

    let id = join(&mut x, "alice").await;

    match recv(&mut x).await {
        Notice::Join { client, nick, .. } => {
            assert_eq!(client, id);
            assert_eq!(nick, "alice");
        }
        other => panic!("expected Join, got {other:?}"),
    }
    server.stop().await;
}

#[tokio::test]
async fn test_table_duplicate_nick_gets_nick_taken() {
    let server = spawn_table().await;
    let mut x = connect(server.addr).await;
    let mut y = connect(server.addr).await;

    let x_id = join(&mut x, "alice").await;
    until_joined(&mut x, x_id).await;

    join(&mut y, "alice").await;

    assert_eq!(recv(&mut y).await, Notice::NickTaken {
        nick: "alice".into()
    });
    assert_silent(&mut x).await;
    server.stop().await;
}

#[tokio::test]
async fn test_table_select_conflict_rejects_second_client() {
    let server = spawn_table().await;
    let mut x = connect(server.addr).await;
    let mut y = connect(server.addr).await;

    let x_id = join(&mut x, "alice").await;
    until_joined(&mut x, x_id).await;

    send(&mut x, Command::Create {
        class_id: "card".into(),
        object_id: "ace".into(),
        location: Vec2::new(10.0, 10.0),
    })
    .await;
    let piece = match recv(&mut x).await {
        Notice::Create(snapshot) => snapshot.piece,
        other => panic!("expected Create, got {other:?}"),
    };

    let y_id = join(&mut y, "bob").await;
    let catch_up = until_joined(&mut y, y_id).await;
    assert!(
        catch_up
            .iter()
            .any(|notice| matches!(notice, Notice::Create(s) if s.piece == piece)),
        "newcomer was not sent the existing piece"
    );
    until_joined(&mut x, y_id).await;

    send(&mut x, Command::Select {
        piece,
        select: true,
    })
    .await;
    let selected = Notice::Select {
        piece,
        client: Some(x_id),
    };
    assert_eq!(recv(&mut x).await, selected);
    assert_eq!(recv(&mut y).await, selected);

    send(&mut y, Command::Select {
        piece,
        select: true,
    })
    .await;
    assert_eq!(recv(&mut y).await, Notice::Reject {
        opcode: Opcode::Select,
        reason: RejectReason::Unauthorized,
        piece,
    });
    assert_silent(&mut x).await;
    server.stop().await;
}

#[tokio::test]
async fn test_table_disconnect_releases_selection_and_announces_leave() {
    let server = spawn_table().await;
    let mut x = connect(server.addr).await;
    let mut y = connect(server.addr).await;

    let x_id = join(&mut x, "alice").await;
    until_joined(&mut x, x_id).await;
    send(&mut x, Command::Create {
        class_id: "card".into(),
        object_id: "ace".into(),
        location: Vec2::new(0.0, 0.0),
    })
    .await;
    let piece = match recv(&mut x).await {
        Notice::Create(snapshot) => snapshot.piece,
        other => panic!("expected Create, got {other:?}"),
    };
    send(&mut x, Command::Select {
        piece,
        select: true,
    })
    .await;
    recv(&mut x).await;

    let y_id = join(&mut y, "bob").await;
    until_joined(&mut y, y_id).await;

    x.close(None).await.expect("close");

    assert_eq!(recv(&mut y).await, Notice::Select {
        piece,
        client: None,
    });
    assert_eq!(recv(&mut y).await, Notice::Leave { client: x_id });
    server.stop().await;
}

#[tokio::test]
async fn test_table_malformed_packet_keeps_session_alive() {
    let server = spawn_table().await;
    let mut x = connect(server.addr).await;

    // SELECT cut off inside the piece id, then an unknown opcode.
    x.send(Message::Binary(vec![Opcode::Select.as_u8(), 0x01].into()))
        .await
        .expect("client send");
    x.send(Message::Binary(vec![0x7F].into()))
        .await
        .expect("client send");
    assert_silent(&mut x).await;

    send(&mut x, Command::Handshake).await;
    assert!(matches!(recv(&mut x).await, Notice::Handshake { .. }));
    server.stop().await;
}

#[tokio::test]
async fn test_table_command_before_join_is_rejected() {
    let server = spawn_table().await;
    let mut x = connect(server.addr).await;

    send(&mut x, Command::Chat {
        message: "hello?".into(),
    })
    .await;

    assert_eq!(recv(&mut x).await, Notice::Reject {
        opcode: Opcode::Chat,
        reason: RejectReason::Unauthorized,
        piece: PieceId::NONE,
    });
    server.stop().await;
}
