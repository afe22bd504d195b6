//! Integration tests for the WebSocket host.
//!
//! These spin up a real host on an OS-assigned port and drive it with a
//! `tokio-tungstenite` client.

#[cfg(feature = "websocket")]
mod websocket {
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use gamebox_transport::{Delivery, Host, TransportEvent, WebSocketHost};
    use tokio_tungstenite::tungstenite::Message;

    type ClientStream = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn connect_client(host: &WebSocketHost) -> ClientStream {
        let url = format!("ws://{}", host.local_addr());
        let (ws, _) = tokio_tungstenite::connect_async(&url)
            .await
            .expect("client should connect");
        ws
    }

    /// Polls until an event arrives, failing the test after a few seconds.
    async fn next_event(host: &mut WebSocketHost) -> TransportEvent {
        for _ in 0..50 {
            if let Some(event) = host
                .poll_event(Duration::from_millis(100))
                .await
                .expect("host should be running")
            {
                return event;
            }
        }
        panic!("no transport event within 5s");
    }

    #[tokio::test]
    async fn test_websocket_connect_receive_send() {
        let mut host = WebSocketHost::bind("127.0.0.1:0", 8)
            .await
            .expect("should bind");
        let mut client = connect_client(&host).await;

        let id = match next_event(&mut host).await {
            TransportEvent::Connected { id, peer } => {
                assert!(peer.ip().is_loopback());
                assert_eq!(host.peer_addr(id).await, Some(peer));
                id
            }
            other => panic!("expected Connected, got {other:?}"),
        };

        client
            .send(Message::Binary(vec![0xC0].into()))
            .await
            .expect("client send");
        match next_event(&mut host).await {
            TransportEvent::Received { id: from, data } => {
                assert_eq!(from, id);
                assert_eq!(data, vec![0xC0]);
            }
            other => panic!("expected Received, got {other:?}"),
        }

        host.send(id, &[1, 2, 3], Delivery::Reliable)
            .await
            .expect("host send");
        let reply = client.next().await.expect("frame").expect("ok frame");
        assert_eq!(reply, Message::Binary(vec![1, 2, 3].into()));
    }

    #[tokio::test]
    async fn test_websocket_client_close_emits_disconnected() {
        let mut host = WebSocketHost::bind("127.0.0.1:0", 8)
            .await
            .expect("should bind");
        let mut client = connect_client(&host).await;

        let id = next_event(&mut host).await.connection();
        client.close(None).await.expect("client close");

        assert_eq!(
            next_event(&mut host).await,
            TransportEvent::Disconnected { id }
        );
        assert_eq!(host.peer_addr(id).await, None);
    }

    #[tokio::test]
    async fn test_websocket_broadcast_reaches_every_peer() {
        let mut host = WebSocketHost::bind("127.0.0.1:0", 8)
            .await
            .expect("should bind");
        let mut a = connect_client(&host).await;
        next_event(&mut host).await;
        let mut b = connect_client(&host).await;
        next_event(&mut host).await;

        host.broadcast(&[9], Delivery::Unreliable)
            .await
            .expect("broadcast");

        for client in [&mut a, &mut b] {
            let frame = client.next().await.expect("frame").expect("ok");
            assert_eq!(frame, Message::Binary(vec![9].into()));
        }
    }

    #[tokio::test]
    async fn test_websocket_send_to_unknown_connection_fails() {
        let host = WebSocketHost::bind("127.0.0.1:0", 8)
            .await
            .expect("should bind");
        let missing = gamebox_transport::ConnectionId::new(999);
        let result = host.send(missing, &[1], Delivery::Reliable).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_websocket_bind_twice_same_port_fails() {
        let host = WebSocketHost::bind("127.0.0.1:0", 8)
            .await
            .expect("should bind");
        let addr = host.local_addr().to_string();
        let second = WebSocketHost::bind(&addr, 8).await;
        assert!(matches!(
            second,
            Err(gamebox_transport::TransportError::BindFailed(_))
        ));
    }
}
