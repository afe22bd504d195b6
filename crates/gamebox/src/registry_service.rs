//! The discovery service run by the `gamebox-registry` binary.

use std::net::SocketAddr;
use std::time::Instant;

use gamebox_protocol::{Command, ConnectionId, Notice, Outgoing, Recipient};
use gamebox_registry::{RegistryConfig, ServerRegistry};

use crate::{Service, ServiceError};

/// Answers HANDSHAKE, SERVER_QUERY, SERVER_REGISTER and SERVER_UPDATE.
///
/// A HANDSHAKE is answered with an empty server list: that reply shape is
/// how a client tells a registry apart from a table server.
pub struct RegistryService {
    registry: ServerRegistry,
}

impl RegistryService {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            registry: ServerRegistry::new(config),
        }
    }

    pub fn registry(&self) -> &ServerRegistry {
        &self.registry
    }
}

impl Service for RegistryService {
    fn on_connect(&mut self, conn: ConnectionId, peer: SocketAddr) -> Vec<Outgoing> {
        tracing::debug!(%conn, %peer, "discovery peer connected");
        Vec::new()
    }

    fn on_packet(
        &mut self,
        conn: ConnectionId,
        peer: SocketAddr,
        data: &[u8],
    ) -> Result<Vec<Outgoing>, ServiceError> {
        let command = Command::decode(data)?;
        self.registry.expire_stale(Instant::now());

        let reply = match command {
            Command::Handshake => Notice::ServerList { servers: Vec::new() },
            Command::ServerQuery => Notice::ServerList {
                servers: self.registry.query(),
            },
            Command::ServerRegister {
                port,
                name,
                players,
            } => {
                self.registry
                    .register(peer.ip().to_string(), port, name, players, conn)?;
                return Ok(Vec::new());
            }
            Command::ServerUpdate { name, players } => {
                self.registry.update(conn, name, players);
                return Ok(Vec::new());
            }
            other => return Err(ServiceError::UnexpectedOpcode(other.opcode())),
        };

        Ok(vec![Outgoing::reliable(Recipient::Peer(conn), &reply)?])
    }

    fn on_disconnect(&mut self, conn: ConnectionId) -> Vec<Outgoing> {
        // Records outlive their connection; the origin just stops matching.
        tracing::debug!(%conn, "discovery peer disconnected");
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use gamebox_protocol::{Opcode, ServerEntry};

    use super::*;

    fn peer() -> SocketAddr {
        "203.0.113.5:50000".parse().unwrap()
    }

    fn send(
        service: &mut RegistryService,
        conn: u32,
        command: Command,
    ) -> Result<Vec<Outgoing>, ServiceError> {
        service.on_packet(ConnectionId::new(conn), peer(), &command.encode().unwrap())
    }

    fn only_reply(out: Vec<Outgoing>) -> Notice {
        assert_eq!(out.len(), 1);
        Notice::decode(&out[0].data).unwrap()
    }

    #[test]
    fn test_handshake_replies_with_empty_server_list() {
        let mut service = RegistryService::new(RegistryConfig::default());
        send(&mut service, 1, Command::ServerRegister {
            port: 1,
            name: "x".into(),
            players: 0,
        })
        .unwrap();

        let out = send(&mut service, 2, Command::Handshake).unwrap();

        assert_eq!(out[0].to, Recipient::Peer(ConnectionId::new(2)));
        assert_eq!(out[0].data, vec![Opcode::ServerQuery.as_u8()]);
    }

    #[test]
    fn test_register_then_query_lists_peer_address() {
        let mut service = RegistryService::new(RegistryConfig::default());

        let out = send(&mut service, 1, Command::ServerRegister {
            port: 13355,
            name: "Test".into(),
            players: 0,
        })
        .unwrap();
        assert!(out.is_empty());

        let reply = only_reply(send(&mut service, 1, Command::ServerQuery).unwrap());
        assert_eq!(
            reply,
            Notice::ServerList {
                servers: vec![ServerEntry {
                    address: "203.0.113.5".into(),
                    port: 13355,
                    name: "Test".into(),
                    players: 0,
                }]
            }
        );
    }

    #[test]
    fn test_update_from_origin_refreshes_record() {
        let mut service = RegistryService::new(RegistryConfig::default());
        send(&mut service, 1, Command::ServerRegister {
            port: 13355,
            name: "Test".into(),
            players: 0,
        })
        .unwrap();

        send(&mut service, 1, Command::ServerUpdate {
            name: "Test".into(),
            players: 4,
        })
        .unwrap();
        // A stranger's update changes nothing.
        send(&mut service, 9, Command::ServerUpdate {
            name: "Hijack".into(),
            players: 99,
        })
        .unwrap();

        let records = service.registry().records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Test");
        assert_eq!(records[0].players, 4);
    }

    #[test]
    fn test_table_command_is_unexpected() {
        let mut service = RegistryService::new(RegistryConfig::default());
        let result = send(&mut service, 1, Command::Chat {
            message: "hi".into(),
        });
        assert!(matches!(
            result,
            Err(ServiceError::UnexpectedOpcode(Opcode::Chat))
        ));
    }

    #[test]
    fn test_malformed_packet_is_protocol_error_and_changes_nothing() {
        let mut service = RegistryService::new(RegistryConfig::default());
        // SERVER_REGISTER cut off inside the port.
        let result = service.on_packet(ConnectionId::new(1), peer(), &[0xC1, 0x2B]);
        assert!(matches!(result, Err(ServiceError::Protocol(_))));
        assert!(service.registry().is_empty());
    }
}
