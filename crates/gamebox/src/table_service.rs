//! The table service run by the `gamebox-table` binary.
//!
//! Owns one [`Table`] and the [`ClientDirectory`] of everyone at it, and
//! turns each decoded [`Command`] into either broadcasts to the joined
//! clients or a REJECT to the requester alone.

use std::net::SocketAddr;

use gamebox_protocol::{
    Color, Command, ConnectionId, Notice, Outgoing, PieceId, Recipient, RejectReason,
};
use gamebox_session::{ClientDirectory, DirectoryError};
use gamebox_table::{PieceSpec, Table, TableConfig, TableError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;

use crate::service::push_notice;
use crate::{Service, ServiceError};

/// Why a command produced no broadcast.
enum Failure {
    /// Tell the requester with a REJECT.
    Refused {
        reason: RejectReason,
        piece: PieceId,
        cause: String,
    },
    /// Log and drop.
    Service(ServiceError),
}

impl From<TableError> for Failure {
    fn from(e: TableError) -> Self {
        Self::Refused {
            reason: e.reject_reason(),
            piece: e.piece(),
            cause: e.to_string(),
        }
    }
}

impl From<DirectoryError> for Failure {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::InvalidNickname | DirectoryError::AlreadyJoined(_) => {
                Self::Refused {
                    reason: RejectReason::Invalid,
                    piece: PieceId::NONE,
                    cause: e.to_string(),
                }
            }
            other => Self::Service(other.into()),
        }
    }
}

impl From<gamebox_protocol::ProtocolError> for Failure {
    fn from(e: gamebox_protocol::ProtocolError) -> Self {
        Self::Service(e.into())
    }
}

/// Serves one shared table.
pub struct TableService {
    table: Table,
    directory: ClientDirectory,
    rng: StdRng,
    players: watch::Sender<u16>,
}

impl TableService {
    pub fn new(config: TableConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// A service whose shuffles and dice are reproducible.
    pub fn with_seed(config: TableConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: TableConfig, rng: StdRng) -> Self {
        let (players, _) = watch::channel(0);
        Self {
            table: Table::new(config),
            directory: ClientDirectory::new(),
            rng,
            players,
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn directory(&self) -> &ClientDirectory {
        &self.directory
    }

    /// Number of joined clients.
    pub fn player_count(&self) -> u16 {
        u16::try_from(self.directory.joined_count()).unwrap_or(u16::MAX)
    }

    /// Follows the player count, for the registry announcer.
    pub fn subscribe_players(&self) -> watch::Receiver<u16> {
        self.players.subscribe()
    }

    fn publish_players(&self) {
        self.players.send_replace(self.player_count());
    }

    /// Everyone who sees table traffic.
    fn joined(&self) -> Recipient {
        Recipient::Peers(self.directory.joined_ids())
    }

    fn broadcast(&self, notices: impl IntoIterator<Item = Notice>) -> Result<Vec<Outgoing>, Failure> {
        let to = self.joined();
        notices
            .into_iter()
            .map(|notice| Outgoing::reliable(to.clone(), &notice).map_err(Failure::from))
            .collect()
    }

    fn require_joined(&self, conn: ConnectionId) -> Result<(), TableError> {
        if self.directory.is_joined(conn) {
            Ok(())
        } else {
            Err(TableError::NotJoined)
        }
    }

    fn apply(&mut self, conn: ConnectionId, command: Command) -> Result<Vec<Outgoing>, Failure> {
        let opcode = command.opcode();
        match command {
            Command::Handshake => Ok(vec![Outgoing::reliable(
                Recipient::Peer(conn),
                &Notice::Handshake { client: conn },
            )?]),

            Command::Join { nick, color } => self.join(conn, nick, color),

            Command::Create {
                class_id,
                object_id,
                location,
            } => {
                self.require_joined(conn)?;
                let spec = PieceSpec::from_config(class_id, object_id, self.table.config());
                let snapshot = self.table.create(spec, location)?.snapshot();
                self.broadcast([Notice::Create(snapshot)])
            }

            Command::Select { piece, select } => {
                self.require_joined(conn)?;
                let client = self.table.select(conn, piece, select)?;
                self.broadcast([Notice::Select { piece, client }])
            }

            Command::Own { piece, own } => {
                self.require_joined(conn)?;
                let owner = self.table.own(conn, piece, own)?;
                self.broadcast([Notice::Own { piece, owner }])
            }

            Command::Remove { piece } => {
                self.require_joined(conn)?;
                self.table.remove(conn, piece)?;
                self.broadcast([Notice::Remove { piece }])
            }

            Command::Move {
                piece,
                target,
                duration,
            } => {
                self.require_joined(conn)?;
                let duration = if self.table.config().animation_rate_hz == 0 && duration > 0.0 {
                    0.0
                } else {
                    duration
                };
                let moved = self.table.move_piece(conn, piece, target, duration)?;
                self.broadcast(moved.into_iter().map(|(piece, target)| Notice::Move {
                    piece,
                    target,
                    duration,
                }))
            }

            Command::Flip { piece, mode } => {
                self.require_joined(conn)?;
                let flipped = self.table.flip(conn, piece, mode)?;
                self.broadcast([Notice::Flip { piece, flipped }])
            }

            Command::Shuffle { pieces } => {
                self.require_joined(conn)?;
                let placements = self.table.shuffle(conn, &pieces, &mut self.rng)?;
                self.broadcast([Notice::Shuffle { placements }])
            }

            Command::Rotate { piece, step } => {
                self.require_joined(conn)?;
                let rotated = self.table.rotate(conn, piece, step)?;
                self.broadcast(
                    rotated
                        .into_iter()
                        .map(|(piece, rotation)| Notice::Rotate { piece, rotation }),
                )
            }

            Command::Chat { message } => {
                self.require_joined(conn)?;
                self.broadcast([Notice::Chat {
                    client: conn,
                    message,
                }])
            }

            Command::Roll { dice, sides } => {
                self.require_joined(conn)?;
                let max = self.table.config().max_roll_dice;
                if dice == 0 || sides == 0 || dice > max {
                    return Err(Failure::Refused {
                        reason: RejectReason::Invalid,
                        piece: PieceId::NONE,
                        cause: format!("cannot roll {dice}d{sides} (at most {max} dice)"),
                    });
                }
                let faces = (0..dice).map(|_| self.rng.random_range(1..=sides)).collect();
                tracing::debug!(%conn, dice, sides, "dice rolled");
                self.broadcast([Notice::Roll {
                    client: conn,
                    sides,
                    faces,
                }])
            }

            Command::ServerQuery | Command::ServerRegister { .. } | Command::ServerUpdate { .. } => {
                Err(Failure::Service(ServiceError::UnexpectedOpcode(opcode)))
            }
        }
    }

    /// JOIN: on success the newcomer is brought up to date, then everyone
    /// (newcomer included) hears about the join.
    fn join(&mut self, conn: ConnectionId, nick: String, color: Color) -> Result<Vec<Outgoing>, Failure> {
        match self.directory.join(conn, &nick, color) {
            Ok(_) => {}
            Err(DirectoryError::NicknameTaken(nick)) => {
                tracing::info!(%conn, %nick, "nickname taken");
                return Ok(vec![Outgoing::reliable(
                    Recipient::Peer(conn),
                    &Notice::NickTaken { nick },
                )?]);
            }
            Err(e) => return Err(e.into()),
        }

        let newcomer = Recipient::Peer(conn);
        let mut out = Vec::new();
        for client in self.directory.joined().filter(|client| client.id != conn) {
            out.push(Outgoing::reliable(
                newcomer.clone(),
                &Notice::Join {
                    client: client.id,
                    nick: client.nick.clone(),
                    color: client.color,
                },
            )?);
        }
        for piece in self.table.pieces() {
            out.push(Outgoing::reliable(newcomer.clone(), &Notice::Create(piece.snapshot()))?);
            if let Some(holder) = piece.selected_by() {
                out.push(Outgoing::reliable(
                    newcomer.clone(),
                    &Notice::Select {
                        piece: piece.id(),
                        client: Some(holder),
                    },
                )?);
            }
            if let Some(owner) = piece.owned_by() {
                out.push(Outgoing::reliable(
                    newcomer.clone(),
                    &Notice::Own {
                        piece: piece.id(),
                        owner: Some(owner),
                    },
                )?);
            }
        }
        out.extend(self.broadcast([Notice::Join {
            client: conn,
            nick,
            color,
        }])?);

        self.publish_players();
        Ok(out)
    }
}

impl Service for TableService {
    fn on_connect(&mut self, conn: ConnectionId, peer: SocketAddr) -> Vec<Outgoing> {
        if let Err(e) = self.directory.connect(conn) {
            tracing::warn!(%conn, %peer, error = %e, "duplicate connect ignored");
        }
        Vec::new()
    }

    fn on_packet(
        &mut self,
        conn: ConnectionId,
        _peer: SocketAddr,
        data: &[u8],
    ) -> Result<Vec<Outgoing>, ServiceError> {
        let command = Command::decode(data)?;
        let opcode = command.opcode();

        match self.apply(conn, command) {
            Ok(out) => Ok(out),
            Err(Failure::Refused {
                reason,
                piece,
                cause,
            }) => {
                tracing::warn!(%conn, %opcode, %reason, error = %cause, "request rejected");
                Ok(vec![Outgoing::reliable(
                    Recipient::Peer(conn),
                    &Notice::Reject {
                        opcode,
                        reason,
                        piece,
                    },
                )?])
            }
            Err(Failure::Service(e)) => Err(e),
        }
    }

    fn on_disconnect(&mut self, conn: ConnectionId) -> Vec<Outgoing> {
        // Claims and the directory entry go in the same step, so no later
        // command can see a piece held by a departed client.
        let released = self.table.release_client(conn);
        let was_joined = match self.directory.disconnect(conn) {
            Ok(client) => client.joined,
            Err(e) => {
                tracing::debug!(%conn, error = %e, "disconnect for unknown client");
                false
            }
        };

        let everyone = self.joined();
        let mut out = Vec::new();
        for piece in released.deselected {
            push_notice(&mut out, everyone.clone(), &Notice::Select { piece, client: None });
        }
        for piece in released.disowned {
            push_notice(&mut out, everyone.clone(), &Notice::Own { piece, owner: None });
        }
        if was_joined {
            push_notice(&mut out, everyone, &Notice::Leave { client: conn });
            self.publish_players();
        }
        out
    }

    fn on_frame(&mut self, dt: f32) -> Vec<Outgoing> {
        self.table.animate(dt);
        Vec::new()
    }

    fn is_animating(&self) -> bool {
        self.table.is_animating()
    }
}
