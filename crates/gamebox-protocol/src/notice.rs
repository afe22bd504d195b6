//! Server → client packets.

use gamebox_transport::ConnectionId;

use crate::{
    Color, Opcode, PacketReader, PacketWriter, PieceId, PieceSnapshot,
    ProtocolError, RejectReason, ServerEntry, Vec2,
};

/// Something a server tells its clients.
///
/// Most notices are broadcasts that mirror a [`Command`](crate::Command)
/// after the server applied it; [`Notice::Reject`] and
/// [`Notice::NickTaken`] go to the requester only.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// Reply to HANDSHAKE: the id the server knows this connection by.
    Handshake { client: ConnectionId },

    /// A JOIN was refused because the nickname is in use.
    NickTaken { nick: String },

    Join {
        client: ConnectionId,
        nick: String,
        color: Color,
    },

    Leave { client: ConnectionId },

    /// A request was refused. `piece` is [`PieceId::NONE`] when the request
    /// was not about a piece.
    Reject {
        opcode: Opcode,
        reason: RejectReason,
        piece: PieceId,
    },

    /// The registry's server list, also sent in reply to HANDSHAKE.
    ServerList { servers: Vec<ServerEntry> },

    Create(PieceSnapshot),

    /// `client` now holds the selection, or nobody does.
    Select {
        piece: PieceId,
        client: Option<ConnectionId>,
    },

    Remove { piece: PieceId },

    Move {
        piece: PieceId,
        target: Vec2,
        duration: f32,
    },

    Flip { piece: PieceId, flipped: bool },

    Own {
        piece: PieceId,
        owner: Option<ConnectionId>,
    },

    /// New resting location of every shuffled piece, bottom to top.
    Shuffle { placements: Vec<(PieceId, Vec2)> },

    /// Absolute rotation in degrees after the change.
    Rotate { piece: PieceId, rotation: u16 },

    Chat {
        client: ConnectionId,
        message: String,
    },

    Roll {
        client: ConnectionId,
        sides: u8,
        faces: Vec<u8>,
    },
}

impl Notice {
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Handshake { .. } => Opcode::Handshake,
            Self::NickTaken { .. } => Opcode::NickTaken,
            Self::Join { .. } => Opcode::Join,
            Self::Leave { .. } => Opcode::Leave,
            Self::Reject { .. } => Opcode::Reject,
            Self::ServerList { .. } => Opcode::ServerQuery,
            Self::Create(_) => Opcode::Create,
            Self::Select { .. } => Opcode::Select,
            Self::Remove { .. } => Opcode::Remove,
            Self::Move { .. } => Opcode::Move,
            Self::Flip { .. } => Opcode::Flip,
            Self::Own { .. } => Opcode::Own,
            Self::Shuffle { .. } => Opcode::Shuffle,
            Self::Rotate { .. } => Opcode::Rotate,
            Self::Chat { .. } => Opcode::Chat,
            Self::Roll { .. } => Opcode::Roll,
        }
    }

    /// Encodes this notice as one packet.
    ///
    /// # Errors
    /// [`ProtocolError::EncodingLimitExceeded`] if a string or list is too
    /// long.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut w = PacketWriter::with_opcode(self.opcode());

        match self {
            Self::Handshake { client } | Self::Leave { client } => {
                w.write_client(*client);
            }
            Self::NickTaken { nick } => w.write_str(nick)?,
            Self::Join {
                client,
                nick,
                color,
            } => {
                w.write_client(*client);
                w.write_str(nick)?;
                w.write_u32(color.0);
            }
            Self::Reject {
                opcode,
                reason,
                piece,
            } => {
                w.write_u8(opcode.as_u8());
                w.write_u8(reason.as_u8());
                w.write_piece(*piece);
            }
            Self::ServerList { servers } => {
                // No count prefix: entries run to the end of the packet.
                for entry in servers {
                    w.write_str(&entry.address)?;
                    w.write_u16(entry.port);
                    w.write_str(&entry.name)?;
                    w.write_u16(entry.players);
                }
            }
            Self::Create(snapshot) => {
                w.write_piece(snapshot.piece);
                w.write_str(&snapshot.class_id)?;
                w.write_str(&snapshot.object_id)?;
                w.write_vec2(snapshot.location);
                w.write_vec2(snapshot.size);
                w.write_bool(snapshot.flipped);
                w.write_u16(snapshot.rotation);
            }
            Self::Select { piece, client } => {
                w.write_piece(*piece);
                w.write_opt_client(*client);
            }
            Self::Remove { piece } => w.write_piece(*piece),
            Self::Move {
                piece,
                target,
                duration,
            } => {
                w.write_piece(*piece);
                w.write_vec2(*target);
                w.write_f32(*duration);
            }
            Self::Flip { piece, flipped } => {
                w.write_piece(*piece);
                w.write_bool(*flipped);
            }
            Self::Own { piece, owner } => {
                w.write_piece(*piece);
                w.write_opt_client(*owner);
            }
            Self::Shuffle { placements } => {
                w.write_count(placements.len())?;
                for (piece, location) in placements {
                    w.write_piece(*piece);
                    w.write_vec2(*location);
                }
            }
            Self::Rotate { piece, rotation } => {
                w.write_piece(*piece);
                w.write_u16(*rotation);
            }
            Self::Chat { client, message } => {
                w.write_client(*client);
                w.write_str(message)?;
            }
            Self::Roll {
                client,
                sides,
                faces,
            } => {
                w.write_client(*client);
                w.write_u8(*sides);
                w.write_count(faces.len())?;
                for face in faces {
                    w.write_u8(*face);
                }
            }
        }

        Ok(w.into_bytes())
    }

    /// Decodes one whole packet.
    ///
    /// # Errors
    /// [`ProtocolError::UnknownOpcode`] for client-only opcodes
    /// (SERVER_REGISTER, SERVER_UPDATE), otherwise the same decode errors
    /// as [`Command::decode`](crate::Command::decode).
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        let mut r = PacketReader::new(data);
        let opcode = r.read_opcode()?;

        let notice = match opcode {
            Opcode::Handshake => Self::Handshake {
                client: r.read_client()?,
            },
            Opcode::NickTaken => Self::NickTaken { nick: r.read_str()? },
            Opcode::Join => Self::Join {
                client: r.read_client()?,
                nick: r.read_str()?,
                color: Color(r.read_u32()?),
            },
            Opcode::Leave => Self::Leave {
                client: r.read_client()?,
            },
            Opcode::Reject => Self::Reject {
                opcode: Opcode::try_from(r.read_u8()?)?,
                reason: RejectReason::try_from(r.read_u8()?)?,
                piece: r.read_piece()?,
            },
            Opcode::ServerQuery => {
                let mut servers = Vec::new();
                while !r.is_at_end() {
                    servers.push(ServerEntry {
                        address: r.read_str()?,
                        port: r.read_u16()?,
                        name: r.read_str()?,
                        players: r.read_u16()?,
                    });
                }
                Self::ServerList { servers }
            }
            Opcode::Create => Self::Create(PieceSnapshot {
                piece: r.read_piece()?,
                class_id: r.read_str()?,
                object_id: r.read_str()?,
                location: r.read_vec2()?,
                size: r.read_vec2()?,
                flipped: r.read_bool()?,
                rotation: r.read_u16()?,
            }),
            Opcode::Select => Self::Select {
                piece: r.read_piece()?,
                client: r.read_opt_client()?,
            },
            Opcode::Remove => Self::Remove {
                piece: r.read_piece()?,
            },
            Opcode::Move => Self::Move {
                piece: r.read_piece()?,
                target: r.read_vec2()?,
                duration: r.read_f32()?,
            },
            Opcode::Flip => Self::Flip {
                piece: r.read_piece()?,
                flipped: r.read_bool()?,
            },
            Opcode::Own => Self::Own {
                piece: r.read_piece()?,
                owner: r.read_opt_client()?,
            },
            Opcode::Shuffle => {
                let count = r.read_u16()?;
                let placements = (0..count)
                    .map(|_| Ok((r.read_piece()?, r.read_vec2()?)))
                    .collect::<Result<Vec<_>, ProtocolError>>()?;
                Self::Shuffle { placements }
            }
            Opcode::Rotate => Self::Rotate {
                piece: r.read_piece()?,
                rotation: r.read_u16()?,
            },
            Opcode::Chat => Self::Chat {
                client: r.read_client()?,
                message: r.read_str()?,
            },
            Opcode::Roll => {
                let client = r.read_client()?;
                let sides = r.read_u8()?;
                let count = usize::from(r.read_u16()?);
                let faces = r.read_bytes(count)?.to_vec();
                Self::Roll {
                    client,
                    sides,
                    faces,
                }
            }
            Opcode::ServerRegister | Opcode::ServerUpdate => {
                return Err(ProtocolError::UnknownOpcode(opcode.as_u8()));
            }
        };

        r.finish()?;
        Ok(notice)
    }
}
