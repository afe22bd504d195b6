//! Client → server packets.

use crate::{
    Color, FlipMode, Opcode, PacketReader, PacketWriter, PieceId,
    ProtocolError, Vec2,
};

/// A request sent by a client (or by a game server, to the registry).
///
/// Each variant is one opcode with its payload already decoded. Decoding
/// is all-or-nothing: [`Command::decode`] either returns a complete value
/// or an error, so callers never see half a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// First packet on a connection. Empty payload.
    Handshake,

    /// Join the table under a nickname.
    Join { nick: String, color: Color },

    /// Put a new piece on the table.
    Create {
        class_id: String,
        object_id: String,
        location: Vec2,
    },

    /// Take (`select = true`) or release the selection of a piece.
    Select { piece: PieceId, select: bool },

    Remove { piece: PieceId },

    /// Move a piece to `target` over `duration` seconds (0 = instant).
    Move {
        piece: PieceId,
        target: Vec2,
        duration: f32,
    },

    Flip { piece: PieceId, mode: FlipMode },

    /// Claim (`own = true`) or give up ownership of a piece.
    Own { piece: PieceId, own: bool },

    /// Randomly permute the locations of the listed pieces.
    Shuffle { pieces: Vec<PieceId> },

    /// Rotate a piece and everything on it by `step` degrees.
    Rotate { piece: PieceId, step: u16 },

    Chat { message: String },

    /// Roll `dice` dice with `sides` faces each.
    Roll { dice: u8, sides: u8 },

    /// Ask the registry for its server list. Empty payload.
    ServerQuery,

    /// Announce a game server. The address comes from the connection.
    ServerRegister {
        port: u16,
        name: String,
        players: u16,
    },

    /// Refresh the record this connection registered.
    ServerUpdate { name: String, players: u16 },
}

impl Command {
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Handshake => Opcode::Handshake,
            Self::Join { .. } => Opcode::Join,
            Self::Create { .. } => Opcode::Create,
            Self::Select { .. } => Opcode::Select,
            Self::Remove { .. } => Opcode::Remove,
            Self::Move { .. } => Opcode::Move,
            Self::Flip { .. } => Opcode::Flip,
            Self::Own { .. } => Opcode::Own,
            Self::Shuffle { .. } => Opcode::Shuffle,
            Self::Rotate { .. } => Opcode::Rotate,
            Self::Chat { .. } => Opcode::Chat,
            Self::Roll { .. } => Opcode::Roll,
            Self::ServerQuery => Opcode::ServerQuery,
            Self::ServerRegister { .. } => Opcode::ServerRegister,
            Self::ServerUpdate { .. } => Opcode::ServerUpdate,
        }
    }

    /// Decodes one whole packet.
    ///
    /// # Errors
    /// - [`ProtocolError::Empty`] for a zero-length packet.
    /// - [`ProtocolError::UnknownOpcode`] for bytes no client may send,
    ///   including server-only opcodes such as NICK_TAKEN.
    /// - A decode error if the payload is short, malformed, or has
    ///   trailing bytes.
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        let mut r = PacketReader::new(data);
        let opcode = r.read_opcode()?;

        let command = match opcode {
            Opcode::Handshake => Self::Handshake,
            Opcode::Join => Self::Join {
                nick: r.read_str()?,
                color: Color(r.read_u32()?),
            },
            Opcode::Create => Self::Create {
                class_id: r.read_str()?,
                object_id: r.read_str()?,
                location: r.read_vec2()?,
            },
            Opcode::Select => Self::Select {
                piece: r.read_piece()?,
                select: r.read_bool()?,
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
                mode: FlipMode::try_from(r.read_u8()?)?,
            },
            Opcode::Own => Self::Own {
                piece: r.read_piece()?,
                own: r.read_bool()?,
            },
            Opcode::Shuffle => {
                let count = r.read_u16()?;
                let pieces = (0..count)
                    .map(|_| r.read_piece())
                    .collect::<Result<Vec<_>, _>>()?;
                Self::Shuffle { pieces }
            }
            Opcode::Rotate => Self::Rotate {
                piece: r.read_piece()?,
                step: r.read_u16()?,
            },
            Opcode::Chat => Self::Chat {
                message: r.read_str()?,
            },
            Opcode::Roll => Self::Roll {
                dice: r.read_u8()?,
                sides: r.read_u8()?,
            },
            Opcode::ServerQuery => Self::ServerQuery,
            Opcode::ServerRegister => Self::ServerRegister {
                port: r.read_u16()?,
                name: r.read_str()?,
                players: r.read_u16()?,
            },
            Opcode::ServerUpdate => Self::ServerUpdate {
                name: r.read_str()?,
                players: r.read_u16()?,
            },
            Opcode::NickTaken | Opcode::Leave | Opcode::Reject => {
                return Err(ProtocolError::UnknownOpcode(opcode.as_u8()));
            }
        };

        r.finish()?;
        Ok(command)
    }

    /// Encodes this command as one packet.
    ///
    /// # Errors
    /// [`ProtocolError::EncodingLimitExceeded`] if a string or list is too
    /// long. No bytes are returned in that case.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut w = PacketWriter::with_opcode(self.opcode());

        match self {
            Self::Handshake | Self::ServerQuery => {}
            Self::Join { nick, color } => {
                w.write_str(nick)?;
                w.write_u32(color.0);
            }
            Self::Create {
                class_id,
                object_id,
                location,
            } => {
                w.write_str(class_id)?;
                w.write_str(object_id)?;
                w.write_vec2(*location);
            }
            Self::Select { piece, select } => {
                w.write_piece(*piece);
                w.write_bool(*select);
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
            Self::Flip { piece, mode } => {
                w.write_piece(*piece);
                w.write_u8(mode.as_u8());
            }
            Self::Own { piece, own } => {
                w.write_piece(*piece);
                w.write_bool(*own);
            }
            Self::Shuffle { pieces } => {
                w.write_count(pieces.len())?;
                for piece in pieces {
                    w.write_piece(*piece);
                }
            }
            Self::Rotate { piece, step } => {
                w.write_piece(*piece);
                w.write_u16(*step);
            }
            Self::Chat { message } => w.write_str(message)?,
            Self::Roll { dice, sides } => {
                w.write_u8(*dice);
                w.write_u8(*sides);
            }
            Self::ServerRegister {
                port,
                name,
                players,
            } => {
                w.write_u16(*port);
                w.write_str(name)?;
                w.write_u16(*players);
            }
            Self::ServerUpdate { name, players } => {
                w.write_str(name)?;
                w.write_u16(*players);
            }
        }

        Ok(w.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One of every command, with non-trivial payloads.
    fn samples() -> Vec<Command> {
        vec![
            Command::Handshake,
            Command::Join {
                nick: "alice".into(),
                color: Color::rgba(255, 0, 0, 255),
            },
            Command::Create {
                class_id: "cards/ace".into(),
                object_id: "deck-1/ace-of-spades".into(),
                location: Vec2::new(-4.5, 12.0),
            },
            Command::Select {
                piece: PieceId(7),
                select: true,
            },
            Command::Remove { piece: PieceId(1) },
            Command::Move {
                piece: PieceId(u16::MAX),
                target: Vec2::new(10.0, 5.0),
                duration: 0.25,
            },
            Command::Flip {
                piece: PieceId(3),
                mode: FlipMode::Toggle,
            },
            Command::Own {
                piece: PieceId(3),
                own: false,
            },
            Command::Shuffle {
                pieces: vec![PieceId(1), PieceId(2), PieceId(3)],
            },
            Command::Rotate {
                piece: PieceId(9),
                step: 90,
            },
            Command::Chat {
                message: "gg".into(),
            },
            Command::Roll { dice: 3, sides: 6 },
            Command::ServerQuery,
            Command::ServerRegister {
                port: 13355,
                name: "Test".into(),
                players: 0,
            },
            Command::ServerUpdate {
                name: "Test".into(),
                players: 4,
            },
        ]
    }

    #[test]
    fn test_command_round_trip_every_opcode() {
        for command in samples() {
            let bytes = command.encode().unwrap();
            assert_eq!(bytes[0], command.opcode().as_u8());
            assert_eq!(Command::decode(&bytes).unwrap(), command);
        }
    }

    #[test]
    fn test_command_decode_truncated_by_one_fails() {
        for command in samples() {
            let bytes = command.encode().unwrap();
            if bytes.len() < 2 {
                continue;
            }
            let short = &bytes[..bytes.len() - 1];
            let err = Command::decode(short).unwrap_err();
            assert!(err.is_decode_error(), "{command:?}: {err}");
        }
    }

    #[test]
    fn test_command_decode_every_prefix_fails() {
        for command in samples() {
            let bytes = command.encode().unwrap();
            for cut in 1..bytes.len() {
                assert!(Command::decode(&bytes[..cut]).is_err(), "{command:?} cut at {cut}");
            }
        }
    }

    #[test]
    fn test_command_decode_trailing_byte_fails() {
        let mut bytes = Command::Remove { piece: PieceId(4) }.encode().unwrap();
        bytes.push(0);
        assert_eq!(
            Command::decode(&bytes),
            Err(ProtocolError::TrailingBytes(1))
        );
    }

    #[test]
    fn test_command_decode_empty_packet_fails() {
        assert_eq!(Command::decode(&[]), Err(ProtocolError::Empty));
    }

    #[test]
    fn test_command_decode_unknown_opcode_names_byte() {
        assert_eq!(
            Command::decode(&[0x7f, 1, 2]),
            Err(ProtocolError::UnknownOpcode(0x7f))
        );
    }

    #[test]
    fn test_command_decode_server_only_opcode_is_unknown() {
        assert_eq!(
            Command::decode(&[Opcode::NickTaken.as_u8(), 0, 0]),
            Err(ProtocolError::UnknownOpcode(0x02))
        );
    }

    #[test]
    fn test_command_server_register_layout() {
        let bytes = Command::ServerRegister {
            port: 13355,
            name: "Test".into(),
            players: 0,
        }
        .encode()
        .unwrap();
        assert_eq!(
            bytes,
            vec![0xC1, 0x2B, 0x34, 4, 0, b'T', b'e', b's', b't', 0, 0]
        );
    }

    #[test]
    fn test_command_flip_invalid_mode_fails() {
        assert!(matches!(
            Command::decode(&[Opcode::Flip.as_u8(), 1, 0, 9]),
            Err(ProtocolError::InvalidValue { field: "flip mode", value: 9 })
        ));
    }

    #[test]
    fn test_command_encode_oversized_chat_fails() {
        let command = Command::Chat {
            message: "x".repeat(70_000),
        };
        assert_eq!(
            command.encode(),
            Err(ProtocolError::EncodingLimitExceeded(70_000))
        );
    }
}
