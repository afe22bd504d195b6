//! The opcode space: the leading byte of every packet.

use std::fmt;

use crate::ProtocolError;

/// Every opcode either side may send.
///
/// The byte values are fixed by the wire format. Discovery opcodes live in
/// `0xC0..`, table opcodes in `0x20..=0x27`, connection control below
/// `0x20`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Handshake = 0x01,
    NickTaken = 0x02,
    Join = 0x03,
    Leave = 0x04,
    Reject = 0x05,

    Create = 0x20,
    Select = 0x21,
    Remove = 0x22,
    Move = 0x23,
    Flip = 0x24,
    Own = 0x25,
    Shuffle = 0x26,
    Rotate = 0x27,

    Chat = 0x40,
    Roll = 0x42,

    ServerQuery = 0xC0,
    ServerRegister = 0xC1,
    ServerUpdate = 0xC2,
}

impl Opcode {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// HANDSHAKE and the three registry opcodes.
    pub fn is_discovery(self) -> bool {
        matches!(
            self,
            Self::Handshake
                | Self::ServerQuery
                | Self::ServerRegister
                | Self::ServerUpdate
        )
    }

    /// Opcodes that mutate or address pieces on the table.
    pub fn is_table(self) -> bool {
        (0x20..=0x27).contains(&self.as_u8())
    }
}

impl TryFrom<u8> for Opcode {
    type Error = ProtocolError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Ok(match byte {
            0x01 => Self::Handshake,
            0x02 => Self::NickTaken,
            0x03 => Self::Join,
            0x04 => Self::Leave,
            0x05 => Self::Reject,
            0x20 => Self::Create,
            0x21 => Self::Select,
            0x22 => Self::Remove,
            0x23 => Self::Move,
            0x24 => Self::Flip,
            0x25 => Self::Own,
            0x26 => Self::Shuffle,
            0x27 => Self::Rotate,
            0x40 => Self::Chat,
            0x42 => Self::Roll,
            0xC0 => Self::ServerQuery,
            0xC1 => Self::ServerRegister,
            0xC2 => Self::ServerUpdate,
            other => return Err(ProtocolError::UnknownOpcode(other)),
        })
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Handshake => "HANDSHAKE",
            Self::NickTaken => "NICK_TAKEN",
            Self::Join => "JOIN",
            Self::Leave => "LEAVE",
            Self::Reject => "REJECT",
            Self::Create => "CREATE",
            Self::Select => "SELECT",
            Self::Remove => "REMOVE",
            Self::Move => "MOVE",
            Self::Flip => "FLIP",
            Self::Own => "OWN",
            Self::Shuffle => "SHUFFLE",
            Self::Rotate => "ROTATE",
            Self::Chat => "CHAT",
            Self::Roll => "ROLL",
            Self::ServerQuery => "SERVER_QUERY",
            Self::ServerRegister => "SERVER_REGISTER",
            Self::ServerUpdate => "SERVER_UPDATE",
        };
        f.write_str(name)
    }
}
