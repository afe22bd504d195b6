//! The per-connection client record.

use gamebox_protocol::{Color, ConnectionId};

/// Longest nickname accepted, in bytes.
pub const MAX_NICKNAME_LEN: usize = 32;

/// A participant at the table.
///
/// A client exists from connection accept until disconnect. It starts
/// unjoined (no nickname, invisible to others) and becomes joined once a
/// JOIN with a free nickname succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    pub id: ConnectionId,

    /// Empty until joined.
    pub nick: String,

    pub color: Color,

    pub joined: bool,
}

impl Client {
    pub(crate) fn new(id: ConnectionId) -> Self {
        Self {
            id,
            nick: String::new(),
            color: Color::default(),
            joined: false,
        }
    }
}
