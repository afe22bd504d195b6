//! Error types for the client directory.

use gamebox_protocol::ConnectionId;

/// Errors that can occur while tracking clients.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    /// Another joined client already uses this nickname (exact,
    /// case-sensitive match). The requester stays connected and unjoined.
    #[error("nickname {0:?} is already taken")]
    NicknameTaken(String),

    /// The nickname is empty, blank, or longer than
    /// [`MAX_NICKNAME_LEN`](crate::MAX_NICKNAME_LEN) bytes.
    #[error("invalid nickname")]
    InvalidNickname,

    /// No client is connected under this id.
    #[error("no client for connection {0}")]
    NotFound(ConnectionId),

    /// `connect` was called twice for the same id.
    #[error("connection {0} is already known")]
    AlreadyConnected(ConnectionId),

    /// A joined client sent JOIN again.
    #[error("connection {0} has already joined")]
    AlreadyJoined(ConnectionId),
}
