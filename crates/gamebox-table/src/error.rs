//! Error types for the table layer.

use gamebox_protocol::{ConnectionId, PieceId, RejectReason};

/// Why a table operation was refused.
///
/// A refused operation changes nothing. Every variant maps to a wire
/// [`RejectReason`] sent back to the requester only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    /// No piece with this id is on the table.
    #[error("{0} not found")]
    NotFound(PieceId),

    /// The requester lacks the selection or ownership the operation needs.
    #[error("not allowed on {piece}: {reason}")]
    Unauthorized {
        piece: PieceId,
        reason: &'static str,
    },

    /// Another client holds the selection.
    #[error("{piece} is selected by {holder}")]
    AlreadySelected { piece: PieceId, holder: ConnectionId },

    /// Another client owns the piece.
    #[error("{piece} is owned by {owner}")]
    AlreadyOwned { piece: PieceId, owner: ConnectionId },

    /// A parameter was out of range (a non-finite target, a one-piece
    /// shuffle, ...).
    #[error("invalid request on {piece}: {reason}")]
    Invalid {
        piece: PieceId,
        reason: &'static str,
    },

    /// Every piece id is in use.
    #[error("table is full")]
    TableFull,

    /// The requester has not joined the table.
    #[error("client has not joined")]
    NotJoined,
}

impl TableError {
    /// The wire reason reported to the requester.
    pub fn reject_reason(&self) -> RejectReason {
        match self {
            Self::NotFound(_) => RejectReason::NotFound,
            Self::Unauthorized { .. }
            | Self::AlreadySelected { .. }
            | Self::AlreadyOwned { .. }
            | Self::NotJoined => RejectReason::Unauthorized,
            Self::Invalid { .. } | Self::TableFull => RejectReason::Invalid,
        }
    }

    /// The piece the refusal concerns, or [`PieceId::NONE`].
    pub fn piece(&self) -> PieceId {
        match self {
            Self::NotFound(piece)
            | Self::Unauthorized { piece, .. }
            | Self::AlreadySelected { piece, .. }
            | Self::AlreadyOwned { piece, .. }
            | Self::Invalid { piece, .. } => *piece,
            Self::TableFull | Self::NotJoined => PieceId::NONE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reject_reason_maps_holder_conflicts_to_unauthorized() {
        let holder = ConnectionId::new(1);
        assert_eq!(
            TableError::AlreadySelected { piece: PieceId(7), holder }.reject_reason(),
            RejectReason::Unauthorized
        );
        assert_eq!(
            TableError::AlreadyOwned { piece: PieceId(7), owner: holder }.reject_reason(),
            RejectReason::Unauthorized
        );
        assert_eq!(TableError::NotJoined.reject_reason(), RejectReason::Unauthorized);
        assert_eq!(
            TableError::NotFound(PieceId(3)).reject_reason(),
            RejectReason::NotFound
        );
        assert_eq!(TableError::TableFull.reject_reason(), RejectReason::Invalid);
    }

    #[test]
    fn test_piece_defaults_to_none_for_table_wide_errors() {
        assert_eq!(TableError::TableFull.piece(), PieceId::NONE);
        assert_eq!(TableError::NotFound(PieceId(9)).piece(), PieceId(9));
    }
}
