//! The client directory: who is connected, and who has joined.
//!
//! # Concurrency note
//!
//! `ClientDirectory` is NOT thread-safe by itself. It is owned by the
//! session loop and only ever touched from that one task, which is also
//! what makes a disconnect atomic: the directory entry and the client's
//! table claims are dropped while handling one event.

use std::collections::BTreeMap;

use gamebox_protocol::{Color, ConnectionId};

use crate::{Client, DirectoryError, MAX_NICKNAME_LEN};

/// Maps connection ids to clients.
///
/// ## Lifecycle
///
/// ```text
/// connect() ──→ [unjoined] ──join()──→ [joined] ──→ disconnect()
///                   │                                    ↑
///                   └────────────────────────────────────┘
/// ```
#[derive(Debug, Default)]
pub struct ClientDirectory {
    /// Ordered by id. The transport hands out ids in accept order, so
    /// this is also connection order.
    clients: BTreeMap<ConnectionId, Client>,
}

impl ClientDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a newly accepted connection as an unjoined client.
    ///
    /// # Errors
    /// [`DirectoryError::AlreadyConnected`] if `id` is already known.
    pub fn connect(&mut self, id: ConnectionId) -> Result<&Client, DirectoryError> {
        if self.clients.contains_key(&id) {
            return Err(DirectoryError::AlreadyConnected(id));
        }
        tracing::debug!(%id, "client connected");
        Ok(&*self.clients.entry(id).or_insert_with(|| Client::new(id)))
    }

    /// Promotes an unjoined client to joined.
    ///
    /// Only joined clients are compared against, so a half-open
    /// connection never blocks a nickname.
    ///
    /// # Errors
    /// - [`DirectoryError::NotFound`] if `id` never connected.
    /// - [`DirectoryError::AlreadyJoined`] if it already joined.
    /// - [`DirectoryError::InvalidNickname`] for a blank or over-long
    ///   nickname.
    /// - [`DirectoryError::NicknameTaken`] if a joined client uses it.
    pub fn join(
        &mut self,
        id: ConnectionId,
        nick: &str,
        color: Color,
    ) -> Result<&Client, DirectoryError> {
        match self.clients.get(&id) {
            None => return Err(DirectoryError::NotFound(id)),
            Some(client) if client.joined => {
                return Err(DirectoryError::AlreadyJoined(id));
            }
            Some(_) => {}
        }

        if nick.trim().is_empty() || nick.len() > MAX_NICKNAME_LEN {
            return Err(DirectoryError::InvalidNickname);
        }

        if self.joined().any(|other| other.nick == nick) {
            return Err(DirectoryError::NicknameTaken(nick.to_owned()));
        }

        let client = self
            .clients
            .get_mut(&id)
            .ok_or(DirectoryError::NotFound(id))?;
        client.nick = nick.to_owned();
        client.color = color;
        client.joined = true;

        tracing::info!(%id, nick, %color, "client joined");
        Ok(&*client)
    }

    /// Forgets a client. Returns its last record so the caller can tell
    /// whether a LEAVE is owed (only joined clients were ever announced).
    ///
    /// # Errors
    /// [`DirectoryError::NotFound`] if `id` is unknown.
    pub fn disconnect(&mut self, id: ConnectionId) -> Result<Client, DirectoryError> {
        let client = self
            .clients
            .remove(&id)
            .ok_or(DirectoryError::NotFound(id))?;
        if client.joined {
            tracing::info!(%id, nick = %client.nick, "client left");
        } else {
            tracing::debug!(%id, "unjoined client disconnected");
        }
        Ok(client)
    }

    pub fn get(&self, id: ConnectionId) -> Option<&Client> {
        self.clients.get(&id)
    }

    /// Returns `true` if `id` is connected and joined.
    pub fn is_joined(&self, id: ConnectionId) -> bool {
        self.clients.get(&id).is_some_and(|client| client.joined)
    }

    /// Joined clients in connection order.
    pub fn joined(&self) -> impl Iterator<Item = &Client> {
        self.clients.values().filter(|client| client.joined)
    }

    /// Ids of every joined client, for broadcast fan-out.
    pub fn joined_ids(&self) -> Vec<ConnectionId> {
        self.joined().map(|client| client.id).collect()
    }

    pub fn joined_count(&self) -> usize {
        self.joined().count()
    }

    /// Number of connected clients, joined or not.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for `ClientDirectory`, named
    //! `test_{function}_{scenario}_{expected}`.

    use super::*;

    // -- Helpers ----------------------------------------------------------

    fn cid(id: u32) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn red() -> Color {
        Color::rgba(255, 0, 0, 255)
    }

    /// A directory with the given ids connected (unjoined).
    fn directory_with(ids: &[u32]) -> ClientDirectory {
        let mut dir = ClientDirectory::new();
        for &id in ids {
            dir.connect(cid(id)).unwrap();
        }
        dir
    }

    // =====================================================================
    // connect()
    // =====================================================================

    #[test]
    fn test_connect_new_id_creates_unjoined_client() {
        let mut dir = ClientDirectory::new();

        let client = dir.connect(cid(1)).unwrap();

        assert_eq!(client.id, cid(1));
        assert!(!client.joined);
        assert!(client.nick.is_empty());
        assert_eq!(dir.joined_count(), 0);
    }

    #[test]
    fn test_connect_duplicate_id_returns_error() {
        let mut dir = directory_with(&[1]);
        assert_eq!(
            dir.connect(cid(1)).unwrap_err(),
            DirectoryError::AlreadyConnected(cid(1))
        );
    }

    // =====================================================================
    // join()
    // =====================================================================

    #[test]
    fn test_join_free_nickname_marks_joined() {
        let mut dir = directory_with(&[1]);

        let client = dir.join(cid(1), "alice", red()).unwrap();

        assert!(client.joined);
        assert_eq!(client.nick, "alice");
        assert_eq!(client.color, red());
        assert!(dir.is_joined(cid(1)));
    }

    #[test]
    fn test_join_taken_nickname_returns_error_and_stays_unjoined() {
        let mut dir = directory_with(&[1, 2]);
        dir.join(cid(1), "alice", red()).unwrap();

        let result = dir.join(cid(2), "alice", red());

        assert_eq!(
            result.unwrap_err(),
            DirectoryError::NicknameTaken("alice".into())
        );
        assert!(!dir.is_joined(cid(2)));
        assert_eq!(dir.len(), 2);
    }

    #[test]
    fn test_join_nickname_match_is_case_sensitive() {
        let mut dir = directory_with(&[1, 2]);
        dir.join(cid(1), "alice", red()).unwrap();
        assert!(dir.join(cid(2), "Alice", red()).is_ok());
    }

    #[test]
    fn test_join_unjoined_client_never_blocks_nickname() {
        let mut dir = directory_with(&[1, 2]);
        // Client 1 tried "alice" and lost; client 2 then takes it.
        dir.join(cid(2), "alice", red()).unwrap();
        assert!(dir.join(cid(1), "alice", red()).is_err());

        // After 2 leaves, 1 may have it.
        dir.disconnect(cid(2)).unwrap();
        assert!(dir.join(cid(1), "alice", red()).is_ok());
    }

    #[test]
    fn test_join_blank_or_long_nickname_is_invalid() {
        let mut dir = directory_with(&[1]);
        let long = "n".repeat(MAX_NICKNAME_LEN + 1);
        for nick in ["", "   ", long.as_str()] {
            assert_eq!(
                dir.join(cid(1), nick, red()).unwrap_err(),
                DirectoryError::InvalidNickname
            );
        }
        assert!(dir.join(cid(1), &"n".repeat(MAX_NICKNAME_LEN), red()).is_ok());
    }

    #[test]
    fn test_join_twice_returns_already_joined() {
        let mut dir = directory_with(&[1]);
        dir.join(cid(1), "alice", red()).unwrap();
        assert_eq!(
            dir.join(cid(1), "alice2", red()).unwrap_err(),
            DirectoryError::AlreadyJoined(cid(1))
        );
        assert_eq!(dir.get(cid(1)).unwrap().nick, "alice");
    }

    #[test]
    fn test_join_unknown_connection_returns_not_found() {
        let mut dir = ClientDirectory::new();
        assert_eq!(
            dir.join(cid(9), "ghost", red()).unwrap_err(),
            DirectoryError::NotFound(cid(9))
        );
    }

    // =====================================================================
    // disconnect() / joined()
    // =====================================================================

    #[test]
    fn test_disconnect_returns_record_and_removes_client() {
        let mut dir = directory_with(&[1]);
        dir.join(cid(1), "alice", red()).unwrap();

        let gone = dir.disconnect(cid(1)).unwrap();

        assert!(gone.joined);
        assert!(dir.get(cid(1)).is_none());
        assert_eq!(
            dir.disconnect(cid(1)).unwrap_err(),
            DirectoryError::NotFound(cid(1))
        );
    }

    #[test]
    fn test_joined_ids_lists_only_joined_in_connection_order() {
        let mut dir = directory_with(&[3, 1, 2]);
        dir.join(cid(3), "c", red()).unwrap();
        dir.join(cid(1), "a", red()).unwrap();

        assert_eq!(dir.joined_ids(), vec![cid(1), cid(3)]);
    }

    #[test]
    fn test_joined_nicknames_stay_unique_under_contention() {
        let mut dir = directory_with(&(1..=20).collect::<Vec<_>>());
        for id in 1..=20 {
            let nick = format!("player{}", id % 5);
            let _ = dir.join(cid(id), &nick, red());
        }

        let mut nicks: Vec<_> =
            dir.joined().map(|client| client.nick.clone()).collect();
        let total = nicks.len();
        nicks.sort();
        nicks.dedup();
        assert_eq!(nicks.len(), total);
        assert_eq!(total, 5);
    }
}
