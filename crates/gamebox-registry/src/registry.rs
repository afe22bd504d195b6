//! The server registry: every game server the discovery process knows.
//!
//! Records live in insertion order, which is also the order queries report
//! them in. The registry never talks to the network itself; the registry
//! service feeds it decoded commands and encodes what it returns.

use std::time::{Duration, Instant};

use gamebox_protocol::{ConnectionId, ServerEntry};

use crate::{RegistryConfig, RegistryError, StaticServer};

/// One known game server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerRecord {
    /// Taken from the transport peer, never from the payload.
    pub address: String,
    pub port: u16,
    pub name: String,
    pub players: u16,

    /// The connection that registered this record. `None` for seeds.
    pub origin: Option<ConnectionId>,

    /// Last REGISTER or UPDATE for this record.
    pub last_seen: Instant,
}

impl ServerRecord {
    /// The wire-facing part of the record.
    pub fn entry(&self) -> ServerEntry {
        ServerEntry {
            address: self.address.clone(),
            port: self.port,
            name: self.name.clone(),
            players: self.players,
        }
    }
}

/// Holds the set of known servers.
///
/// Like the rest of the state, a registry is owned by the session loop and
/// mutated from one task only, so it is a plain `Vec` with no locking.
pub struct ServerRegistry {
    records: Vec<ServerRecord>,
    config: RegistryConfig,
}

impl ServerRegistry {
    /// Creates a registry preloaded with `config.servers`.
    pub fn new(config: RegistryConfig) -> Self {
        let mut registry = Self {
            records: Vec::new(),
            config,
        };
        let seeds = registry.config.servers.clone();
        registry.seed(seeds);
        registry
    }

    /// Adds records that did not come from a connection.
    ///
    /// Seeds past `max_records` are dropped with a warning.
    pub fn seed(&mut self, servers: impl IntoIterator<Item = StaticServer>) {
        let now = Instant::now();
        for server in servers {
            if self.records.len() >= self.config.max_records {
                tracing::warn!(
                    name = %server.name,
                    limit = self.config.max_records,
                    "registry full, seed dropped"
                );
                continue;
            }
            tracing::info!(
                address = %server.address,
                port = server.port,
                name = %server.name,
                "seeded server"
            );
            self.records.push(ServerRecord {
                address: server.address,
                port: server.port,
                name: server.name,
                players: server.players,
                origin: None,
                last_seen: now,
            });
        }
    }

    /// Lists every known server in insertion order.
    pub fn query(&self) -> Vec<ServerEntry> {
        let entries: Vec<_> =
            self.records.iter().map(ServerRecord::entry).collect();
        tracing::info!(servers = entries.len(), "server list queried");
        entries
    }

    /// Appends a record announced by `origin`.
    ///
    /// A connection that registers twice gets two records; updates only
    /// ever touch the first.
    ///
    /// # Errors
    /// [`RegistryError::Full`] if the registry is at `max_records`.
    pub fn register(
        &mut self,
        address: String,
        port: u16,
        name: String,
        players: u16,
        origin: ConnectionId,
    ) -> Result<&ServerRecord, RegistryError> {
        if self.records.len() >= self.config.max_records {
            return Err(RegistryError::Full {
                limit: self.config.max_records,
            });
        }

        tracing::info!(%origin, %address, port, %name, players, "server registered");
        self.records.push(ServerRecord {
            address,
            port,
            name,
            players,
            origin: Some(origin),
            last_seen: Instant::now(),
        });

        // Non-empty: pushed on the line above.
        Ok(&self.records[self.records.len() - 1])
    }

    /// Refreshes the name and player count of the first record `origin`
    /// registered.
    ///
    /// Returns `false`, and changes nothing, if `origin` registered
    /// nothing.
    pub fn update(
        &mut self,
        origin: ConnectionId,
        name: String,
        players: u16,
    ) -> bool {
        let Some(record) = self
            .records
            .iter_mut()
            .find(|record| record.origin == Some(origin))
        else {
            tracing::debug!(%origin, "update from unregistered connection ignored");
            return false;
        };

        tracing::info!(%origin, %name, players, "server updated");
        record.name = name;
        record.players = players;
        record.last_seen = Instant::now();
        true
    }

    /// Drops announced records not refreshed within `record_ttl_secs` of
    /// `now`. Seeds are kept. Returns the removed records.
    pub fn expire_stale(&mut self, now: Instant) -> Vec<ServerRecord> {
        if self.config.record_ttl_secs == 0 {
            return Vec::new();
        }
        let ttl = Duration::from_secs(self.config.record_ttl_secs);

        let (expired, kept): (Vec<_>, Vec<_>) =
            self.records.drain(..).partition(|record| {
                record.origin.is_some()
                    && now.saturating_duration_since(record.last_seen) > ttl
            });
        self.records = kept;

        for record in &expired {
            tracing::info!(
                address = %record.address,
                port = record.port,
                name = %record.name,
                "server record expired"
            );
        }
        expired
    }

    /// Returns every record, in insertion order.
    pub fn records(&self) -> &[ServerRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for ServerRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

// =========================================================================
// Tests
// =========================================================================
