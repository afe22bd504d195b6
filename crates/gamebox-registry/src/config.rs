//! Registry configuration.

use serde::{Deserialize, Serialize};

/// A server listed in configuration rather than announced over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticServer {
    pub address: String,
    pub port: u16,
    pub name: String,
    #[serde(default)]
    pub players: u16,
}

/// Configuration for a [`ServerRegistry`](crate::ServerRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Seconds without REGISTER/UPDATE before an announced record is
    /// dropped. 0 disables expiry.
    pub record_ttl_secs: u64,

    /// Upper bound on the number of records, seeds included.
    pub max_records: usize,

    /// Servers preloaded at startup. They have no origin connection and
    /// never expire.
    pub servers: Vec<StaticServer>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            record_ttl_secs: 0,
            max_records: 1024,
            servers: Vec::new(),
        }
    }
}
