//! Configuration file loading.
//!
//! Both binaries read one TOML file (`gamebox.toml` unless `--config`
//! says otherwise). Every section and field has a default, so a missing
//! file or a partial one is fine:
//!
//! ```toml
//! [network]
//! port = 13355
//!
//! [logging]
//! level = "debug"
//!
//! [[registry.servers]]
//! address = "198.51.100.7"
//! port = 13355
//! name = "Friday night"
//! ```

use std::path::Path;

use gamebox_registry::RegistryConfig;
use gamebox_table::TableConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Default listen port for both the registry and table servers.
pub const DEFAULT_PORT: u16 = 13355;

/// The whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub network: NetworkConfig,
    pub logging: LoggingConfig,
    pub registry: RegistryConfig,
    pub table: TableConfig,
    pub announce: AnnounceConfig,
}

/// `[network]`: where and how to listen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub port: u16,
    pub bind_address: String,
    pub max_connections: usize,
    /// Longest the session loop waits for a transport event before
    /// looking at its timers again.
    pub poll_interval_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_address: "0.0.0.0".into(),
            max_connections: 256,
            poll_interval_ms: 50,
        }
    }
}

/// `[logging]`: the default filter and output format.
///
/// `RUST_LOG`, when set, wins over `level`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}

/// `[announce]`: how a table server advertises itself to a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnounceConfig {
    /// `ws://host:port` of the registry. Unset means "don't announce".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry_url: Option<String>,
    /// Display name in server lists.
    pub name: String,
    /// Seconds between SERVER_UPDATE heartbeats.
    pub heartbeat_secs: u64,
}

impl Default for AnnounceConfig {
    fn default() -> Self {
        Self {
            registry_url: None,
            name: "Gamebox table".into(),
            heartbeat_secs: 60,
        }
    }
}

impl Config {
    /// Reads and parses `path`.
    ///
    /// Returns `Ok(None)` if the file does not exist, so the caller can
    /// fall back to [`Config::default`] and say so once logging is up.
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_owned(),
                    source,
                });
            }
        };
        Self::parse(&text)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: path.to_owned(),
                source,
            })
    }

    /// Parses configuration from TOML text.
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Looks up a dotted key such as `network.port` and converts it to `T`.
    ///
    /// Defaults count: a key that is absent from the file but has a
    /// default still resolves.
    ///
    /// # Errors
    /// - [`ConfigError::MissingKey`] if no field has that path.
    /// - [`ConfigError::InvalidValue`] if the value does not convert.
    pub fn value<T: DeserializeOwned>(&self, key: &str) -> Result<T, ConfigError> {
        let root = toml::Value::try_from(self)?;
        let mut node = &root;
        for part in key.split('.') {
            node = node
                .get(part)
                .ok_or_else(|| ConfigError::MissingKey(key.to_owned()))?;
        }
        node.clone()
            .try_into()
            .map_err(|source| ConfigError::InvalidValue {
                key: key.to_owned(),
                source,
            })
    }
}
