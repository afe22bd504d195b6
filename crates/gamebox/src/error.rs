//! Unified error type for Gamebox.

use std::path::PathBuf;

use gamebox_protocol::ProtocolError;
use gamebox_registry::RegistryError;
use gamebox_session::DirectoryError;
use gamebox_table::TableError;
use gamebox_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum GameboxError {
    /// A transport-level error (bind, send, shutdown).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A wire-format error (encode, decode, unknown opcode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A server registry error.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A client directory error.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// A table error.
    #[error(transparent)]
    Table(#[from] TableError),

    /// Loading or reading the configuration failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The host behind a [`Server`](crate::Server) failed.
    #[error("host failed: {0}")]
    Host(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// What can go wrong with the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// No value at this dotted key.
    #[error("missing configuration key `{0}`")]
    MissingKey(String),

    /// The value at this dotted key has the wrong type.
    #[error("invalid value for `{key}`: {source}")]
    InvalidValue {
        key: String,
        #[source]
        source: toml::de::Error,
    },
}
