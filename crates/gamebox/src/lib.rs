//! # Gamebox
//!
//! Servers for a networked virtual tabletop.
//!
//! Two kinds of process share one session loop:
//!
//! - a **registry** ([`RegistryService`]) that table servers announce
//!   themselves to and clients ask for a server list;
//! - a **table server** ([`TableService`]) holding one shared table of
//!   pieces that joined clients select, move, flip, shuffle and chat over.
//!
//! Both run inside a [`Server`], which pulls events from a transport
//! [`Host`](gamebox_transport::Host), hands them to the service and sends
//! back whatever it answers. All state lives on the loop's task; nothing
//! is shared behind locks.
//!
//! ```rust,no_run
//! use gamebox::{Server, TableService, shutdown};
//! use gamebox_table::TableConfig;
//! use gamebox_transport::WebSocketHost;
//!
//! # async fn run() -> Result<(), gamebox::GameboxError> {
//! let host = WebSocketHost::bind("0.0.0.0:13355", 256).await?;
//! let config = TableConfig::default();
//! let rate = config.animation_rate_hz;
//! Server::new(host, TableService::new(config))
//!     .with_frame_rate(rate)
//!     .run(shutdown::shutdown_signal())
//!     .await
//! # }
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod announce;
pub mod cli;
mod config;
mod error;
pub mod logging;
mod registry_service;
mod server;
mod service;
pub mod shutdown;
mod table_service;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use announce::{AnnounceError, Announcer};
pub use config::{AnnounceConfig, Config, DEFAULT_PORT, LoggingConfig, NetworkConfig};
pub use error::{ConfigError, GameboxError};
pub use registry_service::RegistryService;
pub use server::{DEFAULT_POLL_INTERVAL, Server};
pub use service::{Service, ServiceError};
pub use table_service::TableService;
