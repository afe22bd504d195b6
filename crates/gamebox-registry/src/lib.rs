//! Server registry for Gamebox discovery.
//!
//! The registry is the directory game servers announce themselves to and
//! clients ask for a server list:
//!
//! 1. **Register**: a game server sends SERVER_REGISTER; its address is
//!    taken from the connection, its port/name/player count from the
//!    payload ([`ServerRegistry::register`]).
//! 2. **Update**: periodic SERVER_UPDATEs refresh the first record the
//!    same connection registered ([`ServerRegistry::update`]).
//! 3. **Query**: SERVER_QUERY returns every record in insertion order
//!    ([`ServerRegistry::query`]).
//!
//! # How it fits in the stack
//!
//! ```text
//! Registry service (above)  ← decodes commands, encodes replies
//!     ↕
//! Registry (this crate)  ← owns the server records
//!     ↕
//! Protocol (below)  ← provides ServerEntry, ConnectionId
//! ```

mod config;
mod error;
mod registry;

pub use config::{RegistryConfig, StaticServer};
pub use error::RegistryError;
pub use registry::{ServerRecord, ServerRegistry};
