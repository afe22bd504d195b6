//! Client directory for Gamebox.
//!
//! This crate tracks every connected client:
//!
//! 1. **Connection**: an accepted connection becomes an unjoined
//!    [`Client`] ([`ClientDirectory::connect`])
//! 2. **Join**: a free nickname promotes it to joined and visible to
//!    everyone else ([`ClientDirectory::join`])
//! 3. **Disconnect**: the record is dropped; the caller releases the
//!    client's table claims in the same step
//!
//! # How it fits in the stack
//!
//! ```text
//! Table service (above)  ← uses the directory for fan-out and JOIN/LEAVE
//!     ↕
//! Client directory (this crate)  ← nicknames, colors, joined flag
//!     ↕
//! Protocol layer (below)  ← provides ConnectionId, Color
//! ```

mod client;
mod directory;
mod error;

pub use client::{Client, MAX_NICKNAME_LEN};
pub use directory::ClientDirectory;
pub use error::DirectoryError;
