//! The shared table for Gamebox sessions.
//!
//! A table is the object graph every client in a session sees: pieces,
//! how they are stacked, and which client has selected or owns each one.
//! The session loop is the only writer; clients change the table by
//! sending commands that the table either applies whole or refuses.
//!
//! # Key types
//!
//! - [`Table`]: the arena of pieces plus the draw order
//! - [`Piece`]: one object on the table
//! - [`PieceSpec`]: the ids and geometry of a piece to create
//! - [`TableConfig`]: stacking and animation behaviour
//! - [`TableError`]: why an operation was refused
//!
//! # Control rules
//!
//! ```text
//! SELECT  one holder at a time; blocked by another client's ownership
//! OWN     one owner at a time; independent of selection
//! MOVE / FLIP / ROTATE / REMOVE / SHUFFLE
//!         requester holds the selection AND nobody else owns the piece
//! ```

mod config;
mod error;
mod piece;
mod table;

pub use config::TableConfig;
pub use error::TableError;
pub use piece::{Animation, Drawable, Piece, PieceSpec, Rect};
pub use table::{Released, Table};
