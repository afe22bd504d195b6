//! Wire protocol for Gamebox.
//!
//! This crate defines the bytes that clients, table servers and the
//! registry exchange:
//!
//! - **Codec** ([`PacketWriter`], [`PacketReader`]): primitive values to
//!   and from a flat little-endian buffer.
//! - **Opcodes** ([`Opcode`]): the leading byte of every packet.
//! - **Commands** ([`Command`]): what a client asks for.
//! - **Notices** ([`Notice`]): what a server tells its clients.
//! - **Errors** ([`ProtocolError`]): what can go wrong while encoding or
//!   decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and the services
//! that own state. It doesn't know about pieces or nicknames beyond their
//! shape on the wire.
//!
//! ```text
//! Transport (bytes) → Protocol (Command) → Service → Protocol (Notice) → Transport
//! ```
//!
//! Packets are decoded whole before anything acts on them: a truncated or
//! padded payload is an error, never a partial command.

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod codec;
mod command;
mod error;
mod notice;
mod opcode;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use codec::{
    MAX_STRING_LEN, PacketReader, PacketWriter, QUANTIZE_RANGE, QUANTIZE_STEP,
};
pub use command::Command;
pub use error::ProtocolError;
pub use gamebox_transport::{ConnectionId, Delivery};
pub use notice::Notice;
pub use opcode::Opcode;
pub use types::{
    Color, FlipMode, Outgoing, PieceId, PieceSnapshot, Recipient,
    RejectReason, ServerEntry, Vec2,
};
