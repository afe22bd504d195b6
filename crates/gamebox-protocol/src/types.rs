//! Value types that travel on the wire.
//!
//! Everything here is plain data. How each type is laid out in bytes lives
//! in [`codec`](crate::codec); which opcode carries it lives in
//! [`command`](crate::command) and [`notice`](crate::notice).

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub};

use gamebox_transport::{ConnectionId, Delivery};

use crate::{Notice, ProtocolError};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Server-assigned identifier of a piece, unique within one table session.
///
/// A newtype over `u16`, so a piece id can never be passed where a
/// connection id is expected. Id 0 is never assigned to a live piece and
/// is used as "no piece" in rejections that do not concern one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PieceId(pub u16);

impl PieceId {
    /// Placeholder for rejections that are not about a specific piece.
    pub const NONE: PieceId = PieceId(0);
}

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "piece-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A 2-D point or displacement in table coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Rounds each component to the nearest multiple of `grid`'s matching
    /// component. A zero component leaves that axis untouched.
    pub fn snapped(self, grid: Vec2) -> Self {
        let snap = |v: f32, g: f32| if g > 0.0 { (v / g).round() * g } else { v };
        Self::new(snap(self.x, grid.x), snap(self.y, grid.y))
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl fmt::Display for Vec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Client attributes
// ---------------------------------------------------------------------------

/// A client's display color, packed as `0xRRGGBBAA`.
///
/// Parsing and rendering colors is the UI's business; the protocol only
/// carries the packed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color(pub u32);

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self(u32::from_be_bytes([r, g, b, a]))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:08x}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Small enums carried in payloads
// ---------------------------------------------------------------------------

/// How a FLIP request changes the visible face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipMode {
    FaceDown,
    FaceUp,
    Toggle,
}

impl FlipMode {
    pub fn as_u8(self) -> u8 {
        match self {
            Self::FaceDown => 0,
            Self::FaceUp => 1,
            Self::Toggle => 2,
        }
    }
}

impl TryFrom<u8> for FlipMode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::FaceDown),
            1 => Ok(Self::FaceUp),
            2 => Ok(Self::Toggle),
            other => Err(ProtocolError::InvalidValue {
                field: "flip mode",
                value: other.into(),
            }),
        }
    }
}

/// Why a request was refused. Sent only to the requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The requester lacks the selection/ownership (or has not joined).
    Unauthorized,
    /// The referenced piece does not exist.
    NotFound,
    /// A parameter was out of range, or the table is full.
    Invalid,
}

impl RejectReason {
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Unauthorized => 1,
            Self::NotFound => 2,
            Self::Invalid => 3,
        }
    }
}

impl TryFrom<u8> for RejectReason {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Unauthorized),
            2 => Ok(Self::NotFound),
            3 => Ok(Self::Invalid),
            other => Err(ProtocolError::InvalidValue {
                field: "reject reason",
                value: other.into(),
            }),
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::NotFound => write!(f, "not found"),
            Self::Invalid => write!(f, "invalid"),
        }
    }
}

// ---------------------------------------------------------------------------
// Composite payload records
// ---------------------------------------------------------------------------

/// One server in a discovery reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEntry {
    pub address: String,
    pub port: u16,
    pub name: String,
    pub players: u16,
}

/// Everything a client needs to show a piece it has not seen before.
#[derive(Debug, Clone, PartialEq)]
pub struct PieceSnapshot {
    pub piece: PieceId,
    pub class_id: String,
    pub object_id: String,
    pub location: Vec2,
    pub size: Vec2,
    pub flipped: bool,
    pub rotation: u16,
}

// ---------------------------------------------------------------------------
// Outgoing packets
// ---------------------------------------------------------------------------

/// Who should receive an outgoing packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// One peer.
    Peer(ConnectionId),

    /// An explicit set of peers (e.g. every joined client).
    Peers(Vec<ConnectionId>),

    /// Every connected peer, joined or not.
    All,
}

/// An encoded packet plus its destination and delivery flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub to: Recipient,
    pub delivery: Delivery,
    pub data: Vec<u8>,
}

impl Outgoing {
    /// Encodes `notice` for reliable delivery to `to`.
    ///
    /// # Errors
    /// Returns [`ProtocolError::EncodingLimitExceeded`] if a string field is
    /// too long; no packet is produced in that case.
    pub fn reliable(to: Recipient, notice: &Notice) -> Result<Self, ProtocolError> {
        Ok(Self {
            to,
            delivery: Delivery::Reliable,
            data: notice.encode()?,
        })
    }

    /// Encodes `notice` for unreliable delivery to `to`.
    pub fn unreliable(to: Recipient, notice: &Notice) -> Result<Self, ProtocolError> {
        Ok(Self {
            to,
            delivery: Delivery::Unreliable,
            data: notice.encode()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_piece_id_display() {
        assert_eq!(PieceId(7).to_string(), "piece-7");
    }

    #[test]
    fn test_vec2_arithmetic() {
        let a = Vec2::new(1.0, 2.0);
        let b = Vec2::new(10.0, 5.0);
        assert_eq!(a + b, Vec2::new(11.0, 7.0));
        assert_eq!(b - a, Vec2::new(9.0, 3.0));
        assert_eq!(a * 2.0, Vec2::new(2.0, 4.0));
    }

    #[test]
    fn test_vec2_snapped_rounds_to_grid() {
        let v = Vec2::new(14.0, 26.0);
        assert_eq!(v.snapped(Vec2::new(10.0, 10.0)), Vec2::new(10.0, 30.0));
    }

    #[test]
    fn test_vec2_snapped_zero_grid_is_identity() {
        let v = Vec2::new(14.3, -2.7);
        assert_eq!(v.snapped(Vec2::ZERO), v);
    }

    #[test]
    fn test_color_rgba_packs_big_endian() {
        assert_eq!(Color::rgba(0xff, 0x00, 0x80, 0x10).0, 0xff00_8010);
        assert_eq!(Color::rgba(1, 2, 3, 4).to_string(), "#01020304");
    }

    #[test]
    fn test_flip_mode_rejects_unknown_byte() {
        assert_eq!(FlipMode::try_from(2), Ok(FlipMode::Toggle));
        assert!(matches!(
            FlipMode::try_from(3),
            Err(ProtocolError::InvalidValue { field: "flip mode", value: 3 })
        ));
    }

    #[test]
    fn test_reject_reason_byte_mapping() {
        for reason in [
            RejectReason::Unauthorized,
            RejectReason::NotFound,
            RejectReason::Invalid,
        ] {
            assert_eq!(RejectReason::try_from(reason.as_u8()), Ok(reason));
        }
        assert!(RejectReason::try_from(0).is_err());
    }
}
