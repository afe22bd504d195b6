//! Primitive values to and from a flat byte buffer.
//!
//! The layout is fixed and documented byte for byte:
//!
//! | Value | Layout |
//! |---|---|
//! | `u8` / `u16` / `u32` | fixed width, little-endian |
//! | `bool` | one byte, `0` or `1` |
//! | string | `u16` byte length, then UTF-8 bytes (no terminator) |
//! | `f32` | IEEE-754 binary32, little-endian |
//! | [`Vec2`] | `x` then `y`, each an `f32` |
//! | optional client | presence byte, then a `u32` if present |
//!
//! Floats use the full 32-bit representation so animation targets survive
//! a round trip exactly. The older 24-bit quantised layout is kept as
//! [`PacketWriter::write_quantized`] for peers that need it; it is exact to
//! within [`QUANTIZE_STEP`].

use gamebox_transport::ConnectionId;

use crate::{Opcode, PieceId, ProtocolError, Vec2};

/// Longest string a 16-bit length prefix can describe.
pub const MAX_STRING_LEN: usize = u16::MAX as usize;

/// Quantised floats cover `[-QUANTIZE_RANGE, QUANTIZE_RANGE)`.
pub const QUANTIZE_RANGE: f32 = 10_000.0;

/// Number of distinct quantised values (24 bits).
const QUANTIZE_LEVELS: f32 = 16_777_216.0;

/// Width of one quantisation step: the worst-case round-trip error.
pub const QUANTIZE_STEP: f32 = 2.0 * QUANTIZE_RANGE / QUANTIZE_LEVELS;

// ---------------------------------------------------------------------------
// PacketWriter
// ---------------------------------------------------------------------------

/// Appends values to a growing packet buffer.
///
/// Writes never fail except [`write_str`](Self::write_str), which refuses
/// over-long strings before touching the buffer.
#[derive(Debug, Clone, Default)]
pub struct PacketWriter {
    buf: Vec<u8>,
}

impl PacketWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a packet with its opcode byte.
    pub fn with_opcode(opcode: Opcode) -> Self {
        let mut writer = Self::new();
        writer.write_u8(opcode.as_u8());
        writer
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(u8::from(value));
    }

    pub fn write_f32(&mut self, value: f32) {
        self.write_u32(value.to_bits());
    }

    pub fn write_vec2(&mut self, value: Vec2) {
        self.write_f32(value.x);
        self.write_f32(value.y);
    }

    pub fn write_piece(&mut self, piece: PieceId) {
        self.write_u16(piece.0);
    }

    pub fn write_client(&mut self, client: ConnectionId) {
        self.write_u32(client.into_inner());
    }

    pub fn write_opt_client(&mut self, client: Option<ConnectionId>) {
        match client {
            Some(id) => {
                self.write_bool(true);
                self.write_client(id);
            }
            None => self.write_bool(false),
        }
    }

    /// Writes a length-prefixed UTF-8 string.
    ///
    /// # Errors
    /// [`ProtocolError::EncodingLimitExceeded`] if `value` is longer than
    /// [`MAX_STRING_LEN`] bytes. The buffer is left unchanged.
    pub fn write_str(&mut self, value: &str) -> Result<(), ProtocolError> {
        let len = u16::try_from(value.len())
            .map_err(|_| ProtocolError::EncodingLimitExceeded(value.len()))?;
        self.write_u16(len);
        self.buf.extend_from_slice(value.as_bytes());
        Ok(())
    }

    /// Writes a `u16` element count for a list of `len` items.
    ///
    /// # Errors
    /// [`ProtocolError::EncodingLimitExceeded`] if `len` does not fit.
    pub fn write_count(&mut self, len: usize) -> Result<(), ProtocolError> {
        let count = u16::try_from(len)
            .map_err(|_| ProtocolError::EncodingLimitExceeded(len))?;
        self.write_u16(count);
        Ok(())
    }

    /// Writes `value` in the lossy 3-byte quantised layout.
    ///
    /// Values outside `[-QUANTIZE_RANGE, QUANTIZE_RANGE)` saturate at the
    /// nearest end of the range.
    pub fn write_quantized(&mut self, value: f32) {
        let scaled = (value + QUANTIZE_RANGE) / (2.0 * QUANTIZE_RANGE)
            * QUANTIZE_LEVELS;
        // `as` saturates for floats; NaN becomes 0.
        let level = (scaled as u32).min(QUANTIZE_LEVELS as u32 - 1);
        self.buf.extend_from_slice(&level.to_le_bytes()[..3]);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

// ---------------------------------------------------------------------------
// PacketReader
// ---------------------------------------------------------------------------

/// Reads values from a received packet.
///
/// The cursor only moves forward. To read a buffer again, construct a new
/// reader over it. Reading past the end is a
/// [`ProtocolError::Truncated`] error and leaves the cursor where it was.
#[derive(Debug, Clone)]
pub struct PacketReader<'a> {
    data: &'a [u8],
    cursor: usize,
}

impl<'a> PacketReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, cursor: 0 }
    }

    /// Reads the leading opcode byte.
    ///
    /// # Errors
    /// [`ProtocolError::Empty`] on a zero-length packet,
    /// [`ProtocolError::UnknownOpcode`] on an unassigned byte.
    pub fn read_opcode(&mut self) -> Result<Opcode, ProtocolError> {
        if self.data.is_empty() {
            return Err(ProtocolError::Empty);
        }
        Opcode::try_from(self.read_u8()?)
    }

    /// Takes the next `n` bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(ProtocolError::Truncated {
                needed: n,
                remaining,
            });
        }
        let bytes = &self.data[self.cursor..self.cursor + n];
        self.cursor += n;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, ProtocolError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, ProtocolError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_bool(&mut self) -> Result<bool, ProtocolError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ProtocolError::InvalidValue {
                field: "bool",
                value: other.into(),
            }),
        }
    }

    pub fn read_f32(&mut self) -> Result<f32, ProtocolError> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    pub fn read_vec2(&mut self) -> Result<Vec2, ProtocolError> {
        let x = self.read_f32()?;
        let y = self.read_f32()?;
        Ok(Vec2::new(x, y))
    }

    pub fn read_piece(&mut self) -> Result<PieceId, ProtocolError> {
        Ok(PieceId(self.read_u16()?))
    }

    pub fn read_client(&mut self) -> Result<ConnectionId, ProtocolError> {
        Ok(ConnectionId::new(self.read_u32()?))
    }

    pub fn read_opt_client(
        &mut self,
    ) -> Result<Option<ConnectionId>, ProtocolError> {
        if self.read_bool()? {
            Ok(Some(self.read_client()?))
        } else {
            Ok(None)
        }
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn read_str(&mut self) -> Result<String, ProtocolError> {
        let len = usize::from(self.read_u16()?);
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| ProtocolError::InvalidUtf8)
    }

    /// Reads a value written by [`PacketWriter::write_quantized`].
    pub fn read_quantized(&mut self) -> Result<f32, ProtocolError> {
        let [a, b, c] = self.read_array::<3>()?;
        let level = u32::from_le_bytes([a, b, c, 0]);
        Ok(level as f32 * (2.0 * QUANTIZE_RANGE) / QUANTIZE_LEVELS
            - QUANTIZE_RANGE)
    }

    /// Bytes not yet read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.cursor
    }

    pub fn is_at_end(&self) -> bool {
        self.remaining() == 0
    }

    /// Current cursor offset from the start of the packet.
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Asserts the whole packet was consumed.
    ///
    /// # Errors
    /// [`ProtocolError::TrailingBytes`] if anything is left.
    pub fn finish(self) -> Result<(), ProtocolError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(ProtocolError::TrailingBytes(n)),
        }
    }
}
