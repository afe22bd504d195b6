//! Error types for the protocol layer.
//!
//! Each crate in Gamebox defines its own error enum. A `ProtocolError`
//! always means the bytes themselves were wrong (or could not be produced),
//! never that a well-formed command was refused.

/// Errors that can occur while encoding or decoding packets.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The packet ended before a value could be read.
    #[error("packet truncated: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    /// The payload was fully decoded but bytes were left over.
    #[error("{0} trailing bytes after payload")]
    TrailingBytes(usize),

    /// A string field was not valid UTF-8.
    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    /// A field held a value outside its domain (e.g. a bool byte of 7).
    #[error("invalid value {value} for {field}")]
    InvalidValue { field: &'static str, value: u32 },

    /// The leading byte is not an opcode this side accepts.
    #[error("unknown opcode 0x{0:02x}")]
    UnknownOpcode(u8),

    /// A zero-length packet has no opcode at all.
    #[error("empty packet")]
    Empty,

    /// A string or list is too long for its 16-bit length prefix. Nothing
    /// was written.
    #[error("length {0} exceeds the 65535 limit of a 16-bit prefix")]
    EncodingLimitExceeded(usize),
}

impl ProtocolError {
    /// Returns `true` for malformed or truncated input.
    ///
    /// Unknown opcodes and encoding limits are reported separately.
    pub fn is_decode_error(&self) -> bool {
        !matches!(
            self,
            Self::UnknownOpcode(_) | Self::EncodingLimitExceeded(_)
        )
    }
}
