//! WebSocket frame opcodes as defined in RFC 6455.

use crate::error::{Error, Result};

/// WebSocket frame opcode.
///
/// Reserved values (0x3-0x7 non-control, 0xB-0xF control) round-trip
/// through parsing as [`OpCode::Reserved`]; the connection state machine
/// rejects them at dispatch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum OpCode {
    /// Continuation frame (0x0). Follows the initial frame of a
    /// fragmented message.
    Continuation,

    /// Text frame (0x1). Message payload must be valid UTF-8.
    Text,

    /// Binary frame (0x2). Arbitrary payload bytes.
    Binary,

    /// Close frame (0x8). May carry a status code and reason.
    Close,

    /// Ping frame (0x9). Receiver must respond with a Pong.
    Ping,

    /// Pong frame (0xA). Answers a Ping; may also arrive unsolicited.
    Pong,

    /// Reserved opcode (0x3-0x7, 0xB-0xF). Preserved for round-tripping.
    Reserved(u8),
}

impl OpCode {
    /// Create an `OpCode` from its raw 4-bit value.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidOpcode` if the value does not fit in 4 bits.
    pub const fn from_u8(byte: u8) -> Result<Self> {
        match byte {
            0x0 => Ok(OpCode::Continuation),
            0x1 => Ok(OpCode::Text),
            0x2 => Ok(OpCode::Binary),
            0x8 => Ok(OpCode::Close),
            0x9 => Ok(OpCode::Ping),
            0xA => Ok(OpCode::Pong),
            0x3..=0x7 | 0xB..=0xF => Ok(OpCode::Reserved(byte)),
            _ => Err(Error::InvalidOpcode(byte)),
        }
    }

    /// Convert to the raw 4-bit wire value.
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            OpCode::Continuation => 0x0,
            OpCode::Text => 0x1,
            OpCode::Binary => 0x2,
            OpCode::Close => 0x8,
            OpCode::Ping => 0x9,
            OpCode::Pong => 0xA,
            OpCode::Reserved(op) => op,
        }
    }

    /// Check if this is a control frame opcode (0x8-0xF).
    ///
    /// Control frames are never fragmented.
    #[inline]
    #[must_use]
    pub const fn is_control(self) -> bool {
        self.as_u8() >= 0x8
    }

    /// Check if this is a data frame opcode (0x0-0x7).
    #[inline]
    #[must_use]
    pub const fn is_data(self) -> bool {
        !self.is_control()
    }

    /// Check if this opcode is reserved for future protocol revisions.
    #[inline]
    #[must_use]
    pub const fn is_reserved(self) -> bool {
        matches!(self, OpCode::Reserved(_))
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpCode::Continuation => write!(f, "Continuation"),
            OpCode::Text => write!(f, "Text"),
            OpCode::Binary => write!(f, "Binary"),
            OpCode::Close => write!(f, "Close"),
            OpCode::Ping => write!(f, "Ping"),
            OpCode::Pong => write!(f, "Pong"),
            OpCode::Reserved(op) => write!(f, "Reserved({op:#x})"),
        }
    }
}
