//! Error types for the WebSocket protocol engine.
//!
//! Errors fall into three families: transient decode errors resolved by
//! buffering more bytes (`Truncated`), local misuse errors returned
//! synchronously to the caller (`NotOpen`, `NoDataSender`, ...), and protocol
//! violations by the peer that are fatal to the connection.

use thiserror::Error;

use crate::connection::ConnectionState;

/// Result type alias for WebSocket operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during WebSocket operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Not enough bytes to decode a complete frame. Resolved by buffering
    /// more input; never a protocol violation.
    #[error("Truncated frame: need {needed} more bytes")]
    Truncated {
        /// Number of additional bytes needed.
        needed: usize,
    },

    /// Opcode value outside the 4-bit range.
    #[error("Invalid opcode: {0:#x}")]
    InvalidOpcode(u8),

    /// Payload length cannot be represented in the 64-bit length field.
    #[error("Payload too large: {size} bytes")]
    PayloadTooLarge {
        /// Requested payload size.
        size: u128,
    },

    /// Frame size passed to `for_message` was zero.
    #[error("Frame size must be at least 1 byte")]
    InvalidFrameSize,

    /// Control frame received with FIN=0 (RFC violation).
    #[error("Control frames cannot be fragmented")]
    FragmentedControlFrame,

    /// Control frame payload exceeds 125 bytes.
    #[error("Control frame payload too large: {0} bytes (max: 125)")]
    ControlFrameTooLarge(usize),

    /// Reserved or unsupported opcode dispatched on an open connection.
    #[error("Unsupported frame opcode: {0:#x}")]
    BadFrameOp(u8),

    /// Illegal data frame ordering (continuation rules).
    #[error("Bad frame sequence: {0}")]
    BadFrameSequence(String),

    /// Message size exceeds configured maximum.
    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge {
        /// Actual message size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Too many fragments in a single message.
    #[error("Too many fragments: {count} (max: {max})")]
    TooManyFragments {
        /// Actual fragment count.
        count: usize,
        /// Maximum allowed fragments.
        max: usize,
    },

    /// Operation requires the `Open` state.
    #[error("Connection is not open (state: {0})")]
    NotOpen(ConnectionState),

    /// No data-sender capability has been registered.
    #[error("No data sender registered")]
    NoDataSender,

    /// Outbound message rejected before encoding.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Malformed inbound data (empty buffer, invalid UTF-8 in a text
    /// message, malformed close payload).
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Handshake data exceeds the configured maximum.
    #[error("Handshake too large: {size} bytes (max: {max})")]
    HandshakeTooLarge {
        /// Actual handshake size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Opening handshake failed.
    #[error(transparent)]
    Handshake(#[from] HandshakeError),

    /// Failure in the platform entropy source.
    #[error("Entropy source failure: {0}")]
    Entropy(String),
}

impl From<getrandom::Error> for Error {
    fn from(err: getrandom::Error) -> Self {
        Error::Entropy(err.to_string())
    }
}

/// A failed opening handshake.
///
/// Always recoverable at the application level: the server side renders it
/// into an HTTP 400 rejection via [`HandshakeError::rejection_response`] and
/// terminates the attempt. Carries the ordered supported-version list so the
/// rejection can advertise acceptable versions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Handshake failed: {reason}")]
pub struct HandshakeError {
    /// Human-readable failure reason.
    pub reason: String,
    /// Versions the local endpoint supports, in preference order.
    pub supported_versions: Vec<String>,
}

impl HandshakeError {
    /// Create a handshake error with no version information attached.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            supported_versions: Vec::new(),
        }
    }

    /// Attach the supported-version list for rejection responses.
    #[must_use]
    pub fn with_supported_versions(mut self, versions: &[String]) -> Self {
        self.supported_versions = versions.to_vec();
        self
    }

    /// Render an HTTP 400 rejection response for this failure.
    ///
    /// Includes a `Sec-WebSocket-Version` header listing the supported
    /// versions when known, per RFC 6455 Section 4.2.2.
    #[must_use]
    pub fn rejection_response(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"HTTP/1.1 400 Bad Request\r\n");
        if !self.supported_versions.is_empty() {
            buf.extend_from_slice(
                format!(
                    "Sec-WebSocket-Version: {}\r\n",
                    self.supported_versions.join(", ")
                )
                .as_bytes(),
            );
        }
        buf.extend_from_slice(b"Content-Type: text/plain\r\n");
        buf.extend_from_slice(format!("Content-Length: {}\r\n", self.reason.len()).as_bytes());
        buf.extend_from_slice(b"\r\n");
        buf.extend_from_slice(self.reason.as_bytes());
        buf
    }
}
