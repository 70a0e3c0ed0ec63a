//! Connection lifecycle states.

/// Lifecycle state of a WebSocket connection.
///
/// Transitions only move forward: `Opening` to `Open` on a successful
/// handshake, `Open` to `Closing` when we initiate the close handshake,
/// and anything to `Closed` when the connection terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum ConnectionState {
    /// Opening handshake in progress.
    #[default]
    Opening,
    /// Handshake complete; data transfer allowed.
    Open,
    /// We sent a close frame and are waiting for the peer's echo.
    Closing,
    /// Fully closed. All further input is discarded.
    Closed,
}

impl ConnectionState {
    /// Whether the connection still processes input.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self, ConnectionState::Closed)
    }

    /// Whether application messages may be sent in this state.
    #[inline]
    #[must_use]
    pub const fn can_send(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    /// Whether frames are still parsed and dispatched in this state.
    #[inline]
    #[must_use]
    pub const fn can_receive(&self) -> bool {
        matches!(self, ConnectionState::Open | ConnectionState::Closing)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Opening => write!(f, "Opening"),
            ConnectionState::Open => write!(f, "Open"),
            ConnectionState::Closing => write!(f, "Closing"),
            ConnectionState::Closed => write!(f, "Closed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        assert_eq!(ConnectionState::default(), ConnectionState::Opening);
    }

    #[test]
    fn test_can_send_only_when_open() {
        assert!(!ConnectionState::Opening.can_send());
        assert!(ConnectionState::Open.can_send());
        assert!(!ConnectionState::Closing.can_send());
        assert!(!ConnectionState::Closed.can_send());
    }

    #[test]
    fn test_can_receive_while_open_or_closing() {
        assert!(!ConnectionState::Opening.can_receive());
        assert!(ConnectionState::Open.can_receive());
        assert!(ConnectionState::Closing.can_receive());
        assert!(!ConnectionState::Closed.can_receive());
    }

    #[test]
    fn test_is_active() {
        assert!(ConnectionState::Opening.is_active());
        assert!(ConnectionState::Closing.is_active());
        assert!(!ConnectionState::Closed.is_active());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ConnectionState::Opening.to_string(), "Opening");
        assert_eq!(ConnectionState::Closed.to_string(), "Closed");
    }
}
