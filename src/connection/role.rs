//! Endpoint role (client or server).

/// Which end of the connection this engine drives.
///
/// The role fixes masking direction per RFC 6455: clients mask everything
/// they send, servers send in the clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Client endpoint. Masks outgoing frames.
    Client,
    /// Server endpoint. Sends outgoing frames unmasked.
    Server,
}

impl Role {
    /// Whether this role must mask outgoing frames.
    #[inline]
    #[must_use]
    pub const fn must_mask(&self) -> bool {
        matches!(self, Role::Client)
    }

    /// Whether this role expects incoming frames to be masked.
    #[inline]
    #[must_use]
    pub const fn expects_masked(&self) -> bool {
        matches!(self, Role::Server)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Client => write!(f, "Client"),
            Role::Server => write!(f, "Server"),
        }
    }
}
