//! Configuration and limits for WebSocket connections.

/// Resource limits for a single connection.
///
/// These bound memory usage against hostile or buggy peers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum size of a complete message in bytes, after reassembling all
    /// fragments.
    ///
    /// Default: 64 MB (64 * 1024 * 1024)
    pub max_message_size: usize,

    /// Maximum number of fragments in a single message.
    ///
    /// Default: 128
    pub max_fragment_count: usize,

    /// Maximum size of buffered handshake data in bytes.
    ///
    /// Default: 8 KB (8192)
    pub max_handshake_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_message_size: 64 * 1024 * 1024,
            max_fragment_count: 128,
            max_handshake_size: 8192,
        }
    }
}

impl Limits {
    /// Create new limits with custom values.
    #[must_use]
    pub const fn new(
        max_message_size: usize,
        max_fragment_count: usize,
        max_handshake_size: usize,
    ) -> Self {
        Self {
            max_message_size,
            max_fragment_count,
            max_handshake_size,
        }
    }

    /// Validate that message size is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MessageTooLarge`](crate::Error::MessageTooLarge) if `size` exceeds the configured maximum.
    pub const fn check_message_size(&self, size: usize) -> Result<(), crate::Error> {
        if size > self.max_message_size {
            Err(crate::Error::MessageTooLarge {
                size,
                max: self.max_message_size,
            })
        } else {
            Ok(())
        }
    }

    /// Validate that fragment count is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TooManyFragments`](crate::Error::TooManyFragments) if `count` exceeds the configured maximum.
    pub const fn check_fragment_count(&self, count: usize) -> Result<(), crate::Error> {
        if count > self.max_fragment_count {
            Err(crate::Error::TooManyFragments {
                count,
                max: self.max_fragment_count,
            })
        } else {
            Ok(())
        }
    }

    /// Validate that buffered handshake size is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HandshakeTooLarge`](crate::Error::HandshakeTooLarge) if `size` exceeds the configured maximum.
    pub const fn check_handshake_size(&self, size: usize) -> Result<(), crate::Error> {
        if size > self.max_handshake_size {
            Err(crate::Error::HandshakeTooLarge {
                size,
                max: self.max_handshake_size,
            })
        } else {
            Ok(())
        }
    }
}

/// WebSocket connection configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Resource limits.
    pub limits: Limits,

    /// Maximum payload size per outgoing frame, in bytes.
    ///
    /// Messages larger than this are split into an initial frame plus
    /// continuation frames. `None` (the default) disables splitting.
    pub frame_size: Option<usize>,

    /// Protocol versions this endpoint accepts, in preference order.
    ///
    /// Default: `["13"]`, the only version this crate implements. The list
    /// is explicit configuration rather than module state so a rejection
    /// response can advertise it verbatim.
    pub supported_versions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            frame_size: None,
            supported_versions: vec!["13".to_string()],
        }
    }
}

impl Config {
    /// Create a new configuration with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set custom limits.
    #[must_use]
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the maximum payload size per outgoing frame.
    #[must_use]
    pub fn with_frame_size(mut self, size: usize) -> Self {
        self.frame_size = Some(size);
        self
    }

    /// Set the accepted protocol versions, in preference order.
    #[must_use]
    pub fn with_supported_versions(mut self, versions: Vec<String>) -> Self {
        self.supported_versions = versions;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_default() {
        let limits = Limits::default();
        assert_eq!(limits.max_message_size, 64 * 1024 * 1024);
        assert_eq!(limits.max_fragment_count, 128);
        assert_eq!(limits.max_handshake_size, 8192);
    }

    #[test]
    fn test_limits_check_message_size() {
        let limits = Limits::default();
        assert!(limits.check_message_size(1024).is_ok());
        assert!(limits.check_message_size(100 * 1024 * 1024).is_err());
    }

    #[test]
    fn test_limits_check_fragment_count() {
        let limits = Limits::default();
        assert!(limits.check_fragment_count(50).is_ok());
        assert!(limits.check_fragment_count(200).is_err());
    }

    #[test]
    fn test_limits_check_handshake_size() {
        let limits = Limits::default();
        assert!(limits.check_handshake_size(1024).is_ok());
        assert!(limits.check_handshake_size(10000).is_err());
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.frame_size, None);
        assert_eq!(config.supported_versions, vec!["13".to_string()]);
    }

    #[test]
    fn test_config_builder() {
        let config = Config::new()
            .with_limits(Limits::new(1024, 4, 512))
            .with_frame_size(4096);

        assert_eq!(config.frame_size, Some(4096));
        assert_eq!(config.limits.max_message_size, 1024);
    }

    #[test]
    fn test_config_supported_versions() {
        let config = Config::new().with_supported_versions(vec!["13".into(), "8".into()]);
        assert_eq!(config.supported_versions.len(), 2);
        assert_eq!(config.supported_versions[0], "13");
    }
}
