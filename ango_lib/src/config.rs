/// Version string exchanged during the handshake when none is configured.
pub const DEFAULT_PROTOCOL_VERSION: &str = "ango-0.1";

/// Largest frame accepted from the peer, in bytes.
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 8 * 1024 * 1024;

/// Settings shared by both ends of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolConfig {
    /// Both sides must use the same version or the handshake fails.
    pub version: String,
    pub max_frame_length: usize,
}

impl ProtocolConfig {
    pub fn new(version: impl Into<String>) -> Self {
        ProtocolConfig {
            version: version.into(),
            ..Default::default()
        }
    }

    pub fn with_max_frame_length(mut self, max_frame_length: usize) -> Self {
        self.max_frame_length = max_frame_length;
        self
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        ProtocolConfig {
            version: DEFAULT_PROTOCOL_VERSION.to_owned(),
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
        }
    }
}
