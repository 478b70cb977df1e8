//! Connection status and the inbound frame read state.

use crate::protocol::frame::HEADER_START_LEN;
use crate::protocol::mask::MASK_KEY_LEN;

/// Lifecycle status of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionStatus {
    /// Handshake still in progress.
    #[default]
    Connecting,
    /// Upgraded; frames are being decoded.
    Connected,
    /// Socket closed. Terminal.
    Disconnected,
}

impl ConnectionStatus {
    /// Check if the connection is still usable.
    #[must_use]
    #[inline]
    pub const fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Connecting => write!(f, "Connecting"),
            ConnectionStatus::Connected => write!(f, "Connected"),
            ConnectionStatus::Disconnected => write!(f, "Disconnected"),
        }
    }
}

/// Where the decoder is within the current inbound frame.
///
/// Each state carries exactly the data that is valid in it: the extended
/// length width only while reading the extended length, the payload length
/// only while waiting for the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadState {
    /// Waiting for the two fixed header bytes.
    #[default]
    HeaderStart,
    /// Waiting for a 2- or 8-byte big-endian payload length.
    ExtendedHeader {
        /// Width of the length field in bytes.
        width: usize,
    },
    /// Waiting for the masking key plus payload.
    Body {
        /// Payload length in bytes, already checked against the frame cap.
        payload_len: usize,
    },
}

impl ReadState {
    /// Buffered bytes required before this state's read can run.
    #[must_use]
    pub const fn bytes_needed(&self) -> usize {
        match *self {
            ReadState::HeaderStart => HEADER_START_LEN,
            ReadState::ExtendedHeader { width } => width,
            ReadState::Body { payload_len } => payload_len + MASK_KEY_LEN,
        }
    }
}
