//! Error types for the polling WebSocket engine.
//!
//! Only a few of these ever reach the caller directly (`Bind`, `FrameTooLarge`
//! from `send`, `NoPendingConnection`, `ConnectionClosed`). The rest describe
//! why a connection or a mid-handshake socket was terminated and are handed
//! to the logging sink.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while accepting, upgrading, or driving connections.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The listening socket could not be created.
    #[error("Cannot bind listener: {0}")]
    Bind(String),

    /// The peer broke the framing rules (for example, sent an unmasked frame).
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// Frame payload exceeds the configured maximum.
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge {
        /// Actual (or declared) payload size.
        size: u64,
        /// Maximum allowed size.
        max: usize,
    },

    /// Read or write failure on a live socket.
    #[error("I/O error: {0}")]
    Io(String),

    /// The opening handshake cannot be completed.
    #[error("Invalid handshake: {0}")]
    InvalidHandshake(String),

    /// Accumulated handshake header exceeds the configured maximum.
    #[error("Handshake too large: {size} bytes (max: {max})")]
    HandshakeTooLarge {
        /// Bytes accumulated so far.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// The peer did not finish the handshake in time.
    #[error("Handshake timed out")]
    HandshakeTimeout,

    /// `claim` was called while no upgraded socket was waiting.
    #[error("No upgraded connection is pending")]
    NoPendingConnection,

    /// The connection is no longer connected.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Packet payload is not valid UTF-8.
    #[error("Invalid UTF-8 in packet")]
    InvalidUtf8,

    /// Configuration the engine cannot honour.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(_: std::str::Utf8Error) -> Self {
        Error::InvalidUtf8
    }
}
