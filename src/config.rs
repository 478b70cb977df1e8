//! Configuration and limits for the listener and its connections.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::logging::Logger;

/// Largest payload a single frame may carry, inbound or outbound.
///
/// Outbound frames only use the 7-bit and 16-bit length encodings, so this is
/// also the largest payload `send` can encode.
pub const MAX_FRAME_SIZE: usize = u16::MAX as usize;

/// Resource limits.
///
/// These bound what an adversarial peer can make the engine buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum payload size of a single frame in bytes.
    ///
    /// Default: 65535. Must not exceed [`MAX_FRAME_SIZE`].
    pub max_frame_size: usize,

    /// Maximum size of the accumulated handshake request in bytes.
    ///
    /// Default: 8 KB (8192)
    pub max_handshake_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
            max_handshake_size: 8192,
        }
    }
}

impl Limits {
    /// Create new limits with custom values.
    #[must_use]
    pub const fn new(max_frame_size: usize, max_handshake_size: usize) -> Self {
        Self {
            max_frame_size,
            max_handshake_size,
        }
    }

    /// Validate that a frame payload size is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FrameTooLarge`] if `size` exceeds the configured maximum.
    pub const fn check_frame_size(&self, size: u64) -> Result<()> {
        if size > self.max_frame_size as u64 {
            Err(Error::FrameTooLarge {
                size,
                max: self.max_frame_size,
            })
        } else {
            Ok(())
        }
    }

    /// Validate that the accumulated handshake is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HandshakeTooLarge`] if `size` exceeds the configured maximum.
    pub const fn check_handshake_size(&self, size: usize) -> Result<()> {
        if size > self.max_handshake_size {
            Err(Error::HandshakeTooLarge {
                size,
                max: self.max_handshake_size,
            })
        } else {
            Ok(())
        }
    }
}

/// Timeouts enforced by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeouts {
    /// Maximum time a socket may spend mid-handshake before it is evicted.
    ///
    /// Default: 30 seconds
    pub handshake: Duration,

    /// How long a write may stall before it is treated as a failure.
    ///
    /// Default: 100 milliseconds
    pub write: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            handshake: Duration::from_secs(30),
            write: Duration::from_millis(100),
        }
    }
}

impl Timeouts {
    /// Create new timeouts with custom values.
    #[must_use]
    pub const fn new(handshake: Duration, write: Duration) -> Self {
        Self { handshake, write }
    }
}

/// Listener and connection configuration.
///
/// There is deliberately no default port; it is always passed to
/// [`Listener::start`](crate::Listener::start).
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the listening socket to.
    ///
    /// Default: `0.0.0.0`
    pub bind_addr: IpAddr,

    /// Resource limits.
    pub limits: Limits,

    /// Timeout configuration.
    pub timeouts: Timeouts,

    /// Diagnostics sink shared by the listener and every connection.
    ///
    /// Default: [`Logger::tracing`]
    pub logger: Logger,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            limits: Limits::default(),
            timeouts: Timeouts::default(),
            logger: Logger::default(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bind address.
    #[must_use]
    pub const fn with_bind_addr(mut self, addr: IpAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set custom limits.
    #[must_use]
    pub const fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set timeout configuration.
    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Route diagnostics to `logger`.
    #[must_use]
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Check that the engine can honour this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the frame cap cannot be encoded on
    /// the send path or a timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if self.limits.max_frame_size > MAX_FRAME_SIZE {
            return Err(Error::InvalidConfig(format!(
                "max_frame_size {} exceeds {}",
                self.limits.max_frame_size, MAX_FRAME_SIZE
            )));
        }
        if self.timeouts.handshake.is_zero() || self.timeouts.write.is_zero() {
            return Err(Error::InvalidConfig("timeouts must be non-zero".into()));
        }
        Ok(())
    }
}
