//! Decoded payloads handed to, and accepted from, the owner.

use bytes::Bytes;

use crate::error::Result;

/// An immutable frame payload.
///
/// One `Packet` is produced per fully decoded inbound frame, and `send` wraps
/// one `Packet` in a single text frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Packet {
    data: Bytes,
}

impl Packet {
    /// Create a packet from raw bytes.
    #[must_use]
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Create a packet holding UTF-8 text.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(text.into())
    }

    /// Payload bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Payload as text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUtf8`](crate::Error::InvalidUtf8) if the payload is not UTF-8.
    pub fn as_str(&self) -> Result<&str> {
        Ok(std::str::from_utf8(&self.data)?)
    }

    /// Payload length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Take the payload.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

impl From<Bytes> for Packet {
    fn from(data: Bytes) -> Self {
        Self::new(data)
    }
}

impl From<Vec<u8>> for Packet {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<String> for Packet {
    fn from(text: String) -> Self {
        Self::text(text)
    }
}

impl From<&str> for Packet {
    fn from(text: &str) -> Self {
        Self::new(Bytes::copy_from_slice(text.as_bytes()))
    }
}
