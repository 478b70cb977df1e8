//! Opening handshake (RFC 6455 Section 4).
//!
//! The server side only: recognising an upgrade request in a growing buffer
//! of header text, and writing the fixed `101 Switching Protocols` response.

use std::collections::HashMap;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use bytes::{BufMut, BytesMut};
use sha1::{Digest, Sha1};

use crate::error::{Error, Result};

/// The WebSocket GUID used in the Sec-WebSocket-Accept calculation (RFC 6455).
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

const REQUEST_METHOD: &[u8] = b"GET";
const HEADER_END: &[u8] = b"\r\n\r\n";

/// Parse HTTP header lines into a map keyed by lowercase header name.
///
/// Stops at the first empty line. Later duplicates overwrite earlier ones.
fn parse_headers<'a, I>(lines: I) -> HashMap<String, String>
where
    I: Iterator<Item = &'a str>,
{
    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_lowercase(), value.trim().to_string());
        }
    }
    headers
}

/// Computes the Sec-WebSocket-Accept value from the client's Sec-WebSocket-Key.
///
/// The accept key is calculated as: Base64(SHA-1(key + GUID))
///
/// # Example
///
/// ```
/// use pollws::protocol::handshake::compute_accept_key;
///
/// let key = "dGhlIHNhbXBsZSBub25jZQ==";
/// let accept = compute_accept_key(key);
/// assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
/// ```
pub fn compute_accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// An upgrade request recognised in accumulated header text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeRequest {
    /// The request target (e.g., "/game").
    pub path: String,
    /// The Sec-WebSocket-Key header value, trimmed.
    pub key: String,
}

impl HandshakeRequest {
    /// Look for a complete upgrade request at the start of `data`.
    ///
    /// Returns `Ok(None)` while more bytes are needed, or the request and the
    /// number of bytes it occupies (including the terminating blank line).
    /// Anything after that belongs to the WebSocket stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandshake`] if:
    /// - The text cannot start with a `GET` request line.
    /// - The header block is complete but not UTF-8.
    /// - The header block is complete but has no non-empty `Sec-WebSocket-Key`.
    pub fn recognize(data: &[u8]) -> Result<Option<(Self, usize)>> {
        let prefix = data.len().min(REQUEST_METHOD.len());
        if !data[..prefix].eq_ignore_ascii_case(&REQUEST_METHOD[..prefix]) {
            return Err(Error::InvalidHandshake(
                "Request does not start with GET".into(),
            ));
        }

        let Some(end) = data
            .windows(HEADER_END.len())
            .position(|window| window == HEADER_END)
        else {
            return Ok(None);
        };
        let consumed = end + HEADER_END.len();

        let text = std::str::from_utf8(&data[..end])
            .map_err(|_| Error::InvalidHandshake("Invalid UTF-8".into()))?;
        let mut lines = text.split("\r\n");

        // Request line: "GET /path HTTP/1.1"
        let request_line = lines.next().unwrap_or_default();
        let path = request_line
            .split_whitespace()
            .nth(1)
            .unwrap_or("/")
            .to_string();

        let headers = parse_headers(lines);
        let key = headers
            .get("sec-websocket-key")
            .filter(|key| !key.is_empty())
            .ok_or_else(|| Error::InvalidHandshake("Missing Sec-WebSocket-Key header".into()))?
            .clone();

        Ok(Some((Self { path, key }, consumed)))
    }
}

/// The server's `101 Switching Protocols` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResponse {
    /// The Sec-WebSocket-Accept value.
    pub accept: String,
}

impl HandshakeResponse {
    /// Create a handshake response for a recognised request.
    #[must_use]
    pub fn from_request(req: &HandshakeRequest) -> Self {
        Self {
            accept: compute_accept_key(&req.key),
        }
    }

    /// Write the HTTP response to a buffer.
    pub fn write(&self, buf: &mut BytesMut) {
        buf.put_slice(b"HTTP/1.1 101 Switching Protocols\r\n");
        buf.put_slice(b"Connection: Upgrade\r\n");
        buf.put_slice(b"Upgrade: websocket\r\n");
        buf.put_slice(b"Sec-WebSocket-Accept: ");
        buf.put_slice(self.accept.as_bytes());
        buf.put_slice(b"\r\n\r\n");
    }
}
