//! Client-side frame builders and a blocking loopback client.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use bytes::BytesMut;
use pollws::OpCode;
use pollws::protocol::encode_masked;

pub const SAMPLE_KEY: &str = "dGhlIHNhbXBsZSBub25jZQ==";
pub const SAMPLE_ACCEPT: &str = "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=";

/// A masked text frame with a random mask key, as a browser would send it.
pub fn client_frame(payload: &[u8]) -> Vec<u8> {
    let mut mask = [0u8; 4];
    getrandom::getrandom(&mut mask).expect("random mask");
    client_frame_with(OpCode::Text, payload, mask)
}

/// A masked frame with an explicit opcode and mask key.
pub fn client_frame_with(opcode: OpCode, payload: &[u8], mask: [u8; 4]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    encode_masked(opcode, payload, mask, &mut buf);
    buf.to_vec()
}

/// A text frame with the mask bit clear.
pub fn unmasked_frame(payload: &[u8]) -> Vec<u8> {
    assert!(payload.len() < 126);
    let mut frame = vec![0x81, payload.len() as u8];
    frame.extend_from_slice(payload);
    frame
}

/// Header and mask key of a masked text frame declaring `len` payload bytes
/// through the 64-bit length field. No payload follows.
pub fn declared_length_frame(len: u64) -> Vec<u8> {
    let mut frame = vec![0x81, 0x80 | 127];
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(&[1, 2, 3, 4]);
    frame
}

/// Decode one unmasked server frame from the front of `bytes`.
///
/// Returns `(first header byte, payload, bytes consumed)`, or `None` if the
/// frame is incomplete.
pub fn decode_server_frame(bytes: &[u8]) -> Option<(u8, Vec<u8>, usize)> {
    let [first, second, rest @ ..] = bytes else {
        return None;
    };
    assert_eq!(second & 0x80, 0, "server frames are never masked");
    let (len, header) = match second & 0x7F {
        126 => {
            let [hi, lo, ..] = rest else { return None };
            (usize::from(u16::from_be_bytes([*hi, *lo])), 4)
        }
        127 => panic!("server never uses the 64-bit length"),
        len => (usize::from(len), 2),
    };
    let end = header + len;
    (bytes.len() >= end).then(|| (*first, bytes[header..end].to_vec(), end))
}

/// Blocking client over a real socket. Reads time out so a broken test
/// fails instead of hanging.
pub struct TestClient {
    stream: TcpStream,
    buf: Vec<u8>,
}

impl TestClient {
    pub fn connect(addr: SocketAddr) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_read_timeout(Some(Duration::from_secs(2)))?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream,
            buf: Vec::new(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.stream.local_addr().expect("client local addr")
    }

    /// The upgrade request a browser would send with `key`.
    pub fn upgrade_request(key: &str) -> Vec<u8> {
        format!(
            "GET /chat HTTP/1.1\r\n\
             Host: 127.0.0.1\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Key: {key}\r\n\
             Sec-WebSocket-Version: 13\r\n\r\n"
        )
        .into_bytes()
    }

    pub fn send_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes)?;
        self.stream.flush()
    }

    pub fn send_request(&mut self) -> io::Result<()> {
        self.send_raw(&Self::upgrade_request(SAMPLE_KEY))
    }

    pub fn send_text(&mut self, payload: &[u8]) -> io::Result<()> {
        self.send_raw(&client_frame(payload))
    }

    fn fill(&mut self) -> io::Result<usize> {
        let mut chunk = [0u8; 4096];
        let n = self.stream.read(&mut chunk)?;
        self.buf.extend_from_slice(&chunk[..n]);
        Ok(n)
    }

    /// Read the server's handshake response, leaving later bytes buffered.
    pub fn read_response(&mut self) -> io::Result<String> {
        loop {
            if let Some(end) = self.buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let rest = self.buf.split_off(end + 4);
                let head = std::mem::replace(&mut self.buf, rest);
                return Ok(String::from_utf8_lossy(&head).into_owned());
            }
            if self.fill()? == 0 {
                return Err(io::ErrorKind::UnexpectedEof.into());
            }
        }
    }

    /// Read one server frame's `(first header byte, payload)`.
    pub fn recv_frame(&mut self) -> io::Result<(u8, Vec<u8>)> {
        loop {
            if let Some((first, payload, used)) = decode_server_frame(&self.buf) {
                self.buf.drain(..used);
                return Ok((first, payload));
            }
            if self.fill()? == 0 {
                return Err(io::ErrorKind::UnexpectedEof.into());
            }
        }
    }

    /// Whether the server has closed the socket.
    pub fn is_closed(&mut self) -> bool {
        match self.fill() {
            Ok(0) => true,
            Ok(_) => false,
            Err(e) => !matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut),
        }
    }
}
