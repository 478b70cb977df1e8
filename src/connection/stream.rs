//! Buffered, non-blocking byte stream over a transport.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::{Duration, Instant};

use bytes::{Buf, Bytes, BytesMut};

const READ_CHUNK: usize = 4096;

/// A bidirectional byte stream the engine can drive without blocking.
///
/// Reads must return [`io::ErrorKind::WouldBlock`] instead of waiting when no
/// data is available. Writes may also return `WouldBlock`; [`Stream::write_all`]
/// retries those until its deadline.
pub trait Transport: Read + Write {
    /// Close both directions. Errors are ignored; the socket is going away.
    fn shutdown(&mut self);

    /// Remote endpoint, if known.
    fn peer_addr(&self) -> Option<SocketAddr> {
        None
    }

    /// Local endpoint, if known.
    fn local_addr(&self) -> Option<SocketAddr> {
        None
    }
}

impl Transport for TcpStream {
    fn shutdown(&mut self) {
        let _ = TcpStream::shutdown(self, Shutdown::Both);
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        TcpStream::peer_addr(self).ok()
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        TcpStream::local_addr(self).ok()
    }
}

/// A transport plus the bytes already pulled off it.
///
/// [`available`](Stream::available) is the engine's "bytes currently
/// available" query: it moves whatever the transport can deliver right now
/// into the receive buffer and reports how much is buffered. Callers then
/// [`take`](Stream::take) exact byte counts, which never blocks.
pub struct Stream<T> {
    io: T,
    read_buf: BytesMut,
    eof: bool,
}

impl<T> Stream<T> {
    /// Wrap a transport with an empty receive buffer.
    pub fn new(io: T) -> Self {
        Self {
            io,
            read_buf: BytesMut::with_capacity(READ_CHUNK),
            eof: false,
        }
    }

    /// Bytes currently buffered.
    #[must_use]
    pub fn buffered(&self) -> &[u8] {
        &self.read_buf
    }

    /// Whether the peer has closed its sending side.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Remove exactly `n` buffered bytes.
    ///
    /// # Panics
    ///
    /// Panics if fewer than `n` bytes are buffered; check
    /// [`available`](Stream::available) first.
    pub fn take(&mut self, n: usize) -> Bytes {
        self.read_buf.split_to(n).freeze()
    }

    /// Discard the first `n` buffered bytes.
    pub fn consume(&mut self, n: usize) {
        self.read_buf.advance(n);
    }

    /// Borrow the transport.
    pub fn get_ref(&self) -> &T {
        &self.io
    }
}

impl<T: Transport> Stream<T> {
    /// Pull everything the transport can deliver without blocking, up to
    /// `limit` buffered bytes, and return the buffered count.
    ///
    /// Stops early at end of stream; see [`is_eof`](Stream::is_eof).
    ///
    /// # Errors
    ///
    /// Returns any transport error other than `WouldBlock`/`Interrupted`.
    pub fn available(&mut self, limit: usize) -> io::Result<usize> {
        let mut chunk = [0u8; READ_CHUNK];
        while !self.eof && self.read_buf.len() < limit {
            let want = (limit - self.read_buf.len()).min(READ_CHUNK);
            match self.io.read(&mut chunk[..want]) {
                Ok(0) => self.eof = true,
                Ok(n) => self.read_buf.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(self.read_buf.len())
    }

    /// Write all of `bytes`, treating a stall longer than `timeout` as failure.
    ///
    /// # Errors
    ///
    /// Returns `TimedOut` if the transport keeps reporting `WouldBlock` past
    /// the deadline, `WriteZero` if it accepts nothing, or the transport's own
    /// error.
    pub fn write_all(&mut self, mut bytes: &[u8], timeout: Duration) -> io::Result<()> {
        let deadline = Instant::now() + timeout;
        while !bytes.is_empty() {
            match self.io.write(bytes) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => bytes = &bytes[n..],
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        return Err(io::Error::new(io::ErrorKind::TimedOut, "write stalled"));
                    }
                    std::thread::yield_now();
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        self.io.flush()
    }

    /// Close the transport and drop anything buffered.
    pub fn shutdown(&mut self) {
        self.io.shutdown();
        self.read_buf.clear();
    }
}
