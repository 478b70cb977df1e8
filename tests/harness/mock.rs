//! In-memory transport with a shared handle for the test side.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::rc::Rc;

use pollws::Transport;

#[derive(Default)]
struct Shared {
    inbound: VecDeque<u8>,
    outbound: Vec<u8>,
    peer_closed: bool,
    fail_writes: bool,
    shutdown: bool,
}

/// A transport whose peer is the test itself.
///
/// Reads return `WouldBlock` when nothing has been pushed, like a
/// non-blocking socket. Clones share the same state.
#[derive(Clone, Default)]
pub struct MockTransport(Rc<RefCell<Shared>>);

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `bytes` available to the next read.
    pub fn push(&self, bytes: &[u8]) {
        self.0.borrow_mut().inbound.extend(bytes.iter().copied());
    }

    /// Reads return end of stream once the pushed bytes are drained.
    pub fn peer_close(&self) {
        self.0.borrow_mut().peer_closed = true;
    }

    /// Every byte written so far.
    pub fn written(&self) -> Vec<u8> {
        self.0.borrow().outbound.clone()
    }

    /// Bytes pushed but not yet read.
    pub fn unread(&self) -> usize {
        self.0.borrow().inbound.len()
    }

    /// Writes fail with `BrokenPipe` from now on.
    pub fn fail_writes(&self) {
        self.0.borrow_mut().fail_writes = true;
    }

    pub fn is_shutdown(&self) -> bool {
        self.0.borrow().shutdown
    }
}

impl Read for MockTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut shared = self.0.borrow_mut();
        if shared.shutdown {
            return Err(io::ErrorKind::NotConnected.into());
        }
        if shared.inbound.is_empty() {
            return if shared.peer_closed {
                Ok(0)
            } else {
                Err(io::ErrorKind::WouldBlock.into())
            };
        }
        let n = buf.len().min(shared.inbound.len());
        for (slot, byte) in buf.iter_mut().zip(shared.inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for MockTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut shared = self.0.borrow_mut();
        if shared.fail_writes || shared.shutdown {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        shared.outbound.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for MockTransport {
    fn shutdown(&mut self) {
        self.0.borrow_mut().shutdown = true;
    }
}
