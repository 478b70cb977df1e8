//! A claimed connection: inbound frame decoding and outbound text frames.

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::BytesMut;

use crate::config::{Config, Limits};
use crate::connection::stream::{Stream, Transport};
use crate::connection::{ConnectionStatus, ReadState};
use crate::error::{Error, Result};
use crate::logging::{Logger, log_event};
use crate::packet::Packet;
use crate::protocol::OpCode;
use crate::protocol::frame::{
    self, HEADER_START_LEN, HeaderStart, PayloadLength, decode_extended_length, unmask_body,
};

/// Largest header a client frame can carry: 2 fixed bytes, an 8-byte
/// extended length and the masking key.
const MAX_HEADER_LEN: usize = HEADER_START_LEN + 8 + 4;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Numeric value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Invoked once per fully decoded inbound frame.
pub type ReceiveCallback<T> = Box<dyn FnMut(Packet, &mut Connection<T>)>;

/// Invoked once when the connection terminates, whatever the reason.
pub type DisconnectCallback<T> = Box<dyn FnOnce(&Connection<T>)>;

/// One upgraded socket and its inbound frame state machine.
///
/// The owner drives it by calling [`poll`](Connection::poll) from its tick
/// loop. `poll` only reads bytes that are already available, so it never
/// blocks; a frame split across many TCP segments is simply finished by a
/// later `poll`.
///
/// ## Example
///
/// ```rust,no_run
/// use pollws::{Listener, Packet};
///
/// # fn main() -> pollws::Result<()> {
/// let mut listener = Listener::start(8080)?;
/// let mut connections = Vec::new();
/// loop {
///     listener.poll_accept();
///     listener.poll_handshake();
///     while listener.pending() {
///         let mut conn = listener.claim(|packet: Packet, conn| {
///             let _ = conn.send(&packet);
///         })?;
///         conn.on_disconnect(|conn| println!("{} left", conn.id()));
///         connections.push(conn);
///     }
///     for conn in &mut connections {
///         conn.poll();
///     }
///     connections.retain(|conn| conn.is_connected());
///     # break;
/// }
/// # Ok(())
/// # }
/// ```
pub struct Connection<T> {
    id: ConnectionId,
    stream: Stream<T>,
    status: ConnectionStatus,
    read_state: ReadState,
    limits: Limits,
    write_timeout: Duration,
    logger: Logger,
    on_receive: Option<ReceiveCallback<T>>,
    on_disconnect: Option<DisconnectCallback<T>>,
}

impl<T> Connection<T> {
    /// Identifier for logging and owner-side bookkeeping.
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Current lifecycle status.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Whether frames are still being exchanged.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.status.is_connected()
    }

    /// Where the decoder is within the current inbound frame.
    #[must_use]
    pub fn read_state(&self) -> ReadState {
        self.read_state
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        self.stream.get_ref()
    }
}

impl<T: Transport> Connection<T> {
    /// Wrap an already-upgraded transport.
    ///
    /// The connection starts `Connected`, expecting the start of a frame.
    pub fn new<F>(io: T, config: &Config, on_receive: F) -> Self
    where
        F: FnMut(Packet, &mut Connection<T>) + 'static,
    {
        Self::from_stream(Stream::new(io), config, Box::new(on_receive))
    }

    pub(crate) fn from_stream(
        stream: Stream<T>,
        config: &Config,
        on_receive: ReceiveCallback<T>,
    ) -> Self {
        Self {
            id: ConnectionId::next(),
            stream,
            status: ConnectionStatus::Connected,
            read_state: ReadState::HeaderStart,
            limits: config.limits.clone(),
            write_timeout: config.timeouts.write,
            logger: config.logger.clone(),
            on_receive: Some(on_receive),
            on_disconnect: None,
        }
    }

    /// Register the disconnect notification.
    ///
    /// It fires exactly once: immediately if the connection is already
    /// disconnected, otherwise when it terminates. Registering again replaces
    /// a notification that has not fired yet.
    pub fn on_disconnect<F>(&mut self, callback: F)
    where
        F: FnOnce(&Connection<T>) + 'static,
    {
        if self.status == ConnectionStatus::Disconnected {
            callback(self);
        } else {
            self.on_disconnect = Some(Box::new(callback));
        }
    }

    /// Remote endpoint, if the transport knows it.
    #[must_use]
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.stream.get_ref().peer_addr()
    }

    /// Local endpoint, if the transport knows it.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.stream.get_ref().local_addr()
    }

    /// Local port, if the transport knows it.
    #[must_use]
    pub fn local_port(&self) -> Option<u16> {
        self.local_addr().map(|addr| addr.port())
    }

    /// Decode every frame whose bytes have fully arrived.
    ///
    /// Runs the read state machine for as long as the active state's byte
    /// requirement is met, invoking the receive callback once per completed
    /// frame, then returns. Protocol violations and transport errors
    /// terminate the connection instead of being returned.
    ///
    /// Calling `poll` from inside the receive callback returns immediately
    /// without consuming anything; the outer call decodes the rest.
    pub fn poll(&mut self) {
        if self.on_receive.is_none() {
            return;
        }
        let read_limit = self.limits.max_frame_size + MAX_HEADER_LEN;
        while self.status.is_connected() {
            let needed = self.read_state.bytes_needed();
            let available = match self.stream.available(read_limit) {
                Ok(n) => n,
                Err(e) => return self.fail(e.into()),
            };

            if available < needed {
                if self.stream.is_eof() {
                    log_event!(self.logger, INFO, "{}: peer closed the socket", self.id);
                    self.terminate();
                }
                return;
            }

            let step = match self.read_state {
                ReadState::HeaderStart => self.read_header_start(),
                ReadState::ExtendedHeader { width } => self.read_extended_header(width),
                ReadState::Body { payload_len } => self.read_body(payload_len),
            };
            if let Err(e) = step {
                self.fail(e);
            }
        }
    }

    fn read_header_start(&mut self) -> Result<()> {
        let bytes = self.stream.take(HEADER_START_LEN);
        let header = HeaderStart::decode([bytes[0], bytes[1]]);
        log_event!(
            self.logger,
            TRACE,
            "{}: header start fin={} mask={} opcode={:#x}",
            self.id,
            header.fin,
            header.masked,
            header.opcode
        );

        if !header.masked {
            return Err(Error::ProtocolViolation(
                "client frame is not masked".into(),
            ));
        }

        match header.opcode() {
            Some(OpCode::Text) => {}
            Some(opcode) => log_event!(
                self.logger,
                DEBUG,
                "{}: {} frame delivered uninterpreted",
                self.id,
                opcode
            ),
            None => log_event!(
                self.logger,
                DEBUG,
                "{}: reserved opcode {:#x} delivered uninterpreted",
                self.id,
                header.opcode
            ),
        }

        if let PayloadLength::Direct(len) = header.length {
            return self.enter_body(u64::from(len));
        }
        if let Some(width) = header.length.extended_width() {
            self.read_state = ReadState::ExtendedHeader { width };
        }
        Ok(())
    }

    fn read_extended_header(&mut self, width: usize) -> Result<()> {
        let field = self.stream.take(width);
        let len = decode_extended_length(&field)?;
        self.enter_body(len)
    }

    fn enter_body(&mut self, len: u64) -> Result<()> {
        self.limits.check_frame_size(len)?;
        // Fits: the cap is at most 65535.
        let payload_len = len as usize;
        log_event!(self.logger, TRACE, "{}: reading frame of length {}", self.id, payload_len);
        self.read_state = ReadState::Body { payload_len };
        Ok(())
    }

    fn read_body(&mut self, payload_len: usize) -> Result<()> {
        let body = self.stream.take(self.read_state.bytes_needed());
        let payload = unmask_body(&body)?;
        debug_assert_eq!(payload.len(), payload_len);
        self.read_state = ReadState::HeaderStart;
        self.deliver(Packet::new(payload));
        Ok(())
    }

    fn deliver(&mut self, packet: Packet) {
        // Present: `poll` returns early while the callback is taken out.
        if let Some(mut on_receive) = self.on_receive.take() {
            on_receive(packet, self);
            if self.on_receive.is_none() {
                self.on_receive = Some(on_receive);
            }
        }
    }

    /// Send `packet` as one unfragmented, unmasked text frame.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the connection is not connected.
    /// - [`Error::FrameTooLarge`] if the payload exceeds the frame cap; nothing
    ///   is written and the connection stays open.
    /// - [`Error::Io`] if the write fails or stalls past the write timeout;
    ///   the connection has been closed and the disconnect notification fired.
    pub fn send(&mut self, packet: &Packet) -> Result<()> {
        if !self.status.is_connected() {
            return Err(Error::ConnectionClosed);
        }

        let mut buf = BytesMut::with_capacity(frame::wire_size(packet.len(), false));
        frame::encode_text(packet.as_bytes(), self.limits.max_frame_size, &mut buf)?;

        if let Err(e) = self.stream.write_all(&buf, self.write_timeout) {
            let err = Error::from(e);
            self.fail(err.clone());
            return Err(err);
        }
        log_event!(self.logger, TRACE, "{}: sent {}-byte packet", self.id, packet.len());
        Ok(())
    }

    /// Close the socket and fire the disconnect notification.
    ///
    /// Any partially decoded frame is discarded. Idempotent.
    pub fn close(&mut self) {
        if self.status.is_connected() {
            log_event!(self.logger, DEBUG, "{}: closed by owner", self.id);
        }
        self.terminate();
    }

    fn fail(&mut self, err: Error) {
        if matches!(err, Error::Io(_)) {
            log_event!(self.logger, ERROR, "{}: {}", self.id, err);
        } else {
            log_event!(self.logger, WARN, "{}: closing connection: {}", self.id, err);
        }
        self.terminate();
    }

    fn terminate(&mut self) {
        if self.status == ConnectionStatus::Disconnected {
            return;
        }
        self.stream.shutdown();
        self.status = ConnectionStatus::Disconnected;
        log_event!(self.logger, INFO, "{}: disconnected", self.id);
        if let Some(on_disconnect) = self.on_disconnect.take() {
            on_disconnect(self);
        }
    }
}

impl<T> fmt::Debug for Connection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("read_state", &self.read_state)
            .finish_non_exhaustive()
    }
}
