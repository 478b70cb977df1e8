//! Accepting sockets and upgrading them to WebSocket connections.
//!
//! A socket moves through three places, and is in exactly one at a time:
//! the mid-handshake set, the ready queue, and (once claimed) a
//! [`Connection`] owned by the caller.

use std::collections::VecDeque;
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::time::Instant;

use bytes::BytesMut;

use crate::config::Config;
use crate::connection::{Connection, Stream, Transport};
use crate::error::{Error, Result};
use crate::logging::log_event;
use crate::packet::Packet;
use crate::protocol::{HandshakeRequest, HandshakeResponse};

fn describe(addr: Option<SocketAddr>) -> String {
    addr.map_or_else(|| "unknown peer".to_string(), |addr| addr.to_string())
}

/// A socket that has not finished the opening handshake.
///
/// The accumulated request text lives in the stream's receive buffer, so any
/// bytes the client sends right after its request stay there for the
/// connection.
struct Handshake<T> {
    stream: Stream<T>,
    started: Instant,
}

impl<T: Transport> Handshake<T> {
    fn new(io: T, started: Instant) -> Self {
        Self {
            stream: Stream::new(io),
            started,
        }
    }

    fn peer(&self) -> String {
        describe(Transport::peer_addr(self.stream.get_ref()))
    }

    /// Read what has arrived and upgrade if the request is complete.
    ///
    /// Returns `Ok(true)` once the `101` response has been written.
    fn advance(&mut self, now: Instant, config: &Config) -> Result<bool> {
        let before = self.stream.buffered().len();
        let buffered = self
            .stream
            .available(config.limits.max_handshake_size + 1)?;
        if buffered > before {
            log_event!(
                config.logger,
                DEBUG,
                "handshake bytes from {}:\n{}",
                self.peer(),
                String::from_utf8_lossy(&self.stream.buffered()[before..])
            );
        }

        let Some((request, consumed)) = HandshakeRequest::recognize(self.stream.buffered())?
        else {
            config.limits.check_handshake_size(buffered)?;
            if self.stream.is_eof() {
                return Err(Error::InvalidHandshake(
                    "peer closed before completing the request".into(),
                ));
            }
            if now.duration_since(self.started) >= config.timeouts.handshake {
                return Err(Error::HandshakeTimeout);
            }
            return Ok(false);
        };

        self.stream.consume(consumed);
        let mut response = BytesMut::new();
        HandshakeResponse::from_request(&request).write(&mut response);
        self.stream.write_all(&response, config.timeouts.write)?;

        log_event!(
            config.logger,
            INFO,
            "upgraded {} (path {})",
            self.peer(),
            request.path
        );
        Ok(true)
    }
}

/// Owns the listening socket and every socket that has not been claimed yet.
///
/// Entirely non-blocking: the owner calls [`poll_accept`](Listener::poll_accept)
/// and [`poll_handshake`](Listener::poll_handshake) from its tick loop, then
/// [`claim`](Listener::claim)s connections while [`pending`](Listener::pending)
/// is true.
pub struct Listener {
    socket: TcpListener,
    config: Config,
    handshaking: Vec<Handshake<TcpStream>>,
    ready: VecDeque<Stream<TcpStream>>,
}

impl Listener {
    /// Bind to `port` on all interfaces with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Bind`] if the port is unavailable.
    pub fn start(port: u16) -> Result<Self> {
        Self::start_with(port, Config::default())
    }

    /// Bind to `port` on `config.bind_addr`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidConfig`] if `config` fails [`Config::validate`].
    /// - [`Error::Bind`] if the socket cannot be bound or made non-blocking.
    pub fn start_with(port: u16, config: Config) -> Result<Self> {
        config.validate()?;
        let addr = SocketAddr::new(config.bind_addr, port);
        let socket = TcpListener::bind(addr).map_err(|e| Error::Bind(format!("{addr}: {e}")))?;
        socket
            .set_nonblocking(true)
            .map_err(|e| Error::Bind(format!("{addr}: {e}")))?;

        log_event!(config.logger, INFO, "listening on {}", addr);
        Ok(Self {
            socket,
            config,
            handshaking: Vec::new(),
            ready: VecDeque::new(),
        })
    }

    /// Address the listening socket is bound to.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the OS cannot report it.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// The configuration connections are created with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Accept every connection the OS has queued. Never blocks.
    pub fn poll_accept(&mut self) {
        loop {
            match self.socket.accept() {
                Ok((tcp, peer)) => {
                    if let Err(e) = tcp.set_nonblocking(true) {
                        log_event!(self.config.logger, WARN, "dropping {}: {}", peer, e);
                        continue;
                    }
                    if let Err(e) = tcp.set_nodelay(true) {
                        log_event!(self.config.logger, DEBUG, "{}: nodelay unavailable: {}", peer, e);
                    }
                    log_event!(self.config.logger, DEBUG, "accepted {}", peer);
                    self.handshaking.push(Handshake::new(tcp, Instant::now()));
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    log_event!(self.config.logger, ERROR, "accept failed: {}", e);
                    break;
                }
            }
        }
    }

    /// Advance every mid-handshake socket by whatever bytes have arrived.
    ///
    /// Completed upgrades move to the ready queue. Sockets that send a
    /// request that can never upgrade, exceed the header size limit, close,
    /// or outlive the handshake timeout are closed and dropped.
    pub fn poll_handshake(&mut self) {
        let now = Instant::now();
        for mut handshake in std::mem::take(&mut self.handshaking) {
            match handshake.advance(now, &self.config) {
                Ok(true) => self.ready.push_back(handshake.stream),
                Ok(false) => self.handshaking.push(handshake),
                Err(e) => {
                    log_event!(
                        self.config.logger,
                        WARN,
                        "dropping handshake from {}: {}",
                        handshake.peer(),
                        e
                    );
                    handshake.stream.shutdown();
                }
            }
        }
    }

    /// Whether an upgraded socket is waiting to be claimed.
    #[must_use]
    pub fn pending(&self) -> bool {
        !self.ready.is_empty()
    }

    /// Number of sockets still negotiating the handshake.
    #[must_use]
    pub fn handshaking(&self) -> usize {
        self.handshaking.len()
    }

    /// Number of upgraded sockets waiting to be claimed.
    #[must_use]
    pub fn ready(&self) -> usize {
        self.ready.len()
    }

    /// Take the oldest upgraded socket as a [`Connection`] that reports each
    /// decoded frame to `on_receive`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoPendingConnection`] if nothing is waiting; check
    /// [`pending`](Listener::pending) first.
    pub fn claim<F>(&mut self, on_receive: F) -> Result<Connection<TcpStream>>
    where
        F: FnMut(Packet, &mut Connection<TcpStream>) + 'static,
    {
        let stream = self.ready.pop_front().ok_or(Error::NoPendingConnection)?;
        let conn = Connection::from_stream(stream, &self.config, Box::new(on_receive));
        log_event!(
            self.config.logger,
            DEBUG,
            "{} claimed for {}",
            conn.id(),
            describe(conn.peer_addr())
        );
        Ok(conn)
    }
}
