//! # pollws - a minimal polling WebSocket server engine
//!
//! `pollws` implements the server side of a subset of RFC 6455 directly over
//! non-blocking TCP sockets. Nothing in it blocks or spawns threads: the host
//! application's tick loop drives everything.
//!
//! ## Features
//!
//! - **Opening handshake** recognised incrementally, with header size and
//!   time limits
//! - **Frame decoding** as a state machine that tolerates arbitrary chunking
//! - **Masking enforcement** for client frames and a hard frame size cap
//! - **Injected diagnostics** through [`LogSink`], `tracing` by default
//!
//! Not supported: fragmentation, ping/pong/close handling, extensions,
//! subprotocols, TLS.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pollws::{Listener, Packet};
//!
//! # fn main() -> pollws::Result<()> {
//! let mut listener = Listener::start(8080)?;
//! let mut connections = Vec::new();
//! loop {
//!     listener.poll_accept();
//!     listener.poll_handshake();
//!     while listener.pending() {
//!         connections.push(listener.claim(|packet: Packet, conn| {
//!             let _ = conn.send(&packet);
//!         })?);
//!     }
//!     for conn in &mut connections {
//!         conn.poll();
//!     }
//!     connections.retain(|conn| conn.is_connected());
//!     # break;
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod listener;
pub mod logging;
pub mod packet;
pub mod protocol;

pub use config::{Config, Limits, MAX_FRAME_SIZE, Timeouts};
pub use connection::{Connection, ConnectionId, ConnectionStatus, ReadState, Transport};
pub use error::{Error, Result};
pub use listener::Listener;
pub use logging::{LogSink, Logger, TracingSink};
pub use packet::Packet;
pub use protocol::{OpCode, WS_GUID, compute_accept_key};
