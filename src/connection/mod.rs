//! Upgraded connections and their inbound frame state machine.
//!
//! ## Read state machine
//!
//! ```text
//!            2 bytes                 2 or 8 bytes
//! HeaderStart ──────► ExtendedHeader ────────────► Body ──┐
//!      │  len < 126                                  ▲    │ len + 4 bytes
//!      └─────────────────────────────────────────────┘    │ (deliver packet)
//!      ▲                                                  │
//!      └──────────────────────────────────────────────────┘
//! ```
//!
//! Each transition runs only once its byte count is already buffered, so the
//! machine never blocks. An unmasked frame or an over-cap length closes the
//! connection.

mod state;
pub mod stream;

pub use state::{ConnectionStatus, ReadState};
pub use stream::{Stream, Transport};

#[allow(clippy::module_inception)]
mod connection;

pub use connection::{Connection, ConnectionId, DisconnectCallback, ReceiveCallback};
