//! WebSocket wire protocol pieces (RFC 6455 subset).

pub mod frame;
pub mod handshake;
pub mod mask;
pub mod opcode;

pub use frame::{HeaderStart, PayloadLength, encode_masked, encode_text};
pub use handshake::{HandshakeRequest, HandshakeResponse, WS_GUID, compute_accept_key};
pub use mask::apply_mask;
pub use opcode::OpCode;
