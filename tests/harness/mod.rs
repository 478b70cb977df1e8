//! Shared utilities for integration tests.
//!
//! In-memory transports and frame builders for driving a [`Connection`]
//! byte by byte, plus a loopback client and server for listener tests.
//!
//! [`Connection`]: pollws::Connection

#![allow(dead_code, unused_imports)]

mod client;
mod metrics;
mod mock;
mod server;

pub use client::{
    TestClient, client_frame, client_frame_with, declared_length_frame, decode_server_frame,
    unmasked_frame,
};
pub use metrics::{CapturingSink, Recorder};
pub use mock::MockTransport;
pub use server::{TestServer, poll_until};
