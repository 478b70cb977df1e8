//! Tick-loop WebSocket echo server.
//!
//! Run with: `cargo run --example echo_server -- 9001`
//! Set `RUST_LOG=pollws=debug` to watch handshakes and frames.

use std::thread;
use std::time::Duration;

use pollws::{Connection, Listener, Packet};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_PORT: u16 = 9001;
const TICK: Duration = Duration::from_millis(5);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "pollws=info".into()))
        .with(fmt::layer())
        .init();

    let port = match std::env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => DEFAULT_PORT,
    };

    let mut listener = Listener::start(port)?;
    tracing::info!("echo server listening on {}", listener.local_addr()?);

    let mut connections: Vec<Connection<_>> = Vec::new();
    loop {
        listener.poll_accept();
        listener.poll_handshake();

        while listener.pending() {
            let mut conn = listener.claim(|packet: Packet, conn| {
                match packet.as_str() {
                    Ok(text) => tracing::info!("{} says {:?}", conn.id(), text),
                    Err(_) => tracing::info!("{} sent {} bytes", conn.id(), packet.len()),
                }
                if let Err(e) = conn.send(&packet) {
                    tracing::warn!("echo to {} failed: {}", conn.id(), e);
                }
            })?;
            conn.on_disconnect(|conn| tracing::info!("{} left", conn.id()));
            connections.push(conn);
        }

        for conn in &mut connections {
            conn.poll();
        }
        connections.retain(Connection::is_connected);

        thread::sleep(TICK);
    }
}
