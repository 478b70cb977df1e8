//! Loopback listener driven on the test thread.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::thread;
use std::time::{Duration, Instant};

use pollws::{Config, Connection, Listener, Logger, Transport};

const DEADLINE: Duration = Duration::from_secs(2);

/// A [`Listener`] bound to an ephemeral localhost port.
pub struct TestServer {
    pub listener: Listener,
}

impl TestServer {
    pub fn spawn() -> (Self, SocketAddr) {
        Self::spawn_with(Config::new().with_logger(Logger::discard()))
    }

    pub fn spawn_with(config: Config) -> (Self, SocketAddr) {
        let config = config.with_bind_addr(IpAddr::V4(Ipv4Addr::LOCALHOST));
        let listener = Listener::start_with(0, config).expect("bind loopback listener");
        let addr = listener.local_addr().expect("local addr");
        (Self { listener }, addr)
    }

    /// One tick of the accept and handshake passes.
    pub fn tick(&mut self) {
        self.listener.poll_accept();
        self.listener.poll_handshake();
    }

    /// Tick until `done` holds or the deadline passes.
    pub fn tick_until(&mut self, mut done: impl FnMut(&Listener) -> bool) -> bool {
        let start = Instant::now();
        loop {
            self.tick();
            if done(&self.listener) {
                return true;
            }
            if start.elapsed() > DEADLINE {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }
}

/// Poll `conn` until `done` holds or the deadline passes.
pub fn poll_until<T: Transport>(conn: &mut Connection<T>, mut done: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    loop {
        conn.poll();
        if done() {
            return true;
        }
        if start.elapsed() > DEADLINE {
            return false;
        }
        thread::sleep(Duration::from_millis(1));
    }
}
