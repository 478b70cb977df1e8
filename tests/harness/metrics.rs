//! Observers for what a connection reported to its owner.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use pollws::{Config, Connection, LogSink, Logger, Packet, Transport};
use tracing::Level;

/// Counts receive and disconnect callbacks for one connection.
#[derive(Clone, Default)]
pub struct Recorder {
    packets: Rc<RefCell<Vec<Packet>>>,
    disconnects: Rc<Cell<usize>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a connection over `io` wired to this recorder.
    pub fn connect<T: Transport + 'static>(&self, io: T, config: &Config) -> Connection<T> {
        let packets = Rc::clone(&self.packets);
        let mut conn = Connection::new(io, config, move |packet, _conn: &mut Connection<T>| {
            packets.borrow_mut().push(packet);
        });
        self.watch(&mut conn);
        conn
    }

    /// Count `conn`'s disconnect notification.
    pub fn watch<T: Transport + 'static>(&self, conn: &mut Connection<T>) {
        let disconnects = Rc::clone(&self.disconnects);
        conn.on_disconnect(move |_| disconnects.set(disconnects.get() + 1));
    }

    /// Record a packet from a hand-written receive callback.
    pub fn record(&self, packet: Packet) {
        self.packets.borrow_mut().push(packet);
    }

    pub fn packets(&self) -> Vec<Packet> {
        self.packets.borrow().clone()
    }

    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.packets
            .borrow()
            .iter()
            .map(|packet| packet.as_bytes().to_vec())
            .collect()
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.get()
    }
}

/// Log sink that keeps every record.
#[derive(Clone, Default)]
pub struct CapturingSink {
    records: Arc<Mutex<Vec<(Level, String)>>>,
}

impl CapturingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logger(&self) -> Logger {
        Logger::new(self.clone())
    }

    pub fn records(&self) -> Vec<(Level, String)> {
        self.records.lock().unwrap().clone()
    }

    /// Whether a record at `level` contains `needle`.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.records()
            .iter()
            .any(|(l, text)| *l == level && text.contains(needle))
    }
}

impl LogSink for CapturingSink {
    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        self.records.lock().unwrap().push((level, args.to_string()));
    }
}
