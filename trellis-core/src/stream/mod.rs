//! Stream engine
//!
//! Buffered, flow-controlled byte transport for Stream-category devices.
//! Each stream owns a receive buffer (filled by the driver through `push`,
//! emptied by the reader) and a transmit buffer (filled by the writer,
//! emptied by the driver through `pull`).
//!
//! Nothing here waits. Every operation moves what it can, returns the
//! count, and reports the rest of the story later through events:
//!
//! ```text
//!   driver ──push──► rx ──read / Data event──► script
//!   script ──write─► tx ──pull──► driver          (Drain when tx empties)
//!
//!   piped:  producer driver ──push──► consumer tx ──pull──► consumer driver
//! ```
//!
//! Requests toward drivers are latched on the stream as signals and
//! delivered by the runtime after each operation, so the engine never
//! calls into a driver itself.

mod table;

pub use table::StreamTable;

use heapless::Deque;

use crate::device::DeviceId;
use crate::event::{Event, EventKind, EventQueue};

/// Maximum streams materialized at once
pub const MAX_STREAMS: usize = 4;

/// Capacity of every rx/tx buffer in the pool
///
/// Device types declare a smaller logical capacity through their
/// descriptor.
pub const STREAM_BUFFER_SIZE: usize = 256;

/// Index of a stream in the stream table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StreamId(pub(crate) u8);

/// Who drives the receive side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Flow {
    /// Nothing has asked for data yet
    Idle,
    /// Data moves only when the reader calls `read`
    Paused,
    /// Data is delivered as it arrives (listener or pipe)
    Flowing,
}

/// Which direction to shut down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Shutdown {
    /// Receive side
    Read,
    /// Transmit side
    Write,
    /// Both sides
    Both,
}

impl Shutdown {
    fn read(self) -> bool {
        matches!(self, Shutdown::Read | Shutdown::Both)
    }

    fn write(self) -> bool {
        matches!(self, Shutdown::Write | Shutdown::Both)
    }
}

/// Requests latched for the owning driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Signals {
    /// Receive request for this many bytes
    pub rx: Option<usize>,
    /// Transmit buffer has data to send
    pub tx: bool,
}

impl Signals {
    /// Check if anything is pending
    pub fn is_empty(&self) -> bool {
        self.rx.is_none() && !self.tx
    }
}

/// Snapshot of a stream's state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StreamState {
    /// Flow mode
    pub flow: Flow,
    /// Logical buffer capacity
    pub capacity: usize,
    /// Bytes waiting in the receive buffer
    pub rx_len: usize,
    /// Bytes waiting in the transmit buffer
    pub tx_len: usize,
    /// Receive side refuses pushes until a reader frees space
    pub rx_blocked: bool,
    /// Writer overflowed the transmit buffer
    pub tx_blocked: bool,
    /// Receive side shut down
    pub rx_shutdown: bool,
    /// Transmit side shut down
    pub tx_shutdown: bool,
    /// Upstream stream feeding our transmit buffer
    pub producer: Option<StreamId>,
    /// Downstream stream our received data goes to
    pub consumer: Option<StreamId>,
    /// Receive requests issued so far
    pub rx_requests: u32,
}

struct Stream {
    owner: DeviceId,
    capacity: usize,
    drain_threshold: usize,
    rx: Deque<u8, STREAM_BUFFER_SIZE>,
    tx: Deque<u8, STREAM_BUFFER_SIZE>,
    flow: Flow,
    rx_blocked: bool,
    tx_blocked: bool,
    rx_shutdown: bool,
    tx_shutdown: bool,
    ended: bool,
    finished: bool,
    producer: Option<StreamId>,
    consumer: Option<StreamId>,
    /// Bytes asked of the driver and not yet pushed
    rx_outstanding: usize,
    /// Size of the read that is waiting for data
    rx_wanted: usize,
    signals: Signals,
    rx_requests: u32,
}

impl Stream {
    fn new(owner: DeviceId, capacity: usize, drain_threshold: usize) -> Self {
        Self {
            owner,
            capacity: capacity.min(STREAM_BUFFER_SIZE),
            drain_threshold,
            rx: Deque::new(),
            tx: Deque::new(),
            flow: Flow::Idle,
            rx_blocked: false,
            tx_blocked: false,
            rx_shutdown: false,
            tx_shutdown: false,
            ended: false,
            finished: false,
            producer: None,
            consumer: None,
            rx_outstanding: 0,
            rx_wanted: 0,
            signals: Signals::default(),
            rx_requests: 0,
        }
    }

    /// Back to the just-materialized state, keeping owner and sizing
    fn clear(&mut self) {
        *self = Self::new(self.owner, self.capacity, self.drain_threshold);
    }

    fn rx_free(&self) -> usize {
        self.capacity.saturating_sub(self.rx.len())
    }

    fn tx_free(&self) -> usize {
        self.capacity.saturating_sub(self.tx.len())
    }

    fn request_rx(&mut self, bytes: usize) {
        self.rx_outstanding = bytes;
        self.signals.rx = Some(bytes);
        self.rx_requests = self.rx_requests.wrapping_add(1);
    }

    fn append_rx(&mut self, data: &[u8]) -> usize {
        let accepted = data.len().min(self.rx_free());
        for &byte in &data[..accepted] {
            // Capacity checked above; the logical capacity never exceeds the deque's
            let _ = self.rx.push_back(byte);
        }
        self.rx_outstanding = self.rx_outstanding.saturating_sub(accepted);
        accepted
    }

    fn append_tx(&mut self, data: &[u8]) -> usize {
        let accepted = data.len().min(self.tx_free());
        for &byte in &data[..accepted] {
            let _ = self.tx.push_back(byte);
        }
        accepted
    }

    fn take_rx(&mut self, out: &mut [u8]) -> usize {
        take(&mut self.rx, out)
    }

    fn take_tx(&mut self, out: &mut [u8]) -> usize {
        take(&mut self.tx, out)
    }

    /// Bookkeeping after a reader removed `taken` bytes
    fn rx_consumed(&mut self, taken: usize, events: &EventQueue) {
        if taken > 0 && self.rx_blocked && self.consumer.is_none() && self.rx_free() > 0 {
            self.rx_blocked = false;
            let free = self.rx_free();
            self.request_rx(free);
        }
        self.check_end(events);
    }

    fn check_end(&mut self, events: &EventQueue) {
        if self.rx_shutdown && self.rx.is_empty() && !self.ended {
            self.ended = true;
            notify(events, self.owner, EventKind::End);
        }
    }

    fn check_finish(&mut self, events: &EventQueue) {
        if self.tx_shutdown && self.tx.is_empty() && !self.finished {
            self.finished = true;
            notify(events, self.owner, EventKind::Finish);
        }
    }

    fn state(&self) -> StreamState {
        StreamState {
            flow: self.flow,
            capacity: self.capacity,
            rx_len: self.rx.len(),
            tx_len: self.tx.len(),
            rx_blocked: self.rx_blocked,
            tx_blocked: self.tx_blocked,
            rx_shutdown: self.rx_shutdown,
            tx_shutdown: self.tx_shutdown,
            producer: self.producer,
            consumer: self.consumer,
            rx_requests: self.rx_requests,
        }
    }
}

fn take(buf: &mut Deque<u8, STREAM_BUFFER_SIZE>, out: &mut [u8]) -> usize {
    let mut taken = 0;
    for slot in out.iter_mut() {
        match buf.pop_front() {
            Some(byte) => {
                *slot = byte;
                taken += 1;
            }
            None => break,
        }
    }
    taken
}

fn notify(events: &EventQueue, owner: DeviceId, kind: EventKind) {
    trace!("stream event {} for slot {}", kind, owner.slot);
    events.post(Event::new(kind, owner, 0));
}
