//! Hardware events
//!
//! Events are coarse notifications posted by drivers, interrupt handlers
//! and the stream engine. They carry no payload beyond a code; the
//! dispatcher builds listener arguments from live device state at the time
//! the event is taken off the queue.

pub mod queue;

pub use queue::{EventQueue, EVENT_QUEUE_SIZE};

use crate::device::DeviceId;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of event kinds a device can have listeners for
pub const MAX_EVENT_KINDS: usize = 7;

/// Event kinds
///
/// The numeric codes of `Error`, `Data`, `Drain` and `Ready` are fixed;
/// stream notifications follow them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum EventKind {
    /// Hardware fault recorded on the device
    Error = 0,
    /// New data available
    Data = 1,
    /// Transmit backpressure cleared
    Drain = 2,
    /// Reserved
    Ready = 3,
    /// Stream was detached from its producer
    Unpipe = 4,
    /// Transmit side shut down and fully drained
    Finish = 5,
    /// Receive side shut down and fully consumed
    End = 6,
}

impl EventKind {
    /// Parse an event kind from its code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(EventKind::Error),
            1 => Some(EventKind::Data),
            2 => Some(EventKind::Drain),
            3 => Some(EventKind::Ready),
            4 => Some(EventKind::Unpipe),
            5 => Some(EventKind::Finish),
            6 => Some(EventKind::End),
            _ => None,
        }
    }

    /// Numeric code
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Listener table index
    pub fn index(self) -> usize {
        self as usize
    }

    /// Check if this kind only exists for stream devices
    pub fn is_stream_notification(&self) -> bool {
        matches!(self, EventKind::Unpipe | EventKind::Finish | EventKind::End)
    }
}

/// A queued event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Event {
    /// What happened
    pub kind: EventKind,
    /// Device the event belongs to
    pub device: DeviceId,
    /// Kind-specific code (fault code for `Error`)
    pub code: u16,
}

impl Event {
    /// Create an event
    pub const fn new(kind: EventKind, device: DeviceId, code: u16) -> Self {
        Self { kind, device, code }
    }

    /// Create an error event
    pub const fn error(device: DeviceId, code: u16) -> Self {
        Self::new(EventKind::Error, device, code)
    }

    /// Create a data event
    pub const fn data(device: DeviceId) -> Self {
        Self::new(EventKind::Data, device, 0)
    }
}

#[cfg(feature = "serde")]
impl Event {
    /// Encode for transmission to a host, returning the used prefix of `buf`
    pub fn to_bytes<'b>(&self, buf: &'b mut [u8]) -> Result<&'b mut [u8], postcard::Error> {
        postcard::to_slice(self, buf)
    }

    /// Decode an event received from a peer
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}
