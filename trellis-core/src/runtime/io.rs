//! Driver polling and the stream pump

use crate::device::DeviceId;
use crate::driver::{DriverRef, StreamDriver};
use crate::error::StreamError;
use crate::event::{Event, EventKind, EventQueue};
use crate::stream::{StreamId, StreamTable, STREAM_BUFFER_SIZE};

use super::Runtime;

/// What a driver may touch while it is being polled
///
/// Handed to [`DeviceDriver::poll`](crate::driver::DeviceDriver::poll) for
/// one enabled device at a time.
pub struct DeviceIo<'a> {
    device: DeviceId,
    instance: u8,
    error: &'a mut Option<u16>,
    events: &'a EventQueue,
    streams: &'a mut StreamTable,
    stream: Option<StreamId>,
}

impl DeviceIo<'_> {
    /// Handle of the device being polled
    pub fn device(&self) -> DeviceId {
        self.device
    }

    /// Hardware instance index
    pub fn instance(&self) -> u8 {
        self.instance
    }

    /// Record a hardware fault and raise an `Error` event
    pub fn raise_error(&mut self, code: u16) {
        warn!("hardware fault {} on slot {}", code, self.device.slot);
        *self.error = Some(code);
        self.events.post(Event::error(self.device, code));
    }

    /// Post an event for this device
    pub fn post(&self, kind: EventKind, code: u16) -> bool {
        self.events.post(Event::new(kind, self.device, code))
    }

    /// Deliver received bytes to the device's stream
    pub fn push(&mut self, data: &[u8]) -> Result<usize, StreamError> {
        let stream = self.stream.ok_or(StreamError::Closed)?;
        self.streams.push(stream, data, self.events)
    }

    /// Withdraw transmit bytes from the device's stream
    pub fn pull(&mut self, out: &mut [u8]) -> usize {
        match self.stream {
            Some(stream) => self.streams.pull(stream, out.len(), out, self.events),
            None => 0,
        }
    }

    /// Copy pending transmit bytes without withdrawing them
    pub fn tx_pending(&self, out: &mut [u8]) -> usize {
        self.stream
            .map(|stream| self.streams.peek_tx(stream, out))
            .unwrap_or(0)
    }

    /// How many received bytes the stream will take right now
    pub fn rx_demand(&self) -> usize {
        self.stream
            .map(|stream| self.streams.rx_demand(stream))
            .unwrap_or(0)
    }
}

impl Runtime<'_> {
    /// Poll every enabled device once and move stream data
    ///
    /// Each driver's `poll` runs first; stream devices then have up to
    /// `pump_chunk` bytes moved in each direction.
    pub fn poll(&mut self) {
        let chunk = usize::from(self.config.pump_chunk).clamp(1, STREAM_BUFFER_SIZE);
        for (id, device) in self.pool.iter_mut() {
            if !device.enabled {
                continue;
            }
            let driver = device.driver;
            let mut io = DeviceIo {
                device: id,
                instance: device.instance,
                error: &mut device.error,
                events: self.events,
                streams: &mut self.streams,
                stream: device.stream,
            };
            driver.poll(&mut io);
            if let DriverRef::Stream(driver) = driver {
                pump(driver, &mut io, chunk);
            }
        }
        self.flush_signals();
    }
}

/// Move bytes between a stream driver and its buffers
fn pump(driver: &dyn StreamDriver, io: &mut DeviceIo<'_>, chunk: usize) {
    let mut buf = [0u8; STREAM_BUFFER_SIZE];
    let instance = io.instance;

    let want = io.rx_demand().min(driver.received(instance)).min(chunk);
    if want > 0 {
        let got = driver.recv(instance, &mut buf[..want]);
        if got > 0 {
            match io.push(&buf[..got]) {
                Ok(accepted) if accepted < got => {
                    warn!("stream overrun, dropped {} bytes", got - accepted);
                }
                Ok(_) => {}
                Err(err) => warn!("stream refused {} bytes: {}", got, err),
            }
        }
    }

    let pending = io.tx_pending(&mut buf[..chunk]);
    if pending > 0 {
        let sent = driver.send(instance, &buf[..pending]).min(pending);
        if sent > 0 {
            io.pull(&mut buf[..sent]);
        }
    }
}
