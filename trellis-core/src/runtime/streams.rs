//! Stream operations on device handles
//!
//! Every call resolves the handle to its stream, runs the engine operation
//! and then forwards the requests the engine latched to the drivers.

use crate::device::DeviceId;
use crate::driver::StreamRequest;
use crate::error::{DeviceError, StreamError};
use crate::stream::{Shutdown, StreamId, StreamState};

use super::Runtime;

impl<'d> Runtime<'d> {
    /// Read exactly `n` buffered bytes, or nothing
    ///
    /// Returns 0 when fewer than `n` bytes are buffered; the shortfall is
    /// requested from the driver and a `Data` event follows once it arrives.
    pub fn read(&mut self, id: DeviceId, n: usize, out: &mut [u8]) -> Result<usize, DeviceError> {
        let stream = self.stream_id(id)?;
        let result = self.streams.read(stream, n, out, self.events);
        self.finish_stream_op(id, result)
    }

    /// Queue bytes for transmission, returning how many were accepted
    pub fn write(&mut self, id: DeviceId, data: &[u8]) -> Result<usize, DeviceError> {
        let stream = self.stream_id(id)?;
        let result = self.streams.write(stream, data);
        self.finish_stream_op(id, result)
    }

    /// Deliver received bytes on behalf of a driver
    ///
    /// Drivers polled by the runtime use [`DeviceIo::push`](super::DeviceIo::push)
    /// instead; this entry point serves drivers fed from elsewhere.
    pub fn push(&mut self, id: DeviceId, data: &[u8]) -> Result<usize, DeviceError> {
        let stream = self.stream_id(id)?;
        let result = self.streams.push(stream, data, self.events);
        self.finish_stream_op(id, result)
    }

    /// Take up to `n` transmit bytes on behalf of a driver
    pub fn pull(&mut self, id: DeviceId, n: usize, out: &mut [u8]) -> Result<usize, DeviceError> {
        let stream = self.stream_id(id)?;
        let taken = self.streams.pull(stream, n, out, self.events);
        self.flush_signals();
        Ok(taken)
    }

    /// Forward everything `producer` receives into `consumer`'s transmit side
    pub fn pipe(&mut self, producer: DeviceId, consumer: DeviceId) -> Result<(), DeviceError> {
        let from = self.stream_id(producer)?;
        let to = self.stream_id(consumer)?;
        let result = self.streams.pipe(from, to);
        self.flush_signals();
        result?;
        debug!("piped slot {} into slot {}", producer.slot, consumer.slot);
        Ok(())
    }

    /// Detach the pipe this device takes part in
    pub fn unpipe(&mut self, id: DeviceId) -> Result<(), DeviceError> {
        let stream = self.stream_id(id)?;
        self.streams.unpipe(stream, self.events)?;
        Ok(())
    }

    /// Deliver received data as it arrives
    pub fn resume(&mut self, id: DeviceId) -> Result<(), DeviceError> {
        let stream = self.stream_id(id)?;
        let result = self.streams.resume(stream, self.events);
        self.flush_signals();
        Ok(result?)
    }

    /// Buffer received data until read
    pub fn pause(&mut self, id: DeviceId) -> Result<(), DeviceError> {
        let stream = self.stream_id(id)?;
        Ok(self.streams.pause(stream)?)
    }

    /// Permanently close one or both directions
    pub fn shutdown(&mut self, id: DeviceId, how: Shutdown) -> Result<(), DeviceError> {
        let stream = self.stream_id(id)?;
        Ok(self.streams.shutdown(stream, how, self.events)?)
    }

    /// Snapshot of the device's stream
    pub fn stream_state(&self, id: DeviceId) -> Result<StreamState, DeviceError> {
        let stream = self.stream_id(id)?;
        self.streams
            .state(stream)
            .ok_or(DeviceError::NotEnabled)
    }

    /// Stream bound to an enabled Stream-category device
    pub(super) fn stream_id(&self, id: DeviceId) -> Result<StreamId, DeviceError> {
        let device = self.pool.get(id)?;
        if !device.enabled {
            return Err(DeviceError::NotEnabled);
        }
        device.driver.as_stream()?;
        device.stream.ok_or(DeviceError::NotEnabled)
    }

    fn finish_stream_op<T>(
        &mut self,
        id: DeviceId,
        result: Result<T, StreamError>,
    ) -> Result<T, DeviceError> {
        self.flush_signals();
        let value = result?;
        if let Ok(device) = self.pool.get_mut(id) {
            device.error = None;
        }
        Ok(value)
    }

    /// Forward latched receive/transmit requests to the stream drivers
    pub(super) fn flush_signals(&mut self) {
        let pool = &self.pool;
        self.streams.take_signals(|owner, signals| {
            let Ok(device) = pool.get(owner) else {
                return;
            };
            let Ok(driver) = device.driver.as_stream() else {
                return;
            };
            if let Some(bytes) = signals.rx {
                driver.request(device.instance, StreamRequest::Receive(bytes));
            }
            if signals.tx {
                driver.request(device.instance, StreamRequest::Transmit);
            }
        });
    }
}
