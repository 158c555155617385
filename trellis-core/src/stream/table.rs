//! Stream table and flow-control operations

use crate::device::DeviceId;
use crate::error::{DeviceError, StreamError};
use crate::event::{EventKind, EventQueue};

use super::{notify, Flow, Shutdown, Signals, Stream, StreamId, StreamState, MAX_STREAMS};

/// Fixed pool of streams
pub struct StreamTable {
    streams: [Option<Stream>; MAX_STREAMS],
}

impl Default for StreamTable {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            streams: core::array::from_fn(|_| None),
        }
    }

    /// Materialize a stream for `owner`
    pub fn allocate(
        &mut self,
        owner: DeviceId,
        capacity: usize,
        drain_threshold: usize,
    ) -> Result<StreamId, DeviceError> {
        let (index, slot) = self
            .streams
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.is_none())
            .ok_or(DeviceError::ResourceExhausted)?;
        *slot = Some(Stream::new(owner, capacity, drain_threshold));
        Ok(StreamId(index as u8))
    }

    /// Detach from any pipe and free the stream's buffers
    pub fn release(&mut self, id: StreamId, events: &EventQueue) {
        self.reset(id, events);
        if let Some(slot) = self.streams.get_mut(id.0 as usize) {
            *slot = None;
        }
    }

    /// Detach from any pipe and return to the just-materialized state
    pub fn reset(&mut self, id: StreamId, events: &EventQueue) {
        let _ = self.unpipe(id, events);
        if let Ok(stream) = self.stream_mut(id) {
            stream.clear();
        }
    }

    /// Device owning the stream
    pub fn owner(&self, id: StreamId) -> Option<DeviceId> {
        self.stream(id).ok().map(|s| s.owner)
    }

    /// Snapshot of the stream's state
    pub fn state(&self, id: StreamId) -> Option<StreamState> {
        self.stream(id).ok().map(Stream::state)
    }

    /// Number of materialized streams
    pub fn len(&self) -> usize {
        self.streams.iter().flatten().count()
    }

    /// Check if no stream is materialized
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn stream(&self, id: StreamId) -> Result<&Stream, StreamError> {
        self.streams
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .ok_or(StreamError::Closed)
    }

    fn stream_mut(&mut self, id: StreamId) -> Result<&mut Stream, StreamError> {
        self.streams
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(StreamError::Closed)
    }

    fn pair_mut(
        &mut self,
        a: StreamId,
        b: StreamId,
    ) -> Result<(&mut Stream, &mut Stream), StreamError> {
        let (a, b) = (a.0 as usize, b.0 as usize);
        if a == b {
            return Err(StreamError::SelfPipe);
        }
        if a >= MAX_STREAMS || b >= MAX_STREAMS {
            return Err(StreamError::Closed);
        }
        let (first, second) = if a < b {
            let (low, high) = self.streams.split_at_mut(b);
            (&mut low[a], &mut high[0])
        } else {
            let (low, high) = self.streams.split_at_mut(a);
            (&mut high[0], &mut low[b])
        };
        match (first.as_mut(), second.as_mut()) {
            (Some(first), Some(second)) => Ok((first, second)),
            _ => Err(StreamError::Closed),
        }
    }

    /// Read exactly `n` buffered bytes into `out`, or nothing
    ///
    /// The first read moves an idle stream to `Paused`. When fewer than `n`
    /// bytes are buffered the call returns 0 and asks the driver for the
    /// shortfall; a `Data` event fires once enough has arrived. Reading a
    /// stream that is piped elsewhere is refused, a pipe is already driving
    /// it.
    pub fn read(
        &mut self,
        id: StreamId,
        n: usize,
        out: &mut [u8],
        events: &EventQueue,
    ) -> Result<usize, StreamError> {
        let stream = self.stream_mut(id)?;
        if stream.consumer.is_some() {
            return Err(StreamError::Piped);
        }
        let n = n.min(out.len()).min(stream.capacity);
        if n == 0 {
            return Ok(0);
        }
        if stream.flow == Flow::Idle {
            stream.flow = Flow::Paused;
        }

        if stream.rx.len() >= n || stream.rx_shutdown {
            // After shutdown nothing more will arrive; hand over the tail
            stream.rx_wanted = 0;
            let taken = stream.take_rx(&mut out[..n]);
            stream.rx_consumed(taken, events);
            return Ok(taken);
        }

        stream.rx_wanted = n;
        if !stream.rx_blocked {
            let shortfall = n - stream.rx.len();
            stream.request_rx(shortfall);
        }
        Ok(0)
    }

    /// Take every buffered received byte, for `Data` delivery
    pub fn drain_rx(&mut self, id: StreamId, out: &mut [u8], events: &EventQueue) -> usize {
        let Ok(stream) = self.stream_mut(id) else {
            return 0;
        };
        let taken = stream.take_rx(out);
        if stream.rx.is_empty() {
            stream.rx_wanted = 0;
        }
        stream.rx_consumed(taken, events);
        taken
    }

    /// Queue bytes for transmission
    ///
    /// Accepts up to the free transmit capacity. A short write marks the
    /// stream `tx_blocked`; a `Drain` event follows once the driver has
    /// emptied the buffer.
    pub fn write(&mut self, id: StreamId, data: &[u8]) -> Result<usize, StreamError> {
        let stream = self.stream_mut(id)?;
        if stream.tx_shutdown {
            return Err(StreamError::Closed);
        }
        let was_empty = stream.tx.is_empty();
        let accepted = stream.append_tx(data);
        if accepted < data.len() {
            stream.tx_blocked = true;
            stream.signals.tx = true;
        } else if was_empty && accepted > 0 {
            stream.signals.tx = true;
        }
        Ok(accepted)
    }

    /// Deliver received bytes from the driver
    ///
    /// Refused while the receive side is shut down or blocked. A piped
    /// producer forwards straight into its consumer's transmit buffer and
    /// never touches its own receive buffer. Filling the destination sets
    /// the blocking flags that stop further pushes.
    pub fn push(
        &mut self,
        id: StreamId,
        data: &[u8],
        events: &EventQueue,
    ) -> Result<usize, StreamError> {
        let stream = self.stream(id)?;
        if stream.rx_shutdown {
            return Err(StreamError::Closed);
        }
        if stream.rx_blocked {
            return Err(StreamError::Blocked);
        }
        if data.is_empty() {
            return Ok(0);
        }

        match (stream.consumer, stream.flow) {
            (Some(consumer), Flow::Flowing) => {
                let (producer, consumer) = self.pair_mut(id, consumer)?;
                if consumer.tx_shutdown {
                    return Err(StreamError::Closed);
                }
                let was_empty = consumer.tx.is_empty();
                let accepted = consumer.append_tx(data);
                producer.rx_outstanding = producer.rx_outstanding.saturating_sub(accepted);
                if was_empty && accepted > 0 {
                    consumer.signals.tx = true;
                }
                if consumer.tx_free() == 0 {
                    consumer.tx_blocked = true;
                    producer.rx_blocked = true;
                }
                Ok(accepted)
            }
            _ => {
                let stream = self.stream_mut(id)?;
                let was_empty = stream.rx.is_empty();
                let accepted = stream.append_rx(data);
                if accepted > 0 {
                    if stream.flow == Flow::Flowing {
                        if was_empty {
                            notify(events, stream.owner, EventKind::Data);
                        }
                    } else if stream.rx_wanted > 0 && stream.rx.len() >= stream.rx_wanted {
                        stream.rx_wanted = 0;
                        notify(events, stream.owner, EventKind::Data);
                    }
                }
                if stream.rx_free() == 0 {
                    stream.rx_blocked = true;
                }
                Ok(accepted)
            }
        }
    }

    /// Withdraw up to `n` bytes from the transmit buffer for the driver
    ///
    /// Once the buffer falls to the drain threshold a blocked writer is
    /// released: an upstream producer gets its receive side unblocked and
    /// a fresh request, otherwise a `Drain` event fires.
    pub fn pull(&mut self, id: StreamId, n: usize, out: &mut [u8], events: &EventQueue) -> usize {
        let Ok(stream) = self.stream_mut(id) else {
            return 0;
        };
        let n = n.min(out.len());
        let taken = stream.take_tx(&mut out[..n]);
        if taken == 0 {
            return 0;
        }

        let mut wake_producer = None;
        if stream.tx_blocked && stream.tx.len() <= stream.drain_threshold {
            stream.tx_blocked = false;
            match stream.producer {
                Some(producer) => wake_producer = Some((producer, stream.tx_free())),
                None => notify(events, stream.owner, EventKind::Drain),
            }
        }
        stream.check_finish(events);

        if let Some((producer, free)) = wake_producer {
            if let Ok(producer) = self.stream_mut(producer) {
                producer.rx_blocked = false;
                producer.request_rx(free);
            }
        }
        taken
    }

    /// Copy pending transmit bytes without removing them
    pub fn peek_tx(&self, id: StreamId, out: &mut [u8]) -> usize {
        let Ok(stream) = self.stream(id) else {
            return 0;
        };
        let mut copied = 0;
        for (slot, byte) in out.iter_mut().zip(stream.tx.iter()) {
            *slot = *byte;
            copied += 1;
        }
        copied
    }

    /// Bytes the driver should deliver next
    pub fn rx_demand(&self, id: StreamId) -> usize {
        let Ok(stream) = self.stream(id) else {
            return 0;
        };
        if stream.rx_shutdown || stream.rx_blocked {
            return 0;
        }
        match (stream.consumer, stream.flow) {
            (Some(consumer), Flow::Flowing) => self
                .stream(consumer)
                .map(|c| if c.tx_shutdown { 0 } else { c.tx_free() })
                .unwrap_or(0),
            (_, Flow::Flowing) => stream.rx_free(),
            _ => stream.rx_outstanding.min(stream.rx_free()),
        }
    }

    /// Link `producer`'s received data to `consumer`'s transmit buffer
    ///
    /// Anything already buffered on the producer is handed over first, then
    /// a receive request sized to the consumer's free space is primed.
    pub fn pipe(&mut self, producer: StreamId, consumer: StreamId) -> Result<(), StreamError> {
        let (producer_id, consumer_id) = (producer, consumer);
        let (producer, consumer) = self.pair_mut(producer_id, consumer_id)?;
        // A stream takes part in at most one pipe, on either side
        if producer.producer.is_some()
            || producer.consumer.is_some()
            || consumer.producer.is_some()
            || consumer.consumer.is_some()
        {
            return Err(StreamError::AlreadyPiped);
        }
        if producer.rx_shutdown || consumer.tx_shutdown {
            return Err(StreamError::Closed);
        }

        producer.consumer = Some(consumer_id);
        consumer.producer = Some(producer_id);
        producer.flow = Flow::Flowing;
        producer.rx_wanted = 0;

        let was_empty = consumer.tx.is_empty();
        while consumer.tx_free() > 0 {
            match producer.rx.pop_front() {
                Some(byte) => {
                    let _ = consumer.tx.push_back(byte);
                }
                None => break,
            }
        }
        if was_empty && !consumer.tx.is_empty() {
            consumer.signals.tx = true;
        }

        if consumer.tx_free() == 0 {
            consumer.tx_blocked = true;
            producer.rx_blocked = true;
        } else {
            producer.rx_blocked = false;
            producer.request_rx(consumer.tx_free());
        }
        debug!("piped stream {} into {}", producer_id, consumer_id);
        Ok(())
    }

    /// Detach the pipe `id` takes part in
    ///
    /// The producer drops back to `Paused` and the former consumer gets an
    /// `Unpipe` event.
    pub fn unpipe(&mut self, id: StreamId, events: &EventQueue) -> Result<(), StreamError> {
        let stream = self.stream(id)?;
        let (producer_id, consumer_id) = match (stream.consumer, stream.producer) {
            (Some(consumer), None) => (id, consumer),
            (None, Some(producer)) => (producer, id),
            _ => return Err(StreamError::NotPiped),
        };
        let (producer, consumer) = self.pair_mut(producer_id, consumer_id)?;
        producer.consumer = None;
        consumer.producer = None;
        producer.flow = Flow::Paused;
        producer.rx_outstanding = 0;
        producer.rx_blocked = producer.rx_free() == 0;
        notify(events, consumer.owner, EventKind::Unpipe);
        debug!("unpiped stream {} from {}", producer_id, consumer_id);
        Ok(())
    }

    /// Switch to `Flowing`: every arrival is announced with a `Data` event
    pub fn resume(&mut self, id: StreamId, events: &EventQueue) -> Result<(), StreamError> {
        let stream = self.stream_mut(id)?;
        if stream.consumer.is_some() {
            return Err(StreamError::Piped);
        }
        stream.flow = Flow::Flowing;
        stream.rx_wanted = 0;
        if !stream.rx.is_empty() {
            notify(events, stream.owner, EventKind::Data);
        }
        if !stream.rx_blocked && !stream.rx_shutdown {
            let free = stream.rx_free();
            stream.request_rx(free);
        }
        Ok(())
    }

    /// Leave `Flowing`; data is buffered until read
    pub fn pause(&mut self, id: StreamId) -> Result<(), StreamError> {
        let stream = self.stream_mut(id)?;
        if stream.consumer.is_some() {
            return Err(StreamError::Piped);
        }
        if stream.flow == Flow::Flowing {
            stream.flow = Flow::Paused;
        }
        Ok(())
    }

    /// Permanently close one or both directions
    ///
    /// `End` fires once the receive buffer is empty, `Finish` once the
    /// transmit buffer has drained. Each fires at most once.
    pub fn shutdown(
        &mut self,
        id: StreamId,
        how: Shutdown,
        events: &EventQueue,
    ) -> Result<(), StreamError> {
        let stream = self.stream_mut(id)?;
        if how.read() && !stream.rx_shutdown {
            stream.rx_shutdown = true;
            stream.rx_outstanding = 0;
            stream.rx_wanted = 0;
            stream.check_end(events);
        }
        if how.write() && !stream.tx_shutdown {
            stream.tx_shutdown = true;
            stream.check_finish(events);
        }
        Ok(())
    }

    /// Take the requests latched on every stream since the last call
    pub fn take_signals(&mut self, mut deliver: impl FnMut(DeviceId, Signals)) {
        for stream in self.streams.iter_mut().flatten() {
            let signals = core::mem::take(&mut stream.signals);
            if !signals.is_empty() {
                deliver(stream.owner, signals);
            }
        }
    }
}
