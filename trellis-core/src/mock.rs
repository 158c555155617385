//! Mock drivers for unit tests
//!
//! Both mocks count every lifecycle call and keep their "hardware" state in
//! cells, so tests can script faults and inspect what the core asked for.

use core::cell::{Cell, RefCell};

use heapless::{Deque, Vec};

use crate::config::schema::{ConfigValues, SlotValue};
use crate::driver::{DeviceDriver, MapDriver, StreamDriver, StreamRequest};
use crate::error::DeviceError;
use crate::runtime::DeviceIo;

pub const MOCK_MAP_SIZE: usize = 4;

/// Map driver with four integer registers
pub struct MockMap {
    pub values: RefCell<[i32; MOCK_MAP_SIZE]>,
    pub acquires: Cell<u32>,
    pub releases: Cell<u32>,
    pub resets: Cell<u32>,
    pub polls: Cell<u32>,
    pub committed: RefCell<Vec<(usize, SlotValue), 32>>,
    /// Slot index whose commit fails
    pub fail_commit: Cell<Option<usize>>,
    /// Refuse `acquire`
    pub fail_acquire: Cell<bool>,
    /// Fault raised on the next poll
    pub fault: Cell<Option<u16>>,
    /// Value `read_config` reports for slot 1, if supported
    pub readback: Cell<Option<i32>>,
}

impl MockMap {
    pub fn new() -> Self {
        Self {
            values: RefCell::new([0; MOCK_MAP_SIZE]),
            acquires: Cell::new(0),
            releases: Cell::new(0),
            resets: Cell::new(0),
            polls: Cell::new(0),
            committed: RefCell::new(Vec::new()),
            fail_commit: Cell::new(None),
            fail_acquire: Cell::new(false),
            fault: Cell::new(None),
            readback: Cell::new(None),
        }
    }
}

impl DeviceDriver for MockMap {
    fn acquire(&self, _instance: u8) -> Result<(), DeviceError> {
        if self.fail_acquire.get() {
            return Err(DeviceError::HardwareError(99));
        }
        self.acquires.set(self.acquires.get() + 1);
        Ok(())
    }

    fn release(&self, _instance: u8) {
        self.releases.set(self.releases.get() + 1);
    }

    fn reset(&self, _instance: u8) {
        self.resets.set(self.resets.get() + 1);
    }

    fn commit(&self, _instance: u8, slot: usize, value: &SlotValue) -> Result<(), DeviceError> {
        if self.fail_commit.get() == Some(slot) {
            return Err(DeviceError::HardwareError(7));
        }
        let _ = self.committed.borrow_mut().push((slot, value.clone()));
        Ok(())
    }

    fn poll(&self, io: &mut DeviceIo<'_>) {
        self.polls.set(self.polls.get() + 1);
        if let Some(code) = self.fault.take() {
            io.raise_error(code);
        }
    }
}

impl MapDriver for MockMap {
    fn get(&self, _instance: u8, offset: usize) -> Option<i32> {
        self.values.borrow().get(offset).copied()
    }

    fn set(&self, _instance: u8, offset: usize, value: i32) -> bool {
        match self.values.borrow_mut().get_mut(offset) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    fn size(&self, _instance: u8) -> usize {
        MOCK_MAP_SIZE
    }

    fn read_config(&self, _instance: u8, values: &mut ConfigValues) -> Result<(), DeviceError> {
        let readback = self.readback.get().ok_or(DeviceError::NotImplemented)?;
        if let Some(slot) = values.get_mut(1) {
            *slot = SlotValue::Int(readback);
        }
        Ok(())
    }
}

/// Stream driver backed by an incoming byte queue and an outgoing log
pub struct MockStream {
    pub incoming: RefCell<Deque<u8, 64>>,
    pub sent: RefCell<Vec<u8, 256>>,
    /// Bytes `send` accepts per call
    pub send_limit: Cell<usize>,
    pub receive_requests: Cell<u32>,
    pub last_receive: Cell<Option<usize>>,
    pub transmit_requests: Cell<u32>,
    pub resets: Cell<u32>,
    pub releases: Cell<u32>,
}

impl MockStream {
    pub fn new() -> Self {
        Self {
            incoming: RefCell::new(Deque::new()),
            sent: RefCell::new(Vec::new()),
            send_limit: Cell::new(usize::MAX),
            receive_requests: Cell::new(0),
            last_receive: Cell::new(None),
            transmit_requests: Cell::new(0),
            resets: Cell::new(0),
            releases: Cell::new(0),
        }
    }

    /// Simulate bytes arriving on the wire
    pub fn feed(&self, data: &[u8]) {
        let mut incoming = self.incoming.borrow_mut();
        for &byte in data {
            let _ = incoming.push_back(byte);
        }
    }
}

impl DeviceDriver for MockStream {
    fn release(&self, _instance: u8) {
        self.releases.set(self.releases.get() + 1);
    }

    fn reset(&self, _instance: u8) {
        self.resets.set(self.resets.get() + 1);
        self.incoming.borrow_mut().clear();
    }

    fn commit(&self, _instance: u8, _slot: usize, _value: &SlotValue) -> Result<(), DeviceError> {
        Ok(())
    }
}

impl StreamDriver for MockStream {
    fn send(&self, _instance: u8, data: &[u8]) -> usize {
        let accepted = data.len().min(self.send_limit.get());
        let mut sent = self.sent.borrow_mut();
        let _ = sent.extend_from_slice(&data[..accepted]);
        accepted
    }

    fn recv(&self, _instance: u8, buf: &mut [u8]) -> usize {
        let mut incoming = self.incoming.borrow_mut();
        let mut count = 0;
        for slot in buf.iter_mut() {
            match incoming.pop_front() {
                Some(byte) => {
                    *slot = byte;
                    count += 1;
                }
                None => break,
            }
        }
        count
    }

    fn received(&self, _instance: u8) -> usize {
        self.incoming.borrow().len()
    }

    fn request(&self, _instance: u8, request: StreamRequest) {
        match request {
            StreamRequest::Receive(bytes) => {
                self.receive_requests.set(self.receive_requests.get() + 1);
                self.last_receive.set(Some(bytes));
            }
            StreamRequest::Transmit => {
                self.transmit_requests.set(self.transmit_requests.get() + 1);
            }
        }
    }
}
