//! Driver capability traits
//!
//! Drivers are shared (`&self`) because one table serves every instance of
//! a type; per-instance hardware state lives behind interior mutability in
//! the driver, indexed by the `instance` argument.

use crate::config::schema::{ConfigValues, SlotValue};
use crate::error::DeviceError;
use crate::runtime::DeviceIo;

use super::descriptor::Category;

/// Lifecycle operations every driver supplies
pub trait DeviceDriver {
    /// Claim the hardware for an instance
    ///
    /// Called by `request`. A failure leaves the instance unallocated.
    fn acquire(&self, instance: u8) -> Result<(), DeviceError> {
        let _ = instance;
        Ok(())
    }

    /// Give the hardware back
    ///
    /// Called by `destroy` after any stream buffers were released.
    fn release(&self, instance: u8) {
        let _ = instance;
    }

    /// Abort any transfer and return the hardware to its idle state
    fn reset(&self, instance: u8);

    /// Apply one validated config slot to the hardware
    ///
    /// Called for every slot, in schema order, while enabling.
    fn commit(&self, instance: u8, slot: usize, value: &SlotValue) -> Result<(), DeviceError>;

    /// Service the hardware once per tick
    ///
    /// Drivers that need no polling keep the default.
    fn poll(&self, io: &mut DeviceIo<'_>) {
        let _ = io;
    }
}

/// Map data plane: a fixed set of integer values addressed by offset
pub trait MapDriver: DeviceDriver {
    /// Read the value at `offset`
    fn get(&self, instance: u8, offset: usize) -> Option<i32>;

    /// Write the value at `offset`
    ///
    /// Returns false if the offset does not exist or is read-only.
    fn set(&self, instance: u8, offset: usize, value: i32) -> bool;

    /// Number of addressable offsets
    fn size(&self, instance: u8) -> usize;

    /// Read the whole config back from hardware in one transaction
    ///
    /// `values` holds the cached config on entry; the driver overwrites the
    /// slots it reads.
    fn read_config(&self, instance: u8, values: &mut ConfigValues) -> Result<(), DeviceError> {
        let _ = (instance, values);
        Err(DeviceError::NotImplemented)
    }
}

/// Receive/transmit notification sent to a stream driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StreamRequest {
    /// The engine wants up to this many more received bytes
    Receive(usize),
    /// The transmit buffer has data waiting to be sent
    Transmit,
}

/// Stream data plane: byte transport moved by the runtime's pump
pub trait StreamDriver: DeviceDriver {
    /// Hand bytes to the hardware, returning how many it accepted
    fn send(&self, instance: u8, data: &[u8]) -> usize;

    /// Take received bytes from the hardware, returning the count copied
    fn recv(&self, instance: u8, buf: &mut [u8]) -> usize;

    /// Number of received bytes waiting in the hardware
    fn received(&self, instance: u8) -> usize;

    /// Engine asks for data movement
    ///
    /// Interrupt-driven drivers use this to arm a transfer; polled drivers
    /// can ignore it because the pump runs every tick anyway.
    fn request(&self, instance: u8, request: StreamRequest) {
        let _ = (instance, request);
    }
}

/// Block data plane (reserved)
pub trait BlockDriver: DeviceDriver {
    /// Read one block
    fn read_block(&self, instance: u8, block: u32, buf: &mut [u8]) -> Result<usize, DeviceError> {
        let _ = (instance, block, buf);
        Err(DeviceError::NotImplemented)
    }

    /// Write one block
    fn write_block(&self, instance: u8, block: u32, data: &[u8]) -> Result<usize, DeviceError> {
        let _ = (instance, block, data);
        Err(DeviceError::NotImplemented)
    }
}

/// A driver together with its data-plane category
#[derive(Clone, Copy)]
pub enum DriverRef<'d> {
    /// Map-category driver
    Map(&'d dyn MapDriver),
    /// Stream-category driver
    Stream(&'d dyn StreamDriver),
    /// Block-category driver
    Block(&'d dyn BlockDriver),
}

impl<'d> DriverRef<'d> {
    /// Category implied by the variant
    pub fn category(&self) -> Category {
        match self {
            DriverRef::Map(_) => Category::Map,
            DriverRef::Stream(_) => Category::Stream,
            DriverRef::Block(_) => Category::Block,
        }
    }

    /// See [`DeviceDriver::acquire`]
    pub fn acquire(&self, instance: u8) -> Result<(), DeviceError> {
        match self {
            DriverRef::Map(d) => d.acquire(instance),
            DriverRef::Stream(d) => d.acquire(instance),
            DriverRef::Block(d) => d.acquire(instance),
        }
    }

    /// See [`DeviceDriver::release`]
    pub fn release(&self, instance: u8) {
        match self {
            DriverRef::Map(d) => d.release(instance),
            DriverRef::Stream(d) => d.release(instance),
            DriverRef::Block(d) => d.release(instance),
        }
    }

    /// See [`DeviceDriver::reset`]
    pub fn reset(&self, instance: u8) {
        match self {
            DriverRef::Map(d) => d.reset(instance),
            DriverRef::Stream(d) => d.reset(instance),
            DriverRef::Block(d) => d.reset(instance),
        }
    }

    /// See [`DeviceDriver::commit`]
    pub fn commit(&self, instance: u8, slot: usize, value: &SlotValue) -> Result<(), DeviceError> {
        match self {
            DriverRef::Map(d) => d.commit(instance, slot, value),
            DriverRef::Stream(d) => d.commit(instance, slot, value),
            DriverRef::Block(d) => d.commit(instance, slot, value),
        }
    }

    /// See [`DeviceDriver::poll`]
    pub fn poll(&self, io: &mut DeviceIo<'_>) {
        match self {
            DriverRef::Map(d) => d.poll(io),
            DriverRef::Stream(d) => d.poll(io),
            DriverRef::Block(d) => d.poll(io),
        }
    }

    /// The map data plane, or `NotImplemented`
    pub fn as_map(&self) -> Result<&'d dyn MapDriver, DeviceError> {
        match *self {
            DriverRef::Map(d) => Ok(d),
            _ => Err(DeviceError::NotImplemented),
        }
    }

    /// The stream data plane, or `NotImplemented`
    pub fn as_stream(&self) -> Result<&'d dyn StreamDriver, DeviceError> {
        match *self {
            DriverRef::Stream(d) => Ok(d),
            _ => Err(DeviceError::NotImplemented),
        }
    }
}
