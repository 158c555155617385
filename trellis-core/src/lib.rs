//! Device abstraction and event dispatch core
//!
//! This crate contains the hardware-independent runtime that lets a script
//! host enumerate, configure, enable and drive peripherals through one
//! uniform handle model:
//!
//! - Typed configuration schema with runtime validation
//! - Driver capability table (Map, Stream and Block data planes)
//! - Device registry and generation-checked instance pool
//! - Flow-controlled stream engine with backpressure and piping
//! - Interrupt-safe event queue and run-to-completion dispatcher
//!
//! Everything is sized at compile time; nothing allocates.

#![no_std]
#![deny(unsafe_code)]

// Must come first so the logging macros are visible to the other modules.
#[macro_use]
mod fmt;

pub mod config;
pub mod device;
pub mod driver;
pub mod error;
pub mod event;
pub mod runtime;
pub mod stream;
pub mod value;

#[cfg(test)]
mod mock;

pub use config::{RuntimeConfig, SlotDesc, SlotKey, SlotKind, SlotValue};
pub use device::{DeviceId, Listener, TypeKey};
pub use driver::{Category, DeviceDescriptor, DriverRef, MapDriver, StreamDriver};
pub use error::{DeviceError, StreamError};
pub use event::{Event, EventKind, EventQueue};
pub use runtime::{DeviceIo, Runtime, ScriptHost};
pub use value::Value;
