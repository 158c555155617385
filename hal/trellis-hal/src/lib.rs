//! Trellis Hardware Abstraction Layer
//!
//! This crate defines the hardware traits the Trellis peripheral drivers are
//! written against. Chip-specific HALs implement them; the drivers in
//! `trellis-drivers` turn them into device capability tables.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Script host / firmware main loop       │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  trellis-core (registry, streams, events)│
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  trellis-drivers (capability tables)    │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  trellis-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::OutputPin`], [`gpio::InputPin`] - Digital I/O
//! - [`uart::SerialTx`], [`uart::SerialRx`] - Non-blocking serial
//! - [`i2c::I2cBus`] - I2C bus operations
//! - [`adc::AdcReader`] - Analog sampling
//! - [`pwm::PwmOutput`] - Duty-cycle outputs
//! - [`clock::Clock`] - Monotonic millisecond time

#![no_std]
#![deny(unsafe_code)]

pub mod adc;
pub mod clock;
pub mod gpio;
pub mod i2c;
pub mod pwm;
pub mod uart;

// Re-export key traits at crate root for convenience
pub use adc::AdcReader;
pub use clock::Clock;
pub use gpio::{InputPin, IoPin, OutputPin};
pub use i2c::I2cBus;
pub use pwm::PwmOutput;
pub use uart::{SerialRx, SerialTx};
