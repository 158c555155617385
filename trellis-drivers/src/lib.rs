//! Peripheral drivers
//!
//! Concrete capability tables for `trellis-core`, written against the
//! hardware traits in `trellis-hal`:
//!
//! - [`digital::DigitalGroup`] - GPIO pin groups (Map)
//! - [`adc::AdcChannels`] - analog channel samples (Map)
//! - [`pwm::PwmChannels`] - duty-cycle outputs (Map)
//! - [`timer::IntervalTimer`] - periodic `Data` events (Map)
//! - [`serial::SerialPort`] - non-blocking UART (Stream)
//! - [`i2c::I2cRegisters`] - register map of an I2C target (Map)
//!
//! Each driver serves every hardware instance of its type; per-instance
//! state lives behind interior mutability so the runtime can share one
//! `&self` across all of them.

#![no_std]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

mod units;

pub mod adc;
pub mod digital;
pub mod i2c;
pub mod pwm;
pub mod serial;
pub mod timer;

/// Numeric type ids of the bundled drivers
pub mod type_id {
    pub const DIGITAL: u16 = 1;
    pub const ADC: u16 = 2;
    pub const PWM: u16 = 3;
    pub const TIMER: u16 = 4;
    pub const SERIAL: u16 = 5;
    pub const I2C: u16 = 6;
}
