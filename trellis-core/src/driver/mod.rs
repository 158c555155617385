//! Driver capability table
//!
//! These types define the contract between the device framework and the
//! per-type drivers that touch hardware. A driver implements the lifecycle
//! operations of [`DeviceDriver`] plus exactly one data plane:
//!
//! - [`MapDriver`]: indexed register-like values (GPIO groups, ADC, PWM, I2C)
//! - [`StreamDriver`]: byte-oriented buffered I/O (UART, USB serial)
//! - [`BlockDriver`]: reserved
//!
//! The chosen data plane travels with the driver as a [`DriverRef`] variant,
//! so the framework matches on it instead of probing for missing functions.

pub mod descriptor;
pub mod table;

pub use descriptor::{Category, DeviceDescriptor};
pub use table::{BlockDriver, DeviceDriver, DriverRef, MapDriver, StreamDriver, StreamRequest};
