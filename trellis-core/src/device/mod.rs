//! Device registry and instances
//!
//! - [`registry`]: registered device types (descriptor + driver pairs)
//! - [`pool`]: fixed pool of instance slots with generation tokens
//! - [`instance`]: the live handle state behind a [`DeviceId`]

pub mod instance;
pub mod pool;
pub mod registry;

pub use instance::{DeviceId, DeviceInstance, DeviceStatus, Listener};
pub use pool::{DevicePool, MAX_DEVICES};
pub use registry::{Registration, Registry, TypeKey, MAX_DEVICE_TYPES};
