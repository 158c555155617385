//! Device instances and handles

use crate::config::schema::{ConfigValues, SlotDesc};
use crate::driver::{Category, DeviceDescriptor, DriverRef};
use crate::event::{EventKind, MAX_EVENT_KINDS};
use crate::stream::StreamId;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// External handle to a device instance
///
/// Pairs a pool slot with the slot's generation at allocation time. Once
/// the slot is released the token no longer matches and every lookup
/// through this handle fails with `Stale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceId {
    /// Pool slot index
    pub slot: u8,
    /// Slot generation
    pub token: u16,
}

impl DeviceId {
    /// Create a handle
    pub const fn new(slot: u8, token: u16) -> Self {
        Self { slot, token }
    }
}

/// Opaque script callback handle
///
/// The core stores and hands it back to the script host; it never looks
/// inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Listener(pub u32);

/// Snapshot of an instance's lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceStatus {
    /// Data-plane category
    pub category: Category,
    /// Hardware instance index
    pub instance: u8,
    /// Device is enabled
    pub enabled: bool,
    /// Last recorded hardware fault
    pub error: Option<u16>,
}

/// Live state of an allocated device
pub struct DeviceInstance<'d> {
    pub(crate) descriptor: &'d DeviceDescriptor,
    pub(crate) driver: DriverRef<'d>,
    pub(crate) instance: u8,
    pub(crate) config: ConfigValues,
    pub(crate) enabled: bool,
    pub(crate) error: Option<u16>,
    pub(crate) listeners: [Option<Listener>; MAX_EVENT_KINDS],
    pub(crate) stream: Option<StreamId>,
}

impl<'d> DeviceInstance<'d> {
    /// Create a disabled instance with config slots at their defaults
    pub(crate) fn new(descriptor: &'d DeviceDescriptor, driver: DriverRef<'d>, instance: u8) -> Self {
        Self {
            descriptor,
            driver,
            instance,
            config: crate::config::schema::defaults(descriptor.slots),
            enabled: false,
            error: None,
            listeners: [None; MAX_EVENT_KINDS],
            stream: None,
        }
    }

    /// Type descriptor
    pub fn descriptor(&self) -> &'d DeviceDescriptor {
        self.descriptor
    }

    /// Config schema
    pub fn slots(&self) -> &'static [SlotDesc] {
        self.descriptor.slots
    }

    /// Hardware instance index
    pub fn instance(&self) -> u8 {
        self.instance
    }

    /// Check if the device is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Last recorded hardware fault
    pub fn error(&self) -> Option<u16> {
        self.error
    }

    /// Stored config values in slot order
    pub fn config(&self) -> &ConfigValues {
        &self.config
    }

    /// Listener registered for `kind`
    pub fn listener(&self, kind: EventKind) -> Option<Listener> {
        self.listeners.get(kind.index()).copied().flatten()
    }

    /// Lifecycle snapshot
    pub fn status(&self) -> DeviceStatus {
        DeviceStatus {
            category: self.descriptor.category,
            instance: self.instance,
            enabled: self.enabled,
            error: self.error,
        }
    }

    /// Record a hardware fault
    ///
    /// Faults are only recorded while enabled. Returns whether it was.
    pub(crate) fn record_error(&mut self, code: u16) -> bool {
        if self.enabled {
            self.error = Some(code);
        }
        self.enabled
    }
}
