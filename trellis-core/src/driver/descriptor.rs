//! Device type descriptors

use crate::config::schema::{SlotDesc, MAX_SLOTS};
use crate::event::MAX_EVENT_KINDS;
use crate::stream::STREAM_BUFFER_SIZE;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Data-plane category of a device type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Category {
    /// Indexed register-like read/write
    Map,
    /// Byte-oriented buffered I/O
    Stream,
    /// Reserved, no driver implements it yet
    Block,
}

/// Immutable description of a device type, registered once
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceDescriptor {
    /// Type name used by `request`
    pub name: &'static str,
    /// Numeric type id used by `request`
    pub type_id: u16,
    /// Data-plane category
    pub category: Category,
    /// Ordered config slots
    pub slots: &'static [SlotDesc],
    /// Number of event kinds listeners may subscribe to
    pub event_kinds: u8,
    /// Number of hardware instances of this type
    pub instances: u8,
    /// Rx/tx buffer capacity for stream devices
    pub buffer_size: usize,
    /// Tx fill level at or below which backpressure is released
    pub drain_threshold: usize,
}

impl DeviceDescriptor {
    /// Create a descriptor with one instance, no slots and the stream
    /// defaults (full pool buffer, drain on empty)
    pub const fn new(name: &'static str, type_id: u16, category: Category) -> Self {
        Self {
            name,
            type_id,
            category,
            slots: &[],
            event_kinds: 4,
            instances: 1,
            buffer_size: STREAM_BUFFER_SIZE,
            drain_threshold: 0,
        }
    }

    /// Set the config schema
    pub const fn with_slots(mut self, slots: &'static [SlotDesc]) -> Self {
        self.slots = slots;
        self
    }

    /// Set the number of hardware instances
    pub const fn with_instances(mut self, instances: u8) -> Self {
        self.instances = instances;
        self
    }

    /// Set the number of event kinds
    pub const fn with_event_kinds(mut self, kinds: u8) -> Self {
        self.event_kinds = kinds;
        self
    }

    /// Set the stream buffer capacity
    pub const fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Set the stream drain threshold
    pub const fn with_drain_threshold(mut self, threshold: usize) -> Self {
        self.drain_threshold = threshold;
        self
    }

    /// Stream buffer capacity clamped to the pool buffer size
    pub fn stream_capacity(&self) -> usize {
        self.buffer_size.min(STREAM_BUFFER_SIZE)
    }

    /// Check that the descriptor fits the fixed-size runtime tables
    pub fn is_well_formed(&self) -> bool {
        let stream_ok = match self.category {
            Category::Stream => self.buffer_size > 0 && self.drain_threshold < self.stream_capacity(),
            _ => true,
        };
        !self.name.is_empty()
            && self.instances > 0
            && self.slots.len() <= MAX_SLOTS
            && (self.event_kinds as usize) <= MAX_EVENT_KINDS
            && self.slots.iter().all(SlotDesc::is_well_formed)
            && stream_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLOTS: &[SlotDesc] = &[SlotDesc::boolean("on", false)];

    #[test]
    fn test_builder_defaults() {
        const DESC: DeviceDescriptor = DeviceDescriptor::new("uart", 3, Category::Stream)
            .with_instances(2)
            .with_buffer_size(32);
        assert_eq!(DESC.instances, 2);
        assert_eq!(DESC.stream_capacity(), 32);
        assert_eq!(DESC.event_kinds, 4);
        assert!(DESC.is_well_formed());
    }

    #[test]
    fn test_capacity_is_clamped() {
        let desc = DeviceDescriptor::new("uart", 3, Category::Stream)
            .with_buffer_size(STREAM_BUFFER_SIZE * 4);
        assert_eq!(desc.stream_capacity(), STREAM_BUFFER_SIZE);
    }

    #[test]
    fn test_malformed_descriptors() {
        let no_instances = DeviceDescriptor::new("gpio", 1, Category::Map).with_instances(0);
        assert!(!no_instances.is_well_formed());

        let too_many_kinds = DeviceDescriptor::new("gpio", 1, Category::Map)
            .with_slots(SLOTS)
            .with_event_kinds(MAX_EVENT_KINDS as u8 + 1);
        assert!(!too_many_kinds.is_well_formed());

        let threshold_too_high = DeviceDescriptor::new("uart", 2, Category::Stream)
            .with_buffer_size(8)
            .with_drain_threshold(8);
        assert!(!threshold_too_high.is_well_formed());
    }
}
