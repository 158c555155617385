//! Fixed pool of device instance slots
//!
//! Each slot carries a generation token that advances on every allocation
//! and every release, so a handle from an earlier allocation can never
//! reach the slot's next occupant.

use crate::error::DeviceError;

use super::instance::{DeviceId, DeviceInstance};

/// Maximum simultaneously allocated device instances
pub const MAX_DEVICES: usize = 16;

struct PoolSlot<'d> {
    token: u16,
    device: Option<DeviceInstance<'d>>,
}

/// Arena of device instances addressed by `(slot, token)`
pub struct DevicePool<'d> {
    slots: [PoolSlot<'d>; MAX_DEVICES],
}

impl Default for DevicePool<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'d> DevicePool<'d> {
    /// Create an empty pool
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| PoolSlot {
                token: 0,
                device: None,
            }),
        }
    }

    /// Place a device in the first free slot
    ///
    /// Never blocks: a full pool is reported as `ResourceExhausted`.
    pub fn allocate(&mut self, device: DeviceInstance<'d>) -> Result<DeviceId, DeviceError> {
        let (index, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.device.is_none())
            .ok_or(DeviceError::ResourceExhausted)?;
        slot.token = slot.token.wrapping_add(1);
        slot.device = Some(device);
        Ok(DeviceId::new(index as u8, slot.token))
    }

    /// Remove the device behind `id`, advancing the slot's generation
    pub fn release(&mut self, id: DeviceId) -> Result<DeviceInstance<'d>, DeviceError> {
        let slot = self.slot_mut(id)?;
        let device = slot.device.take().ok_or(DeviceError::Stale)?;
        slot.token = slot.token.wrapping_add(1);
        Ok(device)
    }

    /// Look up a live device
    pub fn get(&self, id: DeviceId) -> Result<&DeviceInstance<'d>, DeviceError> {
        self.slots
            .get(id.slot as usize)
            .filter(|slot| slot.token == id.token)
            .and_then(|slot| slot.device.as_ref())
            .ok_or(DeviceError::Stale)
    }

    /// Look up a live device mutably
    pub fn get_mut(&mut self, id: DeviceId) -> Result<&mut DeviceInstance<'d>, DeviceError> {
        self.slot_mut(id)?
            .device
            .as_mut()
            .ok_or(DeviceError::Stale)
    }

    fn slot_mut(&mut self, id: DeviceId) -> Result<&mut PoolSlot<'d>, DeviceError> {
        self.slots
            .get_mut(id.slot as usize)
            .filter(|slot| slot.token == id.token)
            .ok_or(DeviceError::Stale)
    }

    /// Check if a hardware instance of a type is already allocated
    pub fn is_allocated(&self, type_id: u16, instance: u8) -> bool {
        self.iter()
            .any(|(_, dev)| dev.descriptor.type_id == type_id && dev.instance == instance)
    }

    /// Iterate over live devices
    pub fn iter(&self) -> impl Iterator<Item = (DeviceId, &DeviceInstance<'d>)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.device
                .as_ref()
                .map(|dev| (DeviceId::new(index as u8, slot.token), dev))
        })
    }

    /// Iterate mutably over live devices
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (DeviceId, &mut DeviceInstance<'d>)> {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            let token = slot.token;
            slot.device
                .as_mut()
                .map(|dev| (DeviceId::new(index as u8, token), dev))
        })
    }

    /// Number of live devices
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.device.is_some()).count()
    }

    /// Check if no device is allocated
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
