//! Device type registry

use heapless::Vec;

use crate::driver::{DeviceDescriptor, DriverRef};
use crate::error::DeviceError;

/// Maximum registered device types
pub const MAX_DEVICE_TYPES: usize = 16;

/// Device type addressed by name or numeric id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKey<'a> {
    /// Descriptor name
    Name(&'a str),
    /// Descriptor type id
    Id(u16),
}

impl<'a> From<&'a str> for TypeKey<'a> {
    fn from(name: &'a str) -> Self {
        TypeKey::Name(name)
    }
}

impl From<u16> for TypeKey<'_> {
    fn from(id: u16) -> Self {
        TypeKey::Id(id)
    }
}

/// A registered descriptor/driver pair
#[derive(Clone, Copy)]
pub struct Registration<'d> {
    /// Type descriptor
    pub descriptor: &'d DeviceDescriptor,
    /// Capability table
    pub driver: DriverRef<'d>,
}

impl Registration<'_> {
    fn matches(&self, key: TypeKey<'_>) -> bool {
        match key {
            TypeKey::Name(name) => self.descriptor.name == name,
            TypeKey::Id(id) => self.descriptor.type_id == id,
        }
    }
}

/// Table of registered device types
#[derive(Default)]
pub struct Registry<'d> {
    types: Vec<Registration<'d>, MAX_DEVICE_TYPES>,
}

impl<'d> Registry<'d> {
    /// Create an empty registry
    pub const fn new() -> Self {
        Self { types: Vec::new() }
    }

    /// Register a device type
    ///
    /// The driver's data plane must match the descriptor's category, and
    /// neither the name nor the type id may already be taken.
    pub fn register(
        &mut self,
        descriptor: &'d DeviceDescriptor,
        driver: DriverRef<'d>,
    ) -> Result<(), DeviceError> {
        if driver.category() != descriptor.category || !descriptor.is_well_formed() {
            warn!("rejecting malformed device type {}", descriptor.name);
            return Err(DeviceError::InvalidArgument);
        }
        if self.find(TypeKey::Name(descriptor.name)).is_some()
            || self.find(TypeKey::Id(descriptor.type_id)).is_some()
        {
            return Err(DeviceError::InUse);
        }
        self.types
            .push(Registration { descriptor, driver })
            .map_err(|_| DeviceError::ResourceExhausted)?;
        debug!(
            "registered device type {} (id {}, {})",
            descriptor.name, descriptor.type_id, descriptor.category
        );
        Ok(())
    }

    /// Look up a type by name or id
    pub fn find(&self, key: TypeKey<'_>) -> Option<&Registration<'d>> {
        self.types.iter().find(|reg| reg.matches(key))
    }

    /// Registered type at `index`, in registration order
    pub fn get(&self, index: usize) -> Option<&Registration<'d>> {
        self.types.get(index)
    }

    /// Iterate over registered descriptors
    pub fn descriptors(&self) -> impl Iterator<Item = &'d DeviceDescriptor> + '_ {
        self.types.iter().map(|reg| reg.descriptor)
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
