//! Runtime context
//!
//! [`Runtime`] owns everything the framework keeps between calls: the type
//! registry, the instance pool and the stream table. The event queue is
//! borrowed so it can live in a `static` shared with interrupt handlers.
//!
//! Entry points come in four groups:
//!
//! - lifecycle: [`request`](Runtime::request), [`enable`](Runtime::enable),
//!   [`disable`](Runtime::disable), [`destroy`](Runtime::destroy)
//! - configuration: `config_*`, [`listen`](Runtime::listen)
//! - data planes: `map_*` here, stream operations in `streams`
//! - the main loop: [`poll`](Runtime::poll), [`dispatch`](Runtime::dispatch)
//!   and [`tick`](Runtime::tick)

mod dispatch;
mod io;
mod streams;

pub use dispatch::{ScriptHost, MAX_MAP_SIZE};
pub use io::DeviceIo;

use crate::config::schema::{apply_object, ConfigObject, ConfigValues, SlotKey};
use crate::config::RuntimeConfig;
use crate::device::{
    DeviceId, DeviceInstance, DevicePool, DeviceStatus, Listener, Registry, TypeKey, MAX_DEVICES,
};
use crate::driver::{Category, DeviceDescriptor, DriverRef, MapDriver};
use crate::error::DeviceError;
use crate::event::{Event, EventKind, EventQueue};
use crate::stream::StreamTable;
use crate::value::Value;

/// The device framework's state
pub struct Runtime<'d> {
    config: RuntimeConfig,
    registry: Registry<'d>,
    pool: DevicePool<'d>,
    streams: StreamTable,
    events: &'d EventQueue,
}

impl<'d> Runtime<'d> {
    /// Create a runtime with nothing registered
    pub fn new(events: &'d EventQueue, config: RuntimeConfig) -> Self {
        Self {
            config,
            registry: Registry::new(),
            pool: DevicePool::new(),
            streams: StreamTable::new(),
            events,
        }
    }

    /// Runtime tunables
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The event queue drivers and interrupt handlers post to
    pub fn events(&self) -> &'d EventQueue {
        self.events
    }

    /// Registered device types
    pub fn registry(&self) -> &Registry<'d> {
        &self.registry
    }

    /// Register a device type
    pub fn register(
        &mut self,
        descriptor: &'d DeviceDescriptor,
        driver: DriverRef<'d>,
    ) -> Result<(), DeviceError> {
        self.registry.register(descriptor, driver)
    }

    /// Live device state behind a handle
    pub fn device(&self, id: DeviceId) -> Result<&DeviceInstance<'d>, DeviceError> {
        self.pool.get(id)
    }

    /// Allocate a hardware instance of a registered type
    ///
    /// The new device is disabled, with every config slot at its default.
    pub fn request(&mut self, key: TypeKey<'_>, instance: u8) -> Result<DeviceId, DeviceError> {
        let registration = self.registry.find(key).copied().ok_or(DeviceError::NotFound)?;
        let descriptor = registration.descriptor;
        if instance >= descriptor.instances {
            return Err(DeviceError::NotFound);
        }
        if self.pool.is_allocated(descriptor.type_id, instance) {
            return Err(DeviceError::InUse);
        }
        if self.pool.len() >= MAX_DEVICES {
            return Err(DeviceError::ResourceExhausted);
        }

        registration.driver.acquire(instance)?;
        let device = DeviceInstance::new(descriptor, registration.driver, instance);
        let id = match self.pool.allocate(device) {
            Ok(id) => id,
            Err(err) => {
                registration.driver.release(instance);
                return Err(err);
            }
        };
        debug!(
            "requested {} instance {} as slot {}",
            descriptor.name, instance, id.slot
        );
        Ok(id)
    }

    /// Release a device and invalidate its handle
    ///
    /// Stream buffers go first, detaching any pipe partner.
    pub fn destroy(&mut self, id: DeviceId) -> Result<(), DeviceError> {
        let device = self.pool.get_mut(id)?;
        if let Some(stream) = device.stream.take() {
            self.streams.release(stream, self.events);
        }
        if device.enabled {
            device.driver.reset(device.instance);
            device.enabled = false;
        }
        device.driver.release(device.instance);
        self.pool.release(id)?;
        debug!("destroyed slot {}", id.slot);
        Ok(())
    }

    /// Validate and commit config, then enable
    ///
    /// Enabling an enabled device does nothing. Otherwise `config` is
    /// merged over the stored values and validated in full before the
    /// driver sees any of it; every slot is then committed in schema order.
    /// Any failure leaves the device disabled with its stored config
    /// unchanged.
    pub fn enable(
        &mut self,
        id: DeviceId,
        config: Option<ConfigObject<'_>>,
    ) -> Result<(), DeviceError> {
        let device = self.pool.get_mut(id)?;
        if device.enabled {
            return Ok(());
        }

        let mut staged = device.config.clone();
        if let Some(object) = config {
            apply_object(device.descriptor.slots, &mut staged, object)?;
        }
        for (slot, value) in staged.iter().enumerate() {
            if let Err(err) = device.driver.commit(device.instance, slot, value) {
                warn!("commit of slot {} failed on slot {}: {}", slot, id.slot, err);
                device.driver.reset(device.instance);
                return Err(err);
            }
        }

        if device.descriptor.category == Category::Stream && device.stream.is_none() {
            let descriptor = device.descriptor;
            match self.streams.allocate(
                id,
                descriptor.stream_capacity(),
                descriptor.drain_threshold,
            ) {
                Ok(stream) => device.stream = Some(stream),
                Err(err) => {
                    device.driver.reset(device.instance);
                    return Err(err);
                }
            }
        }

        device.config = staged;
        device.enabled = true;
        device.error = None;
        debug!("enabled slot {}", id.slot);
        Ok(())
    }

    /// Stop the hardware, keeping the stored config
    ///
    /// A bound stream is unpiped and its buffers emptied.
    pub fn disable(&mut self, id: DeviceId) -> Result<(), DeviceError> {
        let device = self.pool.get_mut(id)?;
        if !device.enabled {
            return Ok(());
        }
        device.driver.reset(device.instance);
        device.enabled = false;
        if let Some(stream) = device.stream {
            self.streams.reset(stream, self.events);
        }
        debug!("disabled slot {}", id.slot);
        Ok(())
    }

    /// Lifecycle snapshot
    pub fn status(&self, id: DeviceId) -> Result<DeviceStatus, DeviceError> {
        self.pool.get(id).map(DeviceInstance::status)
    }

    /// Register, replace or (with `None`) remove the listener for `kind`
    ///
    /// Returns the listener that was there before.
    pub fn listen(
        &mut self,
        id: DeviceId,
        kind: EventKind,
        listener: Option<Listener>,
    ) -> Result<Option<Listener>, DeviceError> {
        let device = self.pool.get_mut(id)?;
        if kind.index() >= usize::from(device.descriptor.event_kinds) {
            return Err(DeviceError::InvalidArgument);
        }
        let slot = device
            .listeners
            .get_mut(kind.index())
            .ok_or(DeviceError::InvalidArgument)?;
        Ok(core::mem::replace(slot, listener))
    }

    /// Record a hardware fault and raise an `Error` event
    ///
    /// Ignored while the device is disabled.
    pub fn report_error(&mut self, id: DeviceId, code: u16) -> Result<(), DeviceError> {
        let device = self.pool.get_mut(id)?;
        if device.record_error(code) {
            warn!("hardware fault {} on slot {}", code, id.slot);
            self.events.post(Event::error(id, code));
        }
        Ok(())
    }

    /// Read one config slot
    pub fn config_get(&self, id: DeviceId, key: SlotKey<'_>) -> Result<Value<'_>, DeviceError> {
        let device = self.pool.get(id)?;
        let index = key
            .resolve(device.slots())
            .ok_or(DeviceError::InvalidArgument)?;
        let value = device.config.get(index).ok_or(DeviceError::InvalidArgument)?;
        Ok(value.to_value(&device.slots()[index]))
    }

    /// Write one config slot
    ///
    /// Only allowed while disabled; a rejected value changes nothing.
    pub fn config_set(
        &mut self,
        id: DeviceId,
        key: SlotKey<'_>,
        value: &Value<'_>,
    ) -> Result<(), DeviceError> {
        let device = self.pool.get_mut(id)?;
        if device.enabled {
            return Err(DeviceError::AlreadyEnabled);
        }
        let index = key
            .resolve(device.slots())
            .ok_or(DeviceError::InvalidArgument)?;
        let normalized = device.slots()[index].normalize(value)?;
        let slot = device
            .config
            .get_mut(index)
            .ok_or(DeviceError::InvalidArgument)?;
        *slot = normalized;
        Ok(())
    }

    /// Write every recognized key of a config object
    ///
    /// Unknown keys are skipped. All recognized values are validated before
    /// any is stored, so an invalid one leaves the config untouched.
    pub fn config_set_all(
        &mut self,
        id: DeviceId,
        object: ConfigObject<'_>,
    ) -> Result<(), DeviceError> {
        let device = self.pool.get_mut(id)?;
        if device.enabled {
            return Err(DeviceError::AlreadyEnabled);
        }
        apply_object(device.descriptor.slots, &mut device.config, object)
    }

    /// Read every config slot
    ///
    /// An enabled Map device that can read its whole config back from the
    /// hardware does so in one transaction; everything else reports the
    /// stored values.
    pub fn config_get_all(&self, id: DeviceId) -> Result<ConfigSnapshot<'d>, DeviceError> {
        let device = self.pool.get(id)?;
        let mut values = device.config.clone();
        if let (DriverRef::Map(driver), true) = (device.driver, device.enabled) {
            match driver.read_config(device.instance, &mut values) {
                Ok(()) => {}
                Err(DeviceError::NotImplemented) => values = device.config.clone(),
                Err(err) => return Err(err),
            }
        }
        Ok(ConfigSnapshot {
            descriptor: device.descriptor,
            values,
        })
    }

    /// Read one map value
    pub fn map_get(&mut self, id: DeviceId, offset: usize) -> Result<i32, DeviceError> {
        let (driver, device) = self.map_device(id)?;
        let value = driver
            .get(device.instance, offset)
            .ok_or(DeviceError::InvalidArgument)?;
        device.error = None;
        Ok(value)
    }

    /// Write one map value
    pub fn map_set(&mut self, id: DeviceId, offset: usize, value: i32) -> Result<(), DeviceError> {
        let (driver, device) = self.map_device(id)?;
        if !driver.set(device.instance, offset, value) {
            return Err(DeviceError::InvalidArgument);
        }
        device.error = None;
        Ok(())
    }

    /// Number of addressable map offsets
    pub fn map_size(&mut self, id: DeviceId) -> Result<usize, DeviceError> {
        let (driver, device) = self.map_device(id)?;
        Ok(driver.size(device.instance))
    }

    /// Read every map value into `out`, returning how many were written
    pub fn map_read_all(&mut self, id: DeviceId, out: &mut [i32]) -> Result<usize, DeviceError> {
        let (driver, device) = self.map_device(id)?;
        let count = driver.size(device.instance).min(out.len());
        for (offset, slot) in out[..count].iter_mut().enumerate() {
            *slot = driver
                .get(device.instance, offset)
                .ok_or(DeviceError::InvalidArgument)?;
        }
        device.error = None;
        Ok(count)
    }

    fn map_device(
        &mut self,
        id: DeviceId,
    ) -> Result<(&'d dyn MapDriver, &mut DeviceInstance<'d>), DeviceError> {
        let device = self.pool.get_mut(id)?;
        if !device.enabled {
            return Err(DeviceError::NotEnabled);
        }
        Ok((device.driver.as_map()?, device))
    }
}

/// Config values of one device together with their schema
#[derive(Debug, Clone)]
pub struct ConfigSnapshot<'d> {
    descriptor: &'d DeviceDescriptor,
    values: ConfigValues,
}

impl ConfigSnapshot<'_> {
    /// Number of slots
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the type has no config slots
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Slot name and value at `index`
    pub fn get(&self, index: usize) -> Option<(&'static str, Value<'_>)> {
        let desc = self.descriptor.slots.get(index)?;
        let value = self.values.get(index)?;
        Some((desc.name, value.to_value(desc)))
    }

    /// Value of the slot called `name`
    pub fn value(&self, name: &str) -> Option<Value<'_>> {
        let index = SlotKey::Name(name).resolve(self.descriptor.slots)?;
        self.get(index).map(|(_, value)| value)
    }

    /// Iterate over `(name, value)` pairs in schema order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Value<'_>)> + '_ {
        (0..self.values.len()).filter_map(move |index| self.get(index))
    }
}
