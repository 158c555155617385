//! Analog input channels
//!
//! Exposes a configurable subset of an ADC's channels as a read-only map.
//! The `channels` slot lists converter channels in offset order, so
//! `channels = [3, 0]` makes offset 0 sample channel 3 and offset 1 sample
//! channel 0.

use heapless::Vec;
use trellis_core::config::schema::{ConfigValues, SlotDesc, SlotValue, MAX_SEQUENCE_LEN};
use trellis_core::driver::{Category, DeviceDescriptor, DeviceDriver, MapDriver};
use trellis_core::DeviceError;
use trellis_hal::adc::AdcReader;

use crate::type_id;
use crate::units::{instance_count, Units};

/// Config slot positions
pub mod slot {
    pub const RESOLUTION: usize = 0;
    pub const CHANNELS: usize = 1;
}

/// Most channels one device can sample
pub const MAX_CHANNELS: usize = 8;

const DEFAULT_RESOLUTION: u8 = 12;

/// Config schema
pub const SLOTS: &[SlotDesc] = &[
    SlotDesc::integer("resolution", DEFAULT_RESOLUTION as i32),
    SlotDesc::sequence("channels", MAX_CHANNELS, &[0]),
];

struct Converter<A> {
    adc: A,
    resolution: u8,
    channels: Vec<u8, MAX_CHANNELS>,
}

/// ADC channel map, one converter per instance
pub struct AdcChannels<A, const N: usize> {
    converters: Units<Converter<A>, N>,
}

impl<A: AdcReader, const N: usize> AdcChannels<A, N> {
    /// Device type descriptor
    pub const DESCRIPTOR: DeviceDescriptor =
        DeviceDescriptor::new("adc", type_id::ADC, Category::Map)
            .with_slots(SLOTS)
            .with_instances(instance_count(N));

    /// Create the driver
    pub fn new(adcs: [A; N]) -> Self {
        let converters = adcs.map(|adc| Converter {
            adc,
            resolution: DEFAULT_RESOLUTION,
            channels: Vec::new(),
        });
        Self {
            converters: Units::new(converters),
        }
    }
}

impl<A: AdcReader, const N: usize> DeviceDriver for AdcChannels<A, N> {
    fn reset(&self, instance: u8) {
        self.converters.with(instance, |conv| conv.channels.clear());
    }

    fn commit(&self, instance: u8, slot: usize, value: &SlotValue) -> Result<(), DeviceError> {
        self.converters
            .with(instance, |conv| match (slot, value) {
                (slot::RESOLUTION, SlotValue::Int(bits)) => {
                    let bits = u8::try_from(*bits)
                        .ok()
                        .filter(|bits| (1..=16).contains(bits))
                        .ok_or(DeviceError::InvalidArgument)?;
                    if !conv.adc.set_resolution(bits) {
                        return Err(DeviceError::InvalidArgument);
                    }
                    conv.resolution = bits;
                    Ok(())
                }
                (slot::CHANNELS, SlotValue::Sequence(channels)) => {
                    let available = conv.adc.channel_count();
                    if channels.iter().any(|&ch| usize::from(ch) >= available) {
                        return Err(DeviceError::InvalidArgument);
                    }
                    conv.channels.clear();
                    conv.channels
                        .extend_from_slice(&channels[..channels.len().min(MAX_CHANNELS)])
                        .map_err(|_| DeviceError::InvalidArgument)?;
                    Ok(())
                }
                _ => Err(DeviceError::InvalidArgument),
            })
            .unwrap_or(Err(DeviceError::NotFound))
    }
}

impl<A: AdcReader, const N: usize> MapDriver for AdcChannels<A, N> {
    fn get(&self, instance: u8, offset: usize) -> Option<i32> {
        self.converters
            .with(instance, |conv| {
                let channel = *conv.channels.get(offset)?;
                conv.adc.sample(usize::from(channel)).map(i32::from)
            })
            .flatten()
    }

    fn set(&self, _instance: u8, _offset: usize, _value: i32) -> bool {
        false
    }

    fn size(&self, instance: u8) -> usize {
        self.converters
            .with(instance, |conv| conv.channels.len())
            .unwrap_or(0)
    }

    fn read_config(&self, instance: u8, values: &mut ConfigValues) -> Result<(), DeviceError> {
        self.converters
            .with(instance, |conv| {
                let mut channels: Vec<u8, MAX_SEQUENCE_LEN> = Vec::new();
                // MAX_CHANNELS fits a sequence slot
                let _ = channels.extend_from_slice(&conv.channels);
                if let Some(value) = values.get_mut(slot::RESOLUTION) {
                    *value = SlotValue::Int(i32::from(conv.resolution));
                }
                if let Some(value) = values.get_mut(slot::CHANNELS) {
                    *value = SlotValue::Sequence(channels);
                }
            })
            .ok_or(DeviceError::NotFound)
    }
}
