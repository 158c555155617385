//! PWM output channels
//!
//! Offset `n` is the duty of channel `n`, from 0 to the bank's full-scale
//! value. Channels share the carrier frequency set by the `frequency` slot.

use trellis_core::config::schema::{SlotDesc, SlotValue};
use trellis_core::driver::{Category, DeviceDescriptor, DeviceDriver, MapDriver};
use trellis_core::DeviceError;
use trellis_hal::pwm::PwmOutput;

use crate::type_id;
use crate::units::{instance_count, Units};

/// Config slot positions
pub mod slot {
    pub const FREQUENCY: usize = 0;
}

/// Config schema
pub const SLOTS: &[SlotDesc] = &[SlotDesc::integer("frequency", 1000)];

/// PWM bank per instance
pub struct PwmChannels<W, const N: usize> {
    banks: Units<W, N>,
}

impl<W: PwmOutput, const N: usize> PwmChannels<W, N> {
    /// Device type descriptor
    pub const DESCRIPTOR: DeviceDescriptor =
        DeviceDescriptor::new("pwm", type_id::PWM, Category::Map)
            .with_slots(SLOTS)
            .with_instances(instance_count(N));

    /// Create the driver
    pub fn new(banks: [W; N]) -> Self {
        Self {
            banks: Units::new(banks),
        }
    }
}

impl<W: PwmOutput, const N: usize> DeviceDriver for PwmChannels<W, N> {
    fn reset(&self, instance: u8) {
        self.banks.with(instance, |bank| {
            for channel in 0..bank.channel_count() {
                bank.set_duty(channel, 0);
            }
            bank.set_enabled(false);
        });
    }

    fn commit(&self, instance: u8, slot: usize, value: &SlotValue) -> Result<(), DeviceError> {
        self.banks
            .with(instance, |bank| match (slot, value) {
                (slot::FREQUENCY, SlotValue::Int(hz)) => {
                    let hz = u32::try_from(*hz)
                        .ok()
                        .filter(|hz| *hz > 0)
                        .ok_or(DeviceError::InvalidArgument)?;
                    if !bank.set_frequency(hz) {
                        return Err(DeviceError::InvalidArgument);
                    }
                    bank.set_enabled(true);
                    debug!("pwm bank {} at {} Hz", instance, hz);
                    Ok(())
                }
                _ => Err(DeviceError::InvalidArgument),
            })
            .unwrap_or(Err(DeviceError::NotFound))
    }
}

impl<W: PwmOutput, const N: usize> MapDriver for PwmChannels<W, N> {
    fn get(&self, instance: u8, offset: usize) -> Option<i32> {
        self.banks
            .with(instance, |bank| {
                (offset < bank.channel_count()).then(|| i32::from(bank.duty(offset)))
            })
            .flatten()
    }

    fn set(&self, instance: u8, offset: usize, value: i32) -> bool {
        self.banks
            .with(instance, |bank| {
                let duty = match u16::try_from(value) {
                    Ok(duty) if duty <= bank.max_duty() => duty,
                    _ => return false,
                };
                if offset >= bank.channel_count() {
                    return false;
                }
                bank.set_duty(offset, duty);
                true
            })
            .unwrap_or(false)
    }

    fn size(&self, instance: u8) -> usize {
        self.banks
            .with(instance, |bank| bank.channel_count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockPwm {
        duty: [u16; 3],
        hz: u32,
        enabled: bool,
    }

    impl MockPwm {
        fn new() -> Self {
            Self {
                duty: [0; 3],
                hz: 0,
                enabled: false,
            }
        }
    }

    impl PwmOutput for MockPwm {
        fn channel_count(&self) -> usize {
            3
        }

        fn max_duty(&self) -> u16 {
            1000
        }

        fn set_duty(&mut self, channel: usize, duty: u16) {
            self.duty[channel] = duty;
        }

        fn duty(&self, channel: usize) -> u16 {
            self.duty[channel]
        }

        fn set_frequency(&mut self, hz: u32) -> bool {
            if hz > 100_000 {
                return false;
            }
            self.hz = hz;
            true
        }

        fn set_enabled(&mut self, enabled: bool) {
            self.enabled = enabled;
        }
    }

    #[test]
    fn test_duty_per_channel() {
        let pwm = PwmChannels::new([MockPwm::new()]);
        pwm.commit(0, slot::FREQUENCY, &SlotValue::Int(20_000)).unwrap();

        assert!(pwm.set(0, 1, 500));
        assert_eq!(pwm.get(0, 1), Some(500));
        assert_eq!(pwm.size(0), 3);
        assert!(!pwm.set(0, 1, 1001));
        assert!(!pwm.set(0, 3, 1));
        assert!(!pwm.set(0, 0, -1));
        assert_eq!(pwm.get(0, 3), None);
        pwm.banks.with(0, |bank| {
            assert_eq!(bank.hz, 20_000);
            assert!(bank.enabled);
        });
    }

    #[test]
    fn test_frequency_out_of_range() {
        let pwm = PwmChannels::new([MockPwm::new()]);
        assert_eq!(
            pwm.commit(0, slot::FREQUENCY, &SlotValue::Int(0)),
            Err(DeviceError::InvalidArgument)
        );
        assert_eq!(
            pwm.commit(0, slot::FREQUENCY, &SlotValue::Int(200_000)),
            Err(DeviceError::InvalidArgument)
        );
    }

    #[test]
    fn test_reset_stops_outputs() {
        let pwm = PwmChannels::new([MockPwm::new()]);
        pwm.commit(0, slot::FREQUENCY, &SlotValue::Int(1000)).unwrap();
        pwm.set(0, 2, 999);

        pwm.reset(0);
        assert_eq!(pwm.get(0, 2), Some(0));
        pwm.banks.with(0, |bank| assert!(!bank.enabled));
    }
}
