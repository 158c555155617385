//! I2C target register map
//!
//! Each instance addresses one target on a shared bus; offset `n` is the
//! target's 8-bit register `n`. Register access happens inline with the
//! map operation. A failed transfer makes the access fail and leaves the
//! bus fault pending until the next poll, which raises it on the device.
//!
//! The bus clock is global, so the most recently committed `frequency`
//! applies to every target.

use core::cell::RefCell;

use trellis_core::config::schema::{SlotDesc, SlotValue};
use trellis_core::driver::{Category, DeviceDescriptor, DeviceDriver, MapDriver};
use trellis_core::runtime::DeviceIo;
use trellis_core::DeviceError;
use trellis_hal::i2c::{I2cBus, I2cConfig, I2cError};

use crate::type_id;
use crate::units::{instance_count, Units};

/// Config slot positions
pub mod slot {
    pub const ADDRESS: usize = 0;
    pub const FREQUENCY: usize = 1;
}

const FREQUENCIES: &[&str] = &["standard", "fast", "fast_plus"];

/// Config schema
pub const SLOTS: &[SlotDesc] = &[
    SlotDesc::integer("address", 0x50),
    SlotDesc::option("frequency", FREQUENCIES, 0),
];

/// Addresses outside this range are reserved by the bus protocol
const VALID_ADDRESSES: core::ops::RangeInclusive<i32> = 0x08..=0x77;

#[derive(Debug, Clone, Copy)]
struct Target {
    address: u8,
    fault: Option<I2cError>,
}

/// `N` targets sharing one bus, each exposing `REGS` registers
pub struct I2cRegisters<B, const REGS: usize, const N: usize> {
    bus: RefCell<B>,
    targets: Units<Target, N>,
}

impl<B: I2cBus, const REGS: usize, const N: usize> I2cRegisters<B, REGS, N> {
    /// Device type descriptor
    pub const DESCRIPTOR: DeviceDescriptor =
        DeviceDescriptor::new("i2c", type_id::I2C, Category::Map)
            .with_slots(SLOTS)
            .with_instances(instance_count(N));

    /// Create the driver
    pub fn new(bus: B) -> Self {
        let target = Target {
            address: 0x50,
            fault: None,
        };
        Self {
            bus: RefCell::new(bus),
            targets: Units::new([target; N]),
        }
    }

    /// Run a transfer against the instance's target, recording any fault
    fn transfer<R>(
        &self,
        instance: u8,
        f: impl FnOnce(&mut B, u8) -> Result<R, I2cError>,
    ) -> Option<R> {
        let address = self.targets.with(instance, |target| target.address)?;
        let mut bus = self.bus.try_borrow_mut().ok()?;
        match f(&mut bus, address) {
            Ok(value) => Some(value),
            Err(fault) => {
                debug!("i2c target {} fault {}", address, fault);
                self.targets.with(instance, |target| target.fault = Some(fault));
                None
            }
        }
    }
}

impl<B: I2cBus, const REGS: usize, const N: usize> DeviceDriver for I2cRegisters<B, REGS, N> {
    fn reset(&self, instance: u8) {
        self.targets.with(instance, |target| target.fault = None);
    }

    fn commit(&self, instance: u8, slot: usize, value: &SlotValue) -> Result<(), DeviceError> {
        match (slot, value) {
            (slot::ADDRESS, SlotValue::Int(address)) if VALID_ADDRESSES.contains(address) => self
                .targets
                .with(instance, |target| target.address = *address as u8)
                .ok_or(DeviceError::NotFound),
            (slot::FREQUENCY, SlotValue::Option(index)) => {
                if usize::from(instance) >= N {
                    return Err(DeviceError::NotFound);
                }
                let config = match index {
                    0 => I2cConfig::STANDARD,
                    1 => I2cConfig::FAST,
                    2 => I2cConfig::FAST_PLUS,
                    _ => return Err(DeviceError::InvalidArgument),
                };
                let mut bus = self.bus.try_borrow_mut().map_err(|_| DeviceError::InUse)?;
                bus.set_frequency(config);
                Ok(())
            }
            _ => Err(DeviceError::InvalidArgument),
        }
    }

    fn poll(&self, io: &mut DeviceIo<'_>) {
        let fault = self
            .targets
            .with(io.instance(), |target| target.fault.take())
            .flatten();
        if let Some(fault) = fault {
            io.raise_error(fault.code());
        }
    }
}

impl<B: I2cBus, const REGS: usize, const N: usize> MapDriver for I2cRegisters<B, REGS, N> {
    fn get(&self, instance: u8, offset: usize) -> Option<i32> {
        let register = u8::try_from(offset).ok().filter(|_| offset < REGS)?;
        self.transfer(instance, |bus, address| {
            let mut byte = [0u8; 1];
            bus.write_read(address, &[register], &mut byte)?;
            Ok(i32::from(byte[0]))
        })
    }

    fn set(&self, instance: u8, offset: usize, value: i32) -> bool {
        let (Ok(register), Ok(byte)) = (u8::try_from(offset), u8::try_from(value)) else {
            return false;
        };
        if offset >= REGS {
            return false;
        }
        self.transfer(instance, |bus, address| bus.write(address, &[register, byte]))
            .is_some()
    }

    fn size(&self, _instance: u8) -> usize {
        REGS.min(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::config::RuntimeConfig;
    use trellis_core::driver::DriverRef;
    use trellis_core::event::{EventKind, EventQueue};
    use trellis_core::value::Value;
    use trellis_core::Runtime;

    /// Bus with a single register file answering at `address`
    struct MockBus {
        address: u8,
        registers: [u8; 8],
        frequency: u32,
        fail: Option<I2cError>,
    }

    impl MockBus {
        fn new(address: u8) -> Self {
            Self {
                address,
                registers: [0; 8],
                frequency: 0,
                fail: None,
            }
        }

        fn check(&mut self, address: u8) -> Result<(), I2cError> {
            if let Some(fault) = self.fail.take() {
                return Err(fault);
            }
            if address != self.address {
                return Err(I2cError::Nack);
            }
            Ok(())
        }
    }

    impl I2cBus for MockBus {
        fn write(&mut self, address: u8, data: &[u8]) -> Result<(), I2cError> {
            self.check(address)?;
            if let [register, value] = data {
                self.registers[usize::from(*register)] = *value;
            }
            Ok(())
        }

        fn write_read(
            &mut self,
            address: u8,
            write_data: &[u8],
            read_buf: &mut [u8],
        ) -> Result<(), I2cError> {
            self.check(address)?;
            read_buf[0] = self.registers[usize::from(write_data[0])];
            Ok(())
        }

        fn set_frequency(&mut self, config: I2cConfig) {
            self.frequency = config.frequency;
        }
    }

    type Eeprom = I2cRegisters<MockBus, 8, 2>;

    #[test]
    fn test_register_access() {
        let i2c = Eeprom::new(MockBus::new(0x50));
        assert!(i2c.set(0, 3, 0xAB));
        assert_eq!(i2c.get(0, 3), Some(0xAB));
        assert_eq!(i2c.size(0), 8);

        assert!(!i2c.set(0, 8, 1));
        assert!(!i2c.set(0, 0, 256));
        assert!(!i2c.set(0, 0, -1));
        assert_eq!(i2c.get(0, 8), None);
    }

    #[test]
    fn test_address_and_frequency_commit() {
        let i2c = Eeprom::new(MockBus::new(0x20));
        assert_eq!(
            i2c.commit(0, slot::ADDRESS, &SlotValue::Int(0x78)),
            Err(DeviceError::InvalidArgument)
        );
        assert_eq!(
            i2c.commit(2, slot::ADDRESS, &SlotValue::Int(0x20)),
            Err(DeviceError::NotFound)
        );
        i2c.commit(1, slot::ADDRESS, &SlotValue::Int(0x20)).unwrap();
        i2c.commit(1, slot::FREQUENCY, &SlotValue::Option(1)).unwrap();
        assert_eq!(i2c.bus.borrow().frequency, 400_000);

        assert!(i2c.set(1, 0, 7));
        // Instance 0 still points at the default address
        assert_eq!(i2c.get(0, 0), None);
    }

    #[test]
    fn test_bus_fault_raised_on_poll() {
        let i2c = Eeprom::new(MockBus::new(0x42));
        let descriptor = Eeprom::DESCRIPTOR;
        let events = EventQueue::new();
        let mut rt = Runtime::new(&events, RuntimeConfig::default());
        rt.register(&descriptor, DriverRef::Map(&i2c)).unwrap();

        let id = rt.request("i2c".into(), 0).unwrap();
        let config = [
            ("address", Value::Int(0x42)),
            ("frequency", Value::Str("fast_plus")),
        ];
        rt.enable(id, Some(&config[..])).unwrap();
        assert_eq!(i2c.bus.borrow().frequency, 1_000_000);

        rt.map_set(id, 1, 0x11).unwrap();
        assert_eq!(rt.map_get(id, 1), Ok(0x11));

        i2c.bus.borrow_mut().fail = Some(I2cError::Timeout);
        assert!(rt.map_get(id, 1).is_err());
        rt.poll();
        let event = events.take().unwrap();
        assert_eq!(event.kind, EventKind::Error);
        assert_eq!(event.code, I2cError::Timeout.code());
        assert_eq!(rt.status(id).unwrap().error, Some(18));

        // A later successful access clears the recorded fault
        assert_eq!(rt.map_get(id, 1), Ok(0x11));
        assert_eq!(rt.status(id).unwrap().error, None);
    }
}
