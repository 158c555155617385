//! Digital I/O group
//!
//! A fixed group of GPIO pins exposed as a map: offset `n` is pin `n`,
//! reading 0 or 1. The whole group shares one direction. While configured
//! as inputs the driver watches for level changes and posts a `Data`
//! event when any pin changes.

use trellis_core::config::schema::{SlotDesc, SlotValue};
use trellis_core::driver::{Category, DeviceDescriptor, DeviceDriver, MapDriver};
use trellis_core::event::EventKind;
use trellis_core::runtime::DeviceIo;
use trellis_core::DeviceError;
use trellis_hal::gpio::{IoPin, PinMode};

use crate::type_id;
use crate::units::{instance_count, Units};

/// Config slot positions
pub mod slot {
    pub const DIRECTION: usize = 0;
    pub const INVERTED: usize = 1;
}

const DIRECTIONS: &[&str] = &["input", "output"];

/// Config schema
pub const SLOTS: &[SlotDesc] = &[
    SlotDesc::option("direction", DIRECTIONS, 0),
    SlotDesc::boolean("inverted", false),
];

struct Group<P, const PINS: usize> {
    pins: [P; PINS],
    mode: PinMode,
    inverted: bool,
    /// Input levels seen on the last poll, bit per pin
    last: Option<u32>,
}

impl<P: IoPin, const PINS: usize> Group<P, PINS> {
    fn level(&self, pin: &P) -> bool {
        let high = match self.mode {
            PinMode::Input => pin.is_high(),
            PinMode::Output => pin.is_set_high(),
        };
        high != self.inverted
    }

    fn levels(&self) -> u32 {
        self.pins
            .iter()
            .take(32)
            .enumerate()
            .filter(|(_, pin)| self.level(pin))
            .fold(0, |bits, (index, _)| bits | (1 << index))
    }

    fn set_mode(&mut self, mode: PinMode) {
        self.mode = mode;
        self.last = None;
        for pin in self.pins.iter_mut() {
            pin.set_mode(mode);
        }
    }
}

/// Group of up to 32 pins sharing a direction, `N` groups per driver
pub struct DigitalGroup<P, const PINS: usize, const N: usize> {
    groups: Units<Group<P, PINS>, N>,
}

impl<P: IoPin, const PINS: usize, const N: usize> DigitalGroup<P, PINS, N> {
    /// Device type descriptor
    pub const DESCRIPTOR: DeviceDescriptor =
        DeviceDescriptor::new("digital", type_id::DIGITAL, Category::Map)
            .with_slots(SLOTS)
            .with_instances(instance_count(N));

    /// Create the driver; every group starts as inputs
    pub fn new(groups: [[P; PINS]; N]) -> Self {
        let groups = groups.map(|pins| {
            let mut group = Group {
                pins,
                mode: PinMode::Input,
                inverted: false,
                last: None,
            };
            group.set_mode(PinMode::Input);
            group
        });
        Self {
            groups: Units::new(groups),
        }
    }
}

impl<P: IoPin, const PINS: usize, const N: usize> DeviceDriver for DigitalGroup<P, PINS, N> {
    fn reset(&self, instance: u8) {
        self.groups.with(instance, |group| {
            for pin in group.pins.iter_mut() {
                pin.set_low();
            }
            group.set_mode(PinMode::Input);
            group.inverted = false;
        });
    }

    fn commit(&self, instance: u8, slot: usize, value: &SlotValue) -> Result<(), DeviceError> {
        self.groups
            .with(instance, |group| match (slot, value) {
                (slot::DIRECTION, SlotValue::Option(0)) => {
                    group.set_mode(PinMode::Input);
                    Ok(())
                }
                (slot::DIRECTION, SlotValue::Option(1)) => {
                    // Drive the inactive level before switching
                    let idle = group.inverted;
                    for pin in group.pins.iter_mut() {
                        pin.set_state(idle);
                    }
                    group.set_mode(PinMode::Output);
                    Ok(())
                }
                (slot::INVERTED, SlotValue::Bool(inverted)) => {
                    group.inverted = *inverted;
                    group.last = None;
                    if group.mode == PinMode::Output {
                        let idle = group.inverted;
                        for pin in group.pins.iter_mut() {
                            pin.set_state(idle);
                        }
                    }
                    Ok(())
                }
                _ => Err(DeviceError::InvalidArgument),
            })
            .unwrap_or(Err(DeviceError::NotFound))
    }

    fn poll(&self, io: &mut DeviceIo<'_>) {
        let changed = self.groups.with(io.instance(), |group| {
            if group.mode != PinMode::Input {
                return false;
            }
            let levels = group.levels();
            let previous = group.last.replace(levels);
            previous.is_some_and(|previous| previous != levels)
        });
        if changed == Some(true) {
            trace!("input change on group {}", io.instance());
            io.post(EventKind::Data, 0);
        }
    }
}

impl<P: IoPin, const PINS: usize, const N: usize> MapDriver for DigitalGroup<P, PINS, N> {
    fn get(&self, instance: u8, offset: usize) -> Option<i32> {
        self.groups
            .with(instance, |group| {
                group.pins.get(offset).map(|pin| i32::from(group.level(pin)))
            })
            .flatten()
    }

    fn set(&self, instance: u8, offset: usize, value: i32) -> bool {
        self.groups
            .with(instance, |group| {
                if group.mode != PinMode::Output {
                    return false;
                }
                let high = (value != 0) != group.inverted;
                match group.pins.get_mut(offset) {
                    Some(pin) => {
                        pin.set_state(high);
                        true
                    }
                    None => false,
                }
            })
            .unwrap_or(false)
    }

    fn size(&self, _instance: u8) -> usize {
        PINS.min(32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use trellis_core::config::RuntimeConfig;
    use trellis_core::driver::DriverRef;
    use trellis_core::event::EventQueue;
    use trellis_core::value::Value;
    use trellis_core::Runtime;
    use trellis_hal::gpio::{InputPin, OutputPin};

    /// Pin whose input level is driven by the test through a shared cell
    struct MockPin<'a> {
        input: &'a Cell<bool>,
        driven: bool,
        mode: PinMode,
    }

    impl<'a> MockPin<'a> {
        fn new(input: &'a Cell<bool>) -> Self {
            Self {
                input,
                driven: false,
                mode: PinMode::Output,
            }
        }
    }

    impl OutputPin for MockPin<'_> {
        fn set_high(&mut self) {
            self.driven = true;
        }

        fn set_low(&mut self) {
            self.driven = false;
        }

        fn is_set_high(&self) -> bool {
            self.driven
        }
    }

    impl InputPin for MockPin<'_> {
        fn is_high(&self) -> bool {
            self.input.get()
        }
    }

    impl IoPin for MockPin<'_> {
        fn set_mode(&mut self, mode: PinMode) {
            self.mode = mode;
        }
    }

    type Group2<'a> = DigitalGroup<MockPin<'a>, 2, 1>;

    #[test]
    fn test_starts_as_inputs() {
        let (a, b) = (Cell::new(true), Cell::new(false));
        let driver = Group2::new([[MockPin::new(&a), MockPin::new(&b)]]);

        assert_eq!(driver.get(0, 0), Some(1));
        assert_eq!(driver.get(0, 1), Some(0));
        assert_eq!(driver.get(0, 2), None);
        assert!(!driver.set(0, 0, 1));
    }

    #[test]
    fn test_output_with_inversion() {
        let (a, b) = (Cell::new(false), Cell::new(false));
        let driver = Group2::new([[MockPin::new(&a), MockPin::new(&b)]]);
        driver.commit(0, slot::INVERTED, &SlotValue::Bool(true)).unwrap();
        driver.commit(0, slot::DIRECTION, &SlotValue::Option(1)).unwrap();

        // Inactive level of an inverted output is high
        assert!(driver.groups.with(0, |g| g.pins[0].driven).unwrap());
        assert_eq!(driver.get(0, 0), Some(0));

        assert!(driver.set(0, 1, 1));
        assert!(!driver.groups.with(0, |g| g.pins[1].driven).unwrap());
        assert_eq!(driver.get(0, 1), Some(1));
    }

    #[test]
    fn test_reset_returns_to_inputs() {
        let (a, b) = (Cell::new(false), Cell::new(false));
        let driver = Group2::new([[MockPin::new(&a), MockPin::new(&b)]]);
        driver.commit(0, slot::DIRECTION, &SlotValue::Option(1)).unwrap();
        driver.set(0, 0, 1);

        driver.reset(0);
        driver.groups.with(0, |g| {
            assert_eq!(g.mode, PinMode::Input);
            assert!(g.pins.iter().all(|p| p.mode == PinMode::Input && !p.driven));
        });
    }

    #[test]
    fn test_bad_commit_rejected() {
        let (a, b) = (Cell::new(false), Cell::new(false));
        let driver = Group2::new([[MockPin::new(&a), MockPin::new(&b)]]);
        assert_eq!(
            driver.commit(0, slot::DIRECTION, &SlotValue::Option(2)),
            Err(DeviceError::InvalidArgument)
        );
        assert_eq!(
            driver.commit(1, slot::INVERTED, &SlotValue::Bool(true)),
            Err(DeviceError::NotFound)
        );
    }

    #[test]
    fn test_input_change_posts_data() {
        let (a, b) = (Cell::new(false), Cell::new(false));
        let driver = Group2::new([[MockPin::new(&a), MockPin::new(&b)]]);
        let descriptor = Group2::DESCRIPTOR;
        let events = EventQueue::new();
        let mut rt = Runtime::new(&events, RuntimeConfig::default());
        rt.register(&descriptor, DriverRef::Map(&driver)).unwrap();

        let id = rt.request("digital".into(), 0).unwrap();
        let config = [("direction", Value::Str("input"))];
        rt.enable(id, Some(&config[..])).unwrap();

        rt.poll();
        assert!(events.is_empty());
        b.set(true);
        rt.poll();
        assert_eq!(events.take().map(|e| e.kind), Some(EventKind::Data));
        rt.poll();
        assert!(events.is_empty());

        let mut levels = [0i32; 2];
        assert_eq!(rt.map_read_all(id, &mut levels), Ok(2));
        assert_eq!(levels, [0, 1]);
    }
}
