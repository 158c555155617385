//! Interval timer
//!
//! A software timer driven by a millisecond [`Clock`]. Map offset 0 is the
//! period in milliseconds, offset 1 the running flag. Each expiry posts a
//! `Data` event, so a listener receives `[period, running]`. One-shot
//! timers stop themselves after the first expiry.

use core::cell::Cell;

use trellis_core::config::schema::{SlotDesc, SlotValue};
use trellis_core::driver::{Category, DeviceDescriptor, DeviceDriver, MapDriver};
use trellis_core::event::EventKind;
use trellis_core::runtime::DeviceIo;
use trellis_core::DeviceError;
use trellis_hal::clock::Clock;

use crate::type_id;
use crate::units::instance_count;

/// Config slot positions
pub mod slot {
    pub const PERIOD: usize = 0;
    pub const REPEAT: usize = 1;
}

/// Map offsets
pub mod offset {
    pub const PERIOD: usize = 0;
    pub const RUNNING: usize = 1;
}

/// Config schema
pub const SLOTS: &[SlotDesc] = &[
    SlotDesc::integer("period", 1000),
    SlotDesc::boolean("repeat", true),
];

#[derive(Debug, Clone, Copy)]
struct TimerState {
    period_ms: u32,
    repeat: bool,
    running: bool,
    started_ms: u32,
}

impl TimerState {
    const IDLE: Self = Self {
        period_ms: 1000,
        repeat: true,
        running: false,
        started_ms: 0,
    };
}

/// `N` independent timers sharing one clock
pub struct IntervalTimer<C, const N: usize> {
    clock: C,
    timers: [Cell<TimerState>; N],
}

impl<C: Clock, const N: usize> IntervalTimer<C, N> {
    /// Device type descriptor
    pub const DESCRIPTOR: DeviceDescriptor =
        DeviceDescriptor::new("timer", type_id::TIMER, Category::Map)
            .with_slots(SLOTS)
            .with_instances(instance_count(N));

    /// Create the driver with every timer stopped
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            timers: core::array::from_fn(|_| Cell::new(TimerState::IDLE)),
        }
    }

    fn update(&self, instance: u8, f: impl FnOnce(&mut TimerState) -> bool) -> bool {
        match self.timers.get(usize::from(instance)) {
            Some(cell) => {
                let mut state = cell.get();
                let changed = f(&mut state);
                cell.set(state);
                changed
            }
            None => false,
        }
    }
}

impl<C: Clock, const N: usize> DeviceDriver for IntervalTimer<C, N> {
    fn reset(&self, instance: u8) {
        self.update(instance, |timer| {
            timer.running = false;
            true
        });
    }

    fn commit(&self, instance: u8, slot: usize, value: &SlotValue) -> Result<(), DeviceError> {
        if usize::from(instance) >= N {
            return Err(DeviceError::NotFound);
        }
        let now = self.clock.now_ms();
        let accepted = self.update(instance, |timer| match (slot, value) {
            (slot::PERIOD, SlotValue::Int(ms)) if *ms > 0 => {
                timer.period_ms = *ms as u32;
                true
            }
            (slot::REPEAT, SlotValue::Bool(repeat)) => {
                timer.repeat = *repeat;
                // Last slot: start counting once fully configured
                timer.running = true;
                timer.started_ms = now;
                true
            }
            _ => false,
        });
        if accepted {
            Ok(())
        } else {
            Err(DeviceError::InvalidArgument)
        }
    }

    fn poll(&self, io: &mut DeviceIo<'_>) {
        let now = self.clock.now_ms();
        let expired = self.update(io.instance(), |timer| {
            if !timer.running || now.wrapping_sub(timer.started_ms) < timer.period_ms {
                return false;
            }
            if timer.repeat {
                // Keep the cadence even when a poll runs late
                timer.started_ms = timer.started_ms.wrapping_add(timer.period_ms);
                if now.wrapping_sub(timer.started_ms) >= timer.period_ms {
                    timer.started_ms = now;
                }
            } else {
                timer.running = false;
            }
            true
        });
        if expired {
            io.post(EventKind::Data, 0);
        }
    }
}

impl<C: Clock, const N: usize> MapDriver for IntervalTimer<C, N> {
    fn get(&self, instance: u8, offset: usize) -> Option<i32> {
        let timer = self.timers.get(usize::from(instance))?.get();
        match offset {
            offset::PERIOD => i32::try_from(timer.period_ms).ok(),
            offset::RUNNING => Some(i32::from(timer.running)),
            _ => None,
        }
    }

    fn set(&self, instance: u8, offset: usize, value: i32) -> bool {
        let now = self.clock.now_ms();
        self.update(instance, |timer| match offset {
            offset::PERIOD if value > 0 => {
                timer.period_ms = value as u32;
                timer.started_ms = now;
                true
            }
            offset::RUNNING => {
                let running = value != 0;
                if running && !timer.running {
                    timer.started_ms = now;
                }
                timer.running = running;
                true
            }
            _ => false,
        })
    }

    fn size(&self, _instance: u8) -> usize {
        2
    }
}
