//! Per-instance hardware storage

use core::cell::RefCell;

/// Instance count for a descriptor
///
/// Fails const evaluation of the descriptor when a driver is built for more
/// instances than a `u8` can address.
pub(crate) const fn instance_count(n: usize) -> u8 {
    assert!(n <= u8::MAX as usize, "more than 255 instances");
    n as u8
}

/// One `T` per hardware instance, borrowed mutably through `&self`
pub(crate) struct Units<T, const N: usize> {
    units: [RefCell<T>; N],
}

impl<T, const N: usize> Units<T, N> {
    pub(crate) fn new(units: [T; N]) -> Self {
        Self {
            units: units.map(RefCell::new),
        }
    }

    /// Run `f` on the instance's state
    ///
    /// `None` if the instance does not exist or is already borrowed.
    pub(crate) fn with<R>(&self, instance: u8, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let unit = self.units.get(usize::from(instance))?;
        let mut unit = unit.try_borrow_mut().ok()?;
        Some(f(&mut unit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_count_limits() {
        assert_eq!(instance_count(0), 0);
        assert_eq!(instance_count(255), 255);
    }

    #[test]
    #[should_panic(expected = "more than 255 instances")]
    fn test_instance_count_overflow() {
        instance_count(core::hint::black_box(256));
    }

    #[test]
    fn test_with_out_of_range() {
        let units = Units::new([1u8, 2]);
        assert_eq!(units.with(1, |unit| *unit), Some(2));
        assert_eq!(units.with(2, |unit| *unit), None);
    }
}
