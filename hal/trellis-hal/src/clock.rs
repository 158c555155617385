//! Monotonic time source

/// Free-running millisecond clock
///
/// Wraps at `u32::MAX`; callers compare with `wrapping_sub`.
pub trait Clock {
    /// Milliseconds since an arbitrary epoch
    fn now_ms(&self) -> u32;
}
