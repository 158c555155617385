//! PWM output abstractions

/// Bank of PWM channels sharing one timebase
pub trait PwmOutput {
    /// Number of channels in the bank
    fn channel_count(&self) -> usize;

    /// Full-scale duty value (duty == max is 100%)
    fn max_duty(&self) -> u16;

    /// Set the duty of one channel
    fn set_duty(&mut self, channel: usize, duty: u16);

    /// Current duty of one channel
    fn duty(&self, channel: usize) -> u16;

    /// Set the shared carrier frequency in Hz
    ///
    /// Returns false if the timebase cannot reach that frequency.
    fn set_frequency(&mut self, hz: u32) -> bool;

    /// Stop or start the carrier for all channels
    fn set_enabled(&mut self, enabled: bool);
}
