//! ADC abstractions

/// Analog-to-digital converter with several multiplexed channels
pub trait AdcReader {
    /// Number of channels the converter exposes
    fn channel_count(&self) -> usize;

    /// Sample one channel
    ///
    /// Returns the raw conversion result at the configured resolution, or
    /// `None` if the channel does not exist.
    fn sample(&mut self, channel: usize) -> Option<u16>;

    /// Set the conversion resolution in bits
    ///
    /// Returns false if the converter cannot run at that resolution.
    fn set_resolution(&mut self, bits: u8) -> bool;
}
