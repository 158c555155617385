//! GPIO pin abstractions
//!
//! Digital input and output pins as seen by the digital I/O group driver.

/// Digital output pin
pub trait OutputPin {
    /// Set the pin high (logic 1)
    fn set_high(&mut self);

    /// Set the pin low (logic 0)
    fn set_low(&mut self);

    /// Set the pin to a specific state
    fn set_state(&mut self, high: bool) {
        if high {
            self.set_high();
        } else {
            self.set_low();
        }
    }

    /// Check if the pin is currently driven high
    fn is_set_high(&self) -> bool;
}

/// Digital input pin
pub trait InputPin {
    /// Check if the pin reads high (logic 1)
    fn is_high(&self) -> bool;

    /// Check if the pin reads low (logic 0)
    fn is_low(&self) -> bool {
        !self.is_high()
    }
}

/// Pin direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinMode {
    /// Sampled input
    Input,
    /// Driven output
    Output,
}

/// Pin that can switch between input and output at runtime
///
/// Digital I/O groups reconfigure direction when the device is enabled.
pub trait IoPin: OutputPin + InputPin {
    /// Switch the pin direction
    fn set_mode(&mut self, mode: PinMode);
}
