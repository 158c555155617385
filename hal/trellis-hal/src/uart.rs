//! UART serial communication abstractions
//!
//! The stream engine never waits on hardware, so these traits are
//! non-blocking: every call moves as many bytes as the peripheral FIFO
//! allows right now and reports the count.

/// Faults reported by a UART receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SerialError {
    /// Receive FIFO overflowed and bytes were lost
    Overrun,
    /// Stop bit missing
    Framing,
    /// Parity check failed
    Parity,
    /// Line held low for longer than a frame
    Break,
}

impl SerialError {
    /// Numeric fault code surfaced through device error events
    pub fn code(self) -> u16 {
        match self {
            SerialError::Overrun => 1,
            SerialError::Framing => 2,
            SerialError::Parity => 3,
            SerialError::Break => 4,
        }
    }
}

/// UART transmitter
pub trait SerialTx {
    /// Queue bytes into the transmit FIFO
    ///
    /// Returns how many bytes were accepted; zero when the FIFO is full.
    fn try_write(&mut self, data: &[u8]) -> usize;

    /// Number of bytes the transmit FIFO can accept right now
    fn writable(&self) -> usize;
}

/// UART receiver
pub trait SerialRx {
    /// Take received bytes out of the receive FIFO
    ///
    /// Returns how many bytes were copied into `buf`; zero when nothing is
    /// pending.
    fn try_read(&mut self, buf: &mut [u8]) -> Result<usize, SerialError>;

    /// Number of bytes waiting in the receive FIFO
    fn readable(&self) -> usize;
}

/// Combined UART interface
pub trait Serial: SerialTx + SerialRx {
    /// Apply line settings
    fn configure(&mut self, config: &UartConfig);
}

/// UART configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UartConfig {
    /// Baud rate in bits per second
    pub baudrate: u32,
    /// Number of data bits (typically 8)
    pub data_bits: DataBits,
    /// Parity mode
    pub parity: Parity,
    /// Number of stop bits
    pub stop_bits: StopBits,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            baudrate: 115200,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

/// Number of data bits per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataBits {
    Seven,
    Eight,
}

/// Parity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopBits {
    One,
    Two,
}
