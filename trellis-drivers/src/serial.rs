//! UART serial port
//!
//! Stream driver over a non-blocking UART. The runtime's pump moves bytes
//! between the port FIFOs and the stream buffers every tick, so receive and
//! transmit requests need no action here. Line faults seen while reading
//! are held until the next poll and raised as hardware errors carrying the
//! fault's code.

use trellis_core::config::schema::{SlotDesc, SlotValue};
use trellis_core::driver::{Category, DeviceDescriptor, DeviceDriver, StreamDriver};
use trellis_core::event::MAX_EVENT_KINDS;
use trellis_core::runtime::DeviceIo;
use trellis_core::DeviceError;
use trellis_hal::uart::{Parity, Serial, SerialError, StopBits, UartConfig};

use crate::type_id;
use crate::units::{instance_count, Units};

/// Config slot positions
pub mod slot {
    pub const BAUDRATE: usize = 0;
    pub const PARITY: usize = 1;
    pub const STOP_BITS: usize = 2;
}

const PARITIES: &[&str] = &["none", "even", "odd"];
const STOP_BITS: &[&str] = &["1", "2"];

/// Config schema
pub const SLOTS: &[SlotDesc] = &[
    SlotDesc::integer("baudrate", 115_200),
    SlotDesc::option("parity", PARITIES, 0),
    SlotDesc::option("stop_bits", STOP_BITS, 0),
];

/// Stream buffer capacity per port
pub const BUFFER_SIZE: usize = 128;

struct Port<U> {
    uart: U,
    config: UartConfig,
    fault: Option<SerialError>,
}

/// UART ports, one per instance
pub struct SerialPort<U, const N: usize> {
    ports: Units<Port<U>, N>,
}

impl<U: Serial, const N: usize> SerialPort<U, N> {
    /// Device type descriptor
    pub const DESCRIPTOR: DeviceDescriptor =
        DeviceDescriptor::new("serial", type_id::SERIAL, Category::Stream)
            .with_slots(SLOTS)
            .with_instances(instance_count(N))
            .with_event_kinds(MAX_EVENT_KINDS as u8)
            .with_buffer_size(BUFFER_SIZE);

    /// Create the driver
    pub fn new(uarts: [U; N]) -> Self {
        let ports = uarts.map(|uart| Port {
            uart,
            config: UartConfig::default(),
            fault: None,
        });
        Self {
            ports: Units::new(ports),
        }
    }
}

impl<U: Serial, const N: usize> DeviceDriver for SerialPort<U, N> {
    fn reset(&self, instance: u8) {
        self.ports.with(instance, |port| {
            port.fault = None;
            // Flush whatever the receiver still holds
            let mut scratch = [0u8; 16];
            while port.uart.readable() > 0 {
                match port.uart.try_read(&mut scratch) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        });
    }

    fn commit(&self, instance: u8, slot: usize, value: &SlotValue) -> Result<(), DeviceError> {
        self.ports
            .with(instance, |port| {
                match (slot, value) {
                    (slot::BAUDRATE, SlotValue::Int(baud)) if *baud > 0 => {
                        port.config.baudrate = *baud as u32;
                    }
                    (slot::PARITY, SlotValue::Option(index)) => {
                        port.config.parity = match index {
                            0 => Parity::None,
                            1 => Parity::Even,
                            2 => Parity::Odd,
                            _ => return Err(DeviceError::InvalidArgument),
                        };
                    }
                    (slot::STOP_BITS, SlotValue::Option(index)) => {
                        port.config.stop_bits = match index {
                            0 => StopBits::One,
                            1 => StopBits::Two,
                            _ => return Err(DeviceError::InvalidArgument),
                        };
                    }
                    _ => return Err(DeviceError::InvalidArgument),
                }
                port.uart.configure(&port.config);
                Ok(())
            })
            .unwrap_or(Err(DeviceError::NotFound))
    }

    fn poll(&self, io: &mut DeviceIo<'_>) {
        let fault = self
            .ports
            .with(io.instance(), |port| port.fault.take())
            .flatten();
        if let Some(fault) = fault {
            warn!("serial {} line fault {}", io.instance(), fault);
            io.raise_error(fault.code());
        }
    }
}

impl<U: Serial, const N: usize> StreamDriver for SerialPort<U, N> {
    fn send(&self, instance: u8, data: &[u8]) -> usize {
        self.ports
            .with(instance, |port| port.uart.try_write(data))
            .unwrap_or(0)
    }

    fn recv(&self, instance: u8, buf: &mut [u8]) -> usize {
        self.ports
            .with(instance, |port| match port.uart.try_read(buf) {
                Ok(count) => count,
                Err(fault) => {
                    port.fault = Some(fault);
                    0
                }
            })
            .unwrap_or(0)
    }

    fn received(&self, instance: u8) -> usize {
        self.ports
            .with(instance, |port| port.uart.readable())
            .unwrap_or(0)
    }
}
