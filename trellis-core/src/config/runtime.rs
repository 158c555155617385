//! Runtime tunables
//!
//! Compile-time capacities live next to the structures they size; this type
//! only carries the knobs that can change without a rebuild. Firmware may
//! store it as a postcard blob and decode it at startup.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Runtime configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RuntimeConfig {
    /// Maximum bytes moved per direction per stream device on each poll
    pub pump_chunk: u16,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { pump_chunk: 64 }
    }
}

#[cfg(feature = "serde")]
impl RuntimeConfig {
    /// Decode from a postcard blob
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }

    /// Encode into `buf`, returning the used prefix
    pub fn to_bytes<'b>(&self, buf: &'b mut [u8]) -> Result<&'b mut [u8], postcard::Error> {
        postcard::to_slice(self, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_nonzero() {
        let config = RuntimeConfig::default();
        assert!(config.pump_chunk > 0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_postcard_blob() {
        let config = RuntimeConfig { pump_chunk: 16 };
        let mut buf = [0u8; 16];
        let used = config.to_bytes(&mut buf).unwrap().len();
        assert_eq!(RuntimeConfig::from_bytes(&buf[..used]).unwrap(), config);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_truncated_blob_rejected() {
        assert!(RuntimeConfig::from_bytes(&[]).is_err());
    }
}
