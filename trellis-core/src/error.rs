//! Error types
//!
//! Every synchronous entry point returns one of these; nothing in the core
//! panics on a bad call.

/// Stream engine failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StreamError {
    /// The direction was shut down
    Closed,
    /// Receive side is full and waiting for a reader
    Blocked,
    /// Operation conflicts with an active pipe
    Piped,
    /// One of the streams already has a pipe partner
    AlreadyPiped,
    /// A stream cannot be piped into itself
    SelfPipe,
    /// The stream has no pipe to detach
    NotPiped,
}

/// Device framework errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceError {
    /// Bad config value or malformed call
    InvalidArgument,
    /// No free device slot, stream or registry entry
    ResourceExhausted,
    /// Data operation on a disabled device
    NotEnabled,
    /// Configuration change on an enabled device
    AlreadyEnabled,
    /// Capability absent for this device type
    NotImplemented,
    /// Handle token does not match the slot's current generation
    Stale,
    /// No device type or hardware instance by that name/index
    NotFound,
    /// Hardware instance already allocated
    InUse,
    /// Driver-reported fault
    HardwareError(u16),
    /// Stream engine failure
    Stream(StreamError),
}

impl From<StreamError> for DeviceError {
    fn from(err: StreamError) -> Self {
        DeviceError::Stream(err)
    }
}

impl DeviceError {
    /// Check if retrying the same call later can succeed
    ///
    /// Only conditions that clear by themselves (a reader freeing buffer
    /// space, a slot being destroyed) count as transient.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DeviceError::ResourceExhausted
                | DeviceError::InUse
                | DeviceError::Stream(StreamError::Blocked)
        )
    }
}
