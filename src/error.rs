use thiserror::Error;

/// Errors that can occur when commanding an FE-C trainer
#[derive(Error, Debug)]
pub enum FecError {
    /// A command parameter is outside its documented range
    #[error("Invalid value ({value}) for {field}, must be {min}...{max}")]
    OutOfRange {
        /// Name of the offending command field
        field: &'static str,
        /// Inclusive lower bound
        min: f32,
        /// Inclusive upper bound
        max: f32,
        /// Value supplied by the caller
        value: f32,
    },

    /// An integer command parameter is outside its documented range
    #[error("Invalid value ({value}) for {field}, must be {min}...{max}")]
    IntegerOutOfRange {
        /// Name of the offending command field
        field: &'static str,
        /// Inclusive lower bound
        min: i64,
        /// Inclusive upper bound
        max: i64,
        /// Value supplied by the caller
        value: i64,
    },

    /// Bluetooth Low Energy related errors
    #[error("BLE error: {0}")]
    Ble(#[from] btleplug::Error),

    /// No trainer advertising the FE-C service was found
    #[error("FE-C trainer not found")]
    DeviceNotFound,

    /// Device connection failed
    #[error("Failed to connect to device: {0}")]
    ConnectionFailed(String),

    /// Device disconnected unexpectedly
    #[error("Device disconnected")]
    Disconnected,

    /// Transport operation timeout
    #[error("Operation timed out after {timeout_ms}ms")]
    Timeout {
        /// Timeout duration in milliseconds
        timeout_ms: u64,
    },

    /// The peripheral does not expose the expected service layout
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Result type for FE-C operations
pub type Result<T> = std::result::Result<T, FecError>;

impl FecError {
    /// Check if this error is a rejected command parameter
    #[must_use]
    pub const fn is_range_error(&self) -> bool {
        matches!(
            self,
            Self::OutOfRange { .. } | Self::IntegerOutOfRange { .. }
        )
    }

    /// Check if this error indicates a connection issue
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Ble(_) | Self::ConnectionFailed(_) | Self::Disconnected | Self::DeviceNotFound
        )
    }

    /// Check if this error is recoverable by the caller
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::OutOfRange { .. } | Self::IntegerOutOfRange { .. }
        )
    }

    pub(crate) const fn out_of_range(field: &'static str, min: f32, max: f32, value: f32) -> Self {
        Self::OutOfRange {
            field,
            min,
            max,
            value,
        }
    }
}
