//! Error types for hwmem-core

use thiserror::Error;

/// Boxed error produced by a backend
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure to turn the matched devices into a usable device set
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// Automatic selection found nothing to use
    #[error("no compatible device found")]
    NoDevice,

    /// `--all` was requested but nothing matched
    #[error("no compatible devices to use")]
    EmptyMatch,

    /// More than one device matched and no index was given
    #[error(
        "platform has multiple devices, device index specification is required (devices_cnt={count})"
    )]
    AmbiguousSelection {
        /// Number of matching devices
        count: usize,
    },

    /// Explicit index does not name a matched device
    #[error("can not use device {index} because platform has only {count} devices")]
    IndexOutOfRange {
        /// Requested index
        index: i64,
        /// Number of matching devices
        count: usize,
    },

    /// Both every device and one device by index were requested
    #[error("device index and all devices can not be used together")]
    ConflictingModes,
}

/// Invalid `ADDRESS [WIDTH [VALUE]]` operands
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Operand count outside `1..=3`
    #[error("expected ADDRESS [WIDTH [VALUE]], got {0} operands")]
    TokenCount(usize),

    /// ADDRESS is not a non-negative integer
    #[error("ADDRESS is in wrong format got:{0}")]
    InvalidAddress(String),

    /// WIDTH is not a positive multiple of 8
    #[error("WIDTH is in wrong format got:{0}")]
    InvalidWidth(String),

    /// VALUE is not an integer
    #[error("VALUE is in wrong format got:{0}")]
    InvalidValue(String),

    /// Write payload wider than the 64-bit value carrier
    #[error("write of {bytes} bytes is not supported (at most 8 bytes)")]
    UnsupportedWidth {
        /// Requested width in bytes
        bytes: usize,
    },
}

/// Error reported by a device backend
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Read or write issued before `attach`
    #[error("device is not attached")]
    NotAttached,

    /// Access does not fit in the device's register window
    #[error("access of {len} bytes at {address:#x} is outside the {size:#x}-byte device window")]
    OutOfBounds {
        /// Offset of the access
        address: u64,
        /// Length of the access
        len: usize,
        /// Size of the device window
        size: u64,
    },

    /// No memory for a read buffer of the requested width
    #[error("can not allocate a {len}-byte read buffer")]
    Allocation {
        /// Requested read width in bytes
        len: usize,
    },

    /// The backend could not activate the device
    #[error("attach failed: {0}")]
    Attach(#[source] BoxError),

    /// The backend failed a read
    #[error("read of {len} bytes at {address:#x} failed: {source}")]
    Read {
        /// Offset of the access
        address: u64,
        /// Length of the access
        len: usize,
        /// Backend error
        #[source]
        source: BoxError,
    },

    /// The backend failed a write
    #[error("write of {len} bytes at {address:#x} failed: {source}")]
    Write {
        /// Offset of the access
        address: u64,
        /// Length of the access
        len: usize,
        /// Backend error
        #[source]
        source: BoxError,
    },
}

/// A device that failed during dispatch
#[derive(Debug)]
pub struct DeviceFailure {
    /// Index of the device in bus enumeration order
    pub index: usize,
    /// What went wrong
    pub error: DeviceError,
}

/// Aggregate failure of a fan-out
#[derive(Debug, Error)]
pub enum DispatchError {
    /// One or more devices failed; the others were still attempted
    #[error("{} of {total} devices failed", .failures.len())]
    Failed {
        /// Devices the operation was applied to
        total: usize,
        /// Failing devices, in dispatch order
        failures: Vec<DeviceFailure>,
    },
}
