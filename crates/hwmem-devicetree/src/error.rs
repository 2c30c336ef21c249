//! Error types for the device tree backend

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Device tree backend errors
#[derive(Debug, Error)]
pub enum DevicetreeError {
    /// No device tree found at any of the searched locations
    #[error("Device tree not found (searched: {0})")]
    RootNotFound(String),

    /// Failed to list a node directory
    #[error("Failed to read node '{}': {source}", .path.display())]
    ReadNode {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to read a property file
    #[error("Failed to read property '{}': {source}", .path.display())]
    ReadProperty {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Property content does not have the expected layout
    #[error("Malformed property '{}': {message}", .path.display())]
    MalformedProperty { path: PathBuf, message: String },

    /// Failed to map physical memory
    #[error("Failed to map memory at {address:#x} (size {size:#x}): {source}")]
    MemoryMap {
        address: u64,
        size: usize,
        #[source]
        source: io::Error,
    },

    /// Access outside a mapped window
    #[error("Access of {len} bytes at offset {offset:#x} exceeds the {size:#x}-byte mapping")]
    OutOfWindow {
        offset: usize,
        len: usize,
        size: usize,
    },

    /// Operation not supported on this platform
    #[error("Not supported: {0}")]
    NotSupported(&'static str),

    /// Unknown or malformed bus parameter
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },
}

/// Result type for device tree operations
pub type Result<T> = std::result::Result<T, DevicetreeError>;
