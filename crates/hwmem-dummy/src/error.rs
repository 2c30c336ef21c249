//! Error types for the dummy bus

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Dummy bus errors
#[derive(Debug, Error)]
pub enum DummyError {
    /// Failed to read the bus description
    #[error("Failed to read bus description '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Bus description is not valid RON
    #[error("Failed to parse bus description: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Device has a zero-sized window
    #[error("Device '{0}' has an empty register window")]
    EmptyWindow(String),

    /// Window size does not fit in memory
    #[error("Device '{0}' has a register window too large to emulate")]
    WindowTooLarge(String),

    /// Device lists no compatibility strings
    #[error("Device '{0}' has no compatible strings")]
    NoCompatible(String),

    /// Unknown or malformed bus parameter
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },
}

/// Result type for dummy bus operations
pub type Result<T> = std::result::Result<T, DummyError>;
