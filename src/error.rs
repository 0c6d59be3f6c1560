//! Error types for the storage layer.

use alloc::string::String;
use core::fmt;

/// Result type for fallible storage operations.
pub type FsResult<T> = Result<T, FsError>;

/// Errors surfaced by the disk and byte store layers.
///
/// End-of-data on read and upstream channel exhaustion are not errors; they
/// are reported through `Option` / zero-count returns instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FsError {
    /// The disk has reached its block limit and cannot grow further.
    OutOfBlocks,
    /// A channel failed mid-transfer.
    Io(String),
}

impl FsError {
    /// Create an I/O error with a message.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsError::OutOfBlocks => write!(f, "out of storage blocks"),
            FsError::Io(msg) => write!(f, "channel i/o error: {}", msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    #[test]
    fn test_io_construction() {
        let err = FsError::io("broken pipe");
        match err {
            FsError::Io(msg) => assert_eq!(msg, "broken pipe"),
            _ => panic!("Expected Io"),
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", FsError::OutOfBlocks), "out of storage blocks");
    }
}
