//! Error types for storage backends and partition tables

use core::fmt;

/// Result type for storage operations
pub type Result<T> = core::result::Result<T, StorageError>;

/// Errors that can occur in the storage layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// A read or write left requested bytes unfulfilled; carries the number
    /// of bytes actually transferred
    Io(usize),

    /// Requested range falls outside the backend's address space
    OutOfRange,

    /// Partition descriptor string failed to parse or construct
    PartitionSyntax,

    /// No partition with the requested name
    PartitionNotFound,

    /// Backend cannot serve the request (e.g. oversized block length)
    Unsupported,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(actual) => write!(f, "Short transfer, {} bytes completed", actual),
            Self::OutOfRange => write!(f, "Range outside backend address space"),
            Self::PartitionSyntax => write!(f, "Invalid partition descriptor"),
            Self::PartitionNotFound => write!(f, "Partition not found"),
            Self::Unsupported => write!(f, "Operation not supported by backend"),
        }
    }
}
