//! Error types for the SD/eMMC engine

use core::fmt;

/// Result type for SD/eMMC operations
pub type Result<T> = core::result::Result<T, MmcError>;

/// Errors raised by the protocol engine.
///
/// All of these are terminal for the current boot attempt; the only
/// retries are the bounded ceilings inside identification itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmcError {
    /// Command was not acknowledged within the command timeout
    CommandTimeout,

    /// Card response carried an error indication
    ResponseError,

    /// Response failed its CRC check
    ResponseCrcError,

    /// Data phase failed (CRC, start-bit or FIFO error)
    DataError,

    /// Data phase exceeded the computed transfer timeout
    DataTimeout,

    /// Card never left busy during op-cond negotiation
    CardNotResponding,

    /// Card answered but with capabilities this engine cannot drive
    UnusableCard,

    /// DMA staging resources could not be allocated
    DmaSetup,
}

impl fmt::Display for MmcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommandTimeout => write!(f, "Command timeout"),
            Self::ResponseError => write!(f, "Card response error"),
            Self::ResponseCrcError => write!(f, "Response CRC error"),
            Self::DataError => write!(f, "Data phase error"),
            Self::DataTimeout => write!(f, "Data phase timeout"),
            Self::CardNotResponding => write!(f, "Card not responding"),
            Self::UnusableCard => write!(f, "Card capabilities unusable"),
            Self::DmaSetup => write!(f, "DMA staging allocation failed"),
        }
    }
}

impl From<dma_pool::DmaError> for MmcError {
    fn from(_: dma_pool::DmaError) -> Self {
        Self::DmaSetup
    }
}
