//! Boot-attempt errors
//!
//! One wrapper enum over the per-layer error types. Every variant is
//! fatal to the current boot attempt; the command layer prints it and
//! returns a failure status.

use core::fmt;

use fitimage::FitError;
use sdmc::MmcError;
use storage::StorageError;

/// Fatal boot-attempt error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootError {
    /// Container parsing or payload resolution failed
    Container(FitError),
    /// Boot-medium read or partition construction failed
    Storage(StorageError),
    /// Card bring-up or transfer failed
    Mmc(MmcError),
    /// Container claims more bytes than the staging buffer holds
    ContainerTooLarge,
    /// A load address or size falls outside the RAM map
    BadLoadRegion,
    /// The selected configuration lists no firmware image
    NoFirmware,
}

impl From<FitError> for BootError {
    fn from(err: FitError) -> Self {
        BootError::Container(err)
    }
}

impl From<StorageError> for BootError {
    fn from(err: StorageError) -> Self {
        BootError::Storage(err)
    }
}

impl From<MmcError> for BootError {
    fn from(err: MmcError) -> Self {
        BootError::Mmc(err)
    }
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootError::Container(err) => write!(f, "container: {err}"),
            BootError::Storage(err) => write!(f, "storage: {err}"),
            BootError::Mmc(err) => write!(f, "mmc: {err}"),
            BootError::ContainerTooLarge => write!(f, "container exceeds staging buffer"),
            BootError::BadLoadRegion => write!(f, "load region outside RAM map"),
            BootError::NoFirmware => write!(f, "configuration lists no firmware image"),
        }
    }
}
