//! Boot-medium storage abstraction
//!
//! A `no_std` layer between the boot orchestrator and the physical media it
//! can load from. Three pieces:
//!
//! - [`BlockBackend`] - a byte-range reader over one partition, with one
//!   adapter per medium class: block-granular devices ([`BlockDeviceBackend`]),
//!   byte-addressed flash drivers ([`FlashBackend`]) and memory-mapped NOR
//!   windows ([`XipBackend`])
//! - [`BlockIo`] / [`FlashRead`] - the native contracts those adapters
//!   consume from the drivers underneath
//! - [`PartitionTable`] - named byte ranges built from a board-level
//!   descriptor string
//!
//! The loader only ever reads from the boot medium; write and erase exist on
//! [`BlockIo`] for provisioning tools sharing the same driver.

#![no_std]
#![warn(missing_docs)]

pub mod backend;
pub mod error;
pub mod partition;

pub use backend::{
    BlockBackend, BlockDeviceBackend, BlockIo, FlashBackend, FlashRead, MediumKind, XipBackend,
    MAX_BLOCK_LEN,
};
pub use error::{Result, StorageError};
pub use partition::{Partition, PartitionTable, GPT_RESERVED_BYTES, MAX_PARTITIONS};
