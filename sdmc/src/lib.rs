//! SD/eMMC Protocol Engine
//!
//! A `no_std` driver core for SD and eMMC cards behind a DesignWare-style
//! block controller, written for the second boot stage: bring one card up,
//! read the boot payload, hand off.
//!
//! # Overview
//!
//! The engine is split along the protocol's own phases:
//! 1. **Identification** - CMD0 through CMD7 with dual-path SD/eMMC
//!    probing and bounded op-cond polling
//! 2. **Startup** - SCR/EXT_CSD capability reads, bus width and clock
//!    negotiation
//! 3. **Block I/O** - chunked multi-block transfers over a polled FIFO or
//!    an internal-DMA descriptor chain, both behind the same synchronous
//!    read/write calls
//!
//! The hardware seam is the [`HostController`] trait; platforms implement
//! it over their register block, tests implement it over scripted state.
//! Cards implement the `storage` crate's `BlockIo` contract, so the boot
//! pipeline consumes them like any other medium.

#![no_std]
#![warn(missing_docs)]

pub mod card;
pub mod cmd;
pub mod engine;
pub mod error;
pub mod host;
mod ident;
mod io;
pub mod registry;

pub use card::{data_timeout_ms, decode_csd, CardState, Geometry, Version};
pub use cmd::{Command, DataDirection, ResponseKind};
pub use engine::{Card, SdmcConfig, IDENT_CLOCK_HZ, MAX_BLOCKS_PER_CMD};
pub use error::{MmcError, Result};
pub use host::{BusWidth, HostController};
pub use registry::{CardRegistry, MAX_CONTROLLERS};
