//! Boot Orchestrator
//!
//! The top of the second-stage pipeline: pick a boot medium, bind a
//! byte-range backend to the `"os"` partition, pull every firmware image
//! out of the boot container into RAM, and jump through the platform
//! trampoline.
//!
//! # Overview
//!
//! The crate is a library; the platform's entry code owns the hardware
//! and feeds it in:
//! - [`Ram`] - mutable windows over physical load addresses
//! - [`Handoff`] - cache maintenance and the non-returning jump
//! - [`console`] - a pluggable `fmt::Write` sink for diagnostics
//!
//! The shell-facing surface lives in [`cmd`]: one command per boot
//! medium, each printing a diagnostic and returning a non-zero status on
//! failure. A successful command never returns.
//!
//! Every failure along the pipeline is fatal to the boot attempt; there
//! is no medium-level fallback and a partially loaded image is never
//! executed.

#![no_std]
#![warn(missing_docs)]

pub mod cmd;
pub mod console;
pub mod error;
#[cfg(feature = "baremetal")]
pub mod heap;
pub mod loader;
pub mod ram;

pub use error::BootError;
pub use loader::{boot, load, LoadSummary};
pub use ram::{Handoff, Ram, RawRam};

/// Partition holding the boot container, fixed across all boards
pub const APPLICATION_PART: &str = "os";

#[cfg(all(feature = "baremetal", not(test)))]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    bprintln!("panic: {}", info);
    loop {
        core::hint::spin_loop();
    }
}
