//! Shell command surface
//!
//! One command per boot medium. Each command binds a backend to the
//! `"os"` partition (or the whole window for memory-mapped media), runs
//! the load-and-jump pipeline, and returns a non-zero status with a
//! printed diagnostic on failure. A successful command hands off and
//! never returns. [`boot_device`] routes a resolved device selector to
//! the matching command.

mod flash;
mod mem;
mod mmc;

pub use flash::{nand_boot, nor_boot};
pub use mem::{ram_boot, ram_boot_slice, xip_boot, RAM_IMAGE_WINDOW};
pub use mmc::mmc_boot;

use sdmc::{HostController, SdmcConfig};
use storage::{BlockBackend, FlashRead, PartitionTable};

use crate::bprintln;
use crate::ram::{Handoff, Ram};

/// Platform resources shared by every boot command
pub struct BootContext<'a> {
    /// RAM map for load-address windows
    pub ram: &'a mut dyn Ram,
    /// Cache maintenance and the trampoline
    pub handoff: &'a mut dyn Handoff,
    /// Staging buffer for the container itself
    pub scratch: &'a mut [u8],
}

/// Boot medium resolved from the platform's boot-source strap or a
/// caller-supplied override, carrying the resources that medium needs
pub enum BootDevice<'a, H: HostController, F: FlashRead> {
    /// SD or eMMC card behind one controller
    Mmc {
        /// Controller to bring the card up on
        host: H,
        /// Board bring-up limits for the controller
        config: SdmcConfig,
        /// Board partition descriptor string
        layout: &'a str,
    },
    /// SPI NAND behind a byte-addressed driver
    SpiNand {
        /// Flash driver
        flash: &'a mut F,
        /// Partition table the driver discovered
        table: &'a PartitionTable,
    },
    /// SPI NOR behind a byte-addressed driver
    SpiNor {
        /// Flash driver
        flash: &'a mut F,
        /// Partition table the driver discovered
        table: &'a PartitionTable,
    },
    /// Memory-mapped NOR window
    Xip {
        /// The mapped window
        window: &'a [u8],
        /// Container offset inside the window
        base: u64,
    },
    /// Container already sitting in memory
    Ram {
        /// The in-memory container
        image: &'a [u8],
    },
}

/// Route a resolved boot device to its medium's command.
///
/// Returns a non-zero status only on failure; a successful dispatch
/// hands off and never returns.
pub fn boot_device<H: HostController, F: FlashRead>(
    ctx: &mut BootContext<'_>,
    device: BootDevice<'_, H, F>,
) -> i32 {
    match device {
        BootDevice::Mmc {
            host,
            config,
            layout,
        } => mmc_boot(ctx, host, config, layout),
        BootDevice::SpiNand { flash, table } => nand_boot(ctx, flash, table),
        BootDevice::SpiNor { flash, table } => nor_boot(ctx, flash, table),
        BootDevice::Xip { window, base } => xip_boot(ctx, window, base),
        BootDevice::Ram { image } => ram_boot_slice(ctx, image),
    }
}

/// Run the pipeline against a bound backend. Returns only on failure.
fn attempt(backend: &mut dyn BlockBackend, ctx: &mut BootContext<'_>) -> i32 {
    match crate::loader::boot(backend, ctx.ram, ctx.scratch, ctx.handoff) {
        Ok(never) => match never {},
        Err(err) => {
            bprintln!("boot failed: {err}");
            1
        }
    }
}
