//! `nand_boot` / `nor_boot`: boot from a byte-addressed flash driver
//!
//! Flash media carry no on-medium partition descriptor the loader can
//! build itself; the caller supplies the table its driver discovered.
//! The medium kind is tagged explicitly so diagnostics and cache policy
//! never misreport NAND as NOR.

use storage::{FlashBackend, FlashRead, MediumKind, PartitionTable};

use crate::bprintln;
use crate::cmd::{attempt, BootContext};
use crate::APPLICATION_PART;

fn flash_boot<F: FlashRead>(
    ctx: &mut BootContext<'_>,
    flash: &mut F,
    table: &PartitionTable,
    kind: MediumKind,
    what: &str,
) -> i32 {
    let (base, size) = match table.find(APPLICATION_PART) {
        Ok(part) => (part.start, part.size),
        Err(err) => {
            bprintln!("{what}: {err}");
            return 1;
        }
    };

    let mut backend = match FlashBackend::new(flash, base, size, kind) {
        Ok(backend) => backend,
        Err(err) => {
            bprintln!("{what}: backend setup failed: {err}");
            return 1;
        }
    };
    attempt(&mut backend, ctx)
}

/// Boot from SPI NAND
pub fn nand_boot<F: FlashRead>(
    ctx: &mut BootContext<'_>,
    flash: &mut F,
    table: &PartitionTable,
) -> i32 {
    bprintln!("nand_boot");
    flash_boot(ctx, flash, table, MediumKind::SpiNand, "nand_boot")
}

/// Boot from SPI NOR
pub fn nor_boot<F: FlashRead>(
    ctx: &mut BootContext<'_>,
    flash: &mut F,
    table: &PartitionTable,
) -> i32 {
    bprintln!("nor_boot");
    flash_boot(ctx, flash, table, MediumKind::SpiNor, "nor_boot")
}
