//! `xip_boot` / `ram_boot`: boot from memory-mapped or preloaded images

use storage::XipBackend;

use crate::bprintln;
use crate::cmd::{attempt, BootContext};

/// Bytes assumed readable past a `ram_boot` source address.
///
/// The container's own total-size field bounds what is actually parsed;
/// the window only has to cover the container plus appended payloads.
pub const RAM_IMAGE_WINDOW: usize = 32 * 1024 * 1024;

/// Boot from a memory-mapped NOR window.
///
/// `base` is the container's offset inside the window.
pub fn xip_boot(ctx: &mut BootContext<'_>, window: &[u8], base: u64) -> i32 {
    bprintln!("xip_boot: window base {:#x}", base);

    let mut backend = match XipBackend::new(window, base) {
        Ok(backend) => backend,
        Err(err) => {
            bprintln!("xip_boot: backend setup failed: {err}");
            return 1;
        }
    };
    attempt(&mut backend, ctx)
}

/// Boot a container already sitting in memory
pub fn ram_boot_slice(ctx: &mut BootContext<'_>, image: &[u8]) -> i32 {
    bprintln!("ram_boot: image at {:p}", image.as_ptr());

    let mut backend = match XipBackend::new(image, 0) {
        Ok(backend) => backend,
        Err(err) => {
            bprintln!("ram_boot: backend setup failed: {err}");
            return 1;
        }
    };
    attempt(&mut backend, ctx)
}

/// Boot a container at a raw source address.
///
/// # Safety
///
/// `addr..addr + RAM_IMAGE_WINDOW` must be readable memory holding the
/// container and its appended payloads.
pub unsafe fn ram_boot(ctx: &mut BootContext<'_>, addr: usize) -> i32 {
    let image = core::slice::from_raw_parts(addr as *const u8, RAM_IMAGE_WINDOW);
    ram_boot_slice(ctx, image)
}
