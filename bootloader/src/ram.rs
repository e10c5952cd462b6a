//! RAM map and hand-off seams
//!
//! The loader never touches physical memory directly; it asks a [`Ram`]
//! implementation for a mutable window at each load address. On target
//! that is a raw view of DRAM; in tests it is an arena that records what
//! was written where.
//!
//! [`Handoff`] is the other side of the boot: cache maintenance and the
//! non-returning jump into the loaded image. Both live with the platform
//! code, not here.

use crate::error::BootError;

/// Mutable windows over the physical load-address space
pub trait Ram {
    /// Borrow `len` writable bytes at physical address `addr`.
    ///
    /// Fails with [`BootError::BadLoadRegion`] when any byte of the
    /// window falls outside the RAM map.
    fn window(&mut self, addr: u64, len: usize) -> Result<&mut [u8], BootError>;
}

/// Platform trampoline contract
pub trait Handoff {
    /// Clean the data cache so the loaded regions are visible to the
    /// next stage. Required before jumping when the boot medium is
    /// memory-mapped.
    fn clean_dcache(&mut self);

    /// Jump to `entry`. Never returns.
    fn jump(&mut self, entry: u64) -> !;
}

/// [`Ram`] over one contiguous physical DRAM bank.
///
/// # Safety contract
///
/// The caller guarantees the described range is plain RAM, owned by the
/// loader and not aliased by anything else for the lifetime of this
/// value. Construction is `unsafe` for that reason; `window` itself is
/// then safe.
pub struct RawRam {
    base: u64,
    len: usize,
}

impl RawRam {
    /// Describe a DRAM bank of `len` bytes starting at `base`.
    ///
    /// # Safety
    ///
    /// See the type-level contract.
    pub unsafe fn new(base: u64, len: usize) -> Self {
        Self { base, len }
    }
}

impl Ram for RawRam {
    fn window(&mut self, addr: u64, len: usize) -> Result<&mut [u8], BootError> {
        let end = addr.checked_add(len as u64).ok_or(BootError::BadLoadRegion)?;
        if addr < self.base || end > self.base + self.len as u64 {
            return Err(BootError::BadLoadRegion);
        }
        // In range per the constructor's contract
        let ptr = addr as usize as *mut u8;
        Ok(unsafe { core::slice::from_raw_parts_mut(ptr, len) })
    }
}
