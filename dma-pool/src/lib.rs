//! Static DMA memory pool for bare-metal block drivers.
//!
//! Early-boot DMA engines place two demands the caller's buffers rarely
//! meet: cache-line alignment and a physically contiguous window. This
//! crate provides both from a compiled-in pool:
//!
//! - [`DmaPool`] - a spin-locked bump allocator over static storage (or an
//!   externally provided region)
//! - [`BounceBuffer`] - a pool allocation the driver stages transfers
//!   through, with explicit copy-in/copy-out
//! - [`IdmaDescriptor`] / [`build_descriptor_chain`] - the internal-DMA
//!   descriptor chain covering a bounce buffer, one descriptor per 4 KB
//!   span (8 blocks of 512 bytes)
//!
//! # Usage
//!
//! ```ignore
//! use dma_pool::{BounceBuffer, DmaPool};
//!
//! DmaPool::init_static();
//! let mut bounce = BounceBuffer::alloc(len)?;
//! let used = dma_pool::build_descriptor_chain(&mut descs, bounce.paddr(), len, 512)?;
//! // hand descs[..used] to the controller, wait for completion
//! bounce.copy_out(&mut caller_buf);
//! ```

#![no_std]

use core::ptr::NonNull;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Page size (4KB); also the data span covered by one IDMA descriptor.
pub const PAGE_SIZE: usize = 4096;

/// Default static pool size (2MB).
pub const DEFAULT_POOL_SIZE: usize = 2 * 1024 * 1024;

/// Alignment required by the controller for buffers and descriptors.
pub const DMA_ALIGN: usize = 64;

/// Align a value up to the given alignment.
#[inline]
pub const fn align_up(val: usize, align: usize) -> usize {
    (val + align - 1) & !(align - 1)
}

/// Align a value down to the given alignment.
#[inline]
pub const fn align_down(val: usize, align: usize) -> usize {
    val & !(align - 1)
}

/// Convert bytes to pages (rounded up).
#[inline]
pub const fn bytes_to_pages(bytes: usize) -> usize {
    align_up(bytes, PAGE_SIZE) / PAGE_SIZE
}

/// DMA pool errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaError {
    /// Pool not initialized.
    NotInitialized,
    /// Requested zero bytes.
    ZeroLength,
    /// Not enough memory in pool.
    OutOfMemory,
    /// Pool already initialized.
    AlreadyInitialized,
    /// Invalid memory region.
    InvalidRegion,
    /// Descriptor array too small for the transfer.
    TooManyDescriptors,
}

/// Result type for DMA operations.
pub type Result<T> = core::result::Result<T, DmaError>;

// ============================================================================
// IDMA descriptors
// ============================================================================

/// Descriptor is owned by the DMA engine until completion.
pub const IDMA_OWN: u32 = 1 << 31;
/// Chained descriptor layout (next pointer in the fourth word).
pub const IDMA_CH: u32 = 1 << 4;
/// First descriptor of a transfer.
pub const IDMA_FS: u32 = 1 << 3;
/// Last descriptor of a transfer.
pub const IDMA_LD: u32 = 1 << 2;

/// One internal-DMA descriptor, laid out as the controller reads it.
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy)]
pub struct IdmaDescriptor {
    /// OWN/CH/FS/LD control flags.
    pub flags: u32,
    /// Byte count covered by this descriptor.
    pub cnt: u32,
    /// Physical buffer address.
    pub addr: u32,
    /// Physical address of the next descriptor in the chain.
    pub next: u32,
}

impl IdmaDescriptor {
    /// An empty, unowned descriptor.
    pub const fn empty() -> Self {
        Self {
            flags: 0,
            cnt: 0,
            addr: 0,
            next: 0,
        }
    }
}

/// Build a descriptor chain over a bounce buffer.
///
/// Each descriptor covers up to one page (8 blocks of 512 bytes); the last
/// one carries the remainder and the `LD` flag. Returns the number of
/// descriptors used.
pub fn build_descriptor_chain(
    descs: &mut [IdmaDescriptor],
    buf_paddr: usize,
    total_len: usize,
    block_len: usize,
) -> Result<usize> {
    if total_len == 0 || block_len == 0 {
        return Err(DmaError::ZeroLength);
    }

    let blocks_per_desc = PAGE_SIZE / block_len;
    let mut remaining_blocks = total_len.div_ceil(block_len);
    let base = descs.as_ptr() as usize;
    let mut index = 0usize;

    loop {
        if index >= descs.len() {
            return Err(DmaError::TooManyDescriptors);
        }

        let mut flags = IDMA_OWN | IDMA_CH;
        if index == 0 {
            flags |= IDMA_FS;
        }
        let cnt = if remaining_blocks <= blocks_per_desc {
            flags |= IDMA_LD;
            remaining_blocks * block_len
        } else {
            blocks_per_desc * block_len
        };

        let this = &mut descs[index];
        this.flags = flags;
        this.cnt = cnt as u32;
        this.addr = (buf_paddr + index * PAGE_SIZE) as u32;
        this.next = (base + (index + 1) * core::mem::size_of::<IdmaDescriptor>()) as u32;

        index += 1;
        if remaining_blocks <= blocks_per_desc {
            break;
        }
        remaining_blocks -= blocks_per_desc;
    }

    // Last descriptor terminates the chain
    descs[index - 1].next = 0;
    Ok(index)
}

// ============================================================================
// Global DMA pool
// ============================================================================

/// Aligned static storage (fallback when no external region is given).
#[repr(C, align(4096))]
struct StaticStorage {
    data: [u8; DEFAULT_POOL_SIZE],
}

static mut STATIC_STORAGE: StaticStorage = StaticStorage {
    data: [0u8; DEFAULT_POOL_SIZE],
};

struct PoolState {
    base: AtomicUsize,
    size: AtomicUsize,
    offset: AtomicUsize,
}

static POOL: PoolState = PoolState {
    base: AtomicUsize::new(0),
    size: AtomicUsize::new(0),
    offset: AtomicUsize::new(0),
};

static INITIALIZED: AtomicBool = AtomicBool::new(false);
static LOCK: AtomicBool = AtomicBool::new(false);

#[inline]
fn lock() {
    while LOCK
        .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
        .is_err()
    {
        core::hint::spin_loop();
    }
}

#[inline]
fn unlock() {
    LOCK.store(false, Ordering::Release);
}

/// Global DMA memory pool.
///
/// A singleton bump allocator; initialize once at startup, then any driver
/// can allocate from it. Allocations are only reclaimed by [`DmaPool::reset`].
pub struct DmaPool;

impl DmaPool {
    /// Initialize with the built-in static storage.
    pub fn init_static() {
        if INITIALIZED.swap(true, Ordering::SeqCst) {
            return;
        }

        // SAFETY: single-threaded init, storage is ours
        unsafe {
            let base = core::ptr::addr_of_mut!(STATIC_STORAGE.data) as usize;
            core::ptr::write_bytes(base as *mut u8, 0, DEFAULT_POOL_SIZE);
            POOL.base.store(base, Ordering::SeqCst);
            POOL.size.store(DEFAULT_POOL_SIZE, Ordering::SeqCst);
        }
    }

    /// Initialize with an externally-provided memory region.
    ///
    /// # Safety
    ///
    /// - `base` must be a valid, identity-mapped physical address.
    /// - The region must not be used by anything else and must remain valid
    ///   for the lifetime of the program.
    pub unsafe fn init_external(base: usize, size: usize) -> Result<()> {
        if INITIALIZED.swap(true, Ordering::SeqCst) {
            return Err(DmaError::AlreadyInitialized);
        }
        if base % PAGE_SIZE != 0 || size < PAGE_SIZE {
            INITIALIZED.store(false, Ordering::SeqCst);
            return Err(DmaError::InvalidRegion);
        }

        core::ptr::write_bytes(base as *mut u8, 0, size);
        POOL.base.store(base, Ordering::SeqCst);
        POOL.size.store(size, Ordering::SeqCst);
        Ok(())
    }

    /// Check if the pool is initialized.
    #[inline]
    pub fn is_initialized() -> bool {
        INITIALIZED.load(Ordering::SeqCst)
    }

    /// Base address of the pool region, or 0 before initialization.
    ///
    /// Every pool allocation lives within `base()..base() + pool size`, so
    /// a truncated physical address can be mapped back to its allocation.
    pub fn base() -> usize {
        POOL.base.load(Ordering::SeqCst)
    }

    /// Allocate `len` bytes aligned to [`DMA_ALIGN`], zeroed.
    ///
    /// Returns (physical_address, virtual_address); the two are equal under
    /// the identity mapping this pool requires.
    pub fn alloc(len: usize) -> Result<(usize, NonNull<u8>)> {
        if !Self::is_initialized() {
            return Err(DmaError::NotInitialized);
        }
        if len == 0 {
            return Err(DmaError::ZeroLength);
        }

        let pool_size = POOL.size.load(Ordering::Relaxed);

        lock();
        let offset = POOL.offset.load(Ordering::Relaxed);
        let aligned_offset = align_up(offset, DMA_ALIGN);
        let new_offset = aligned_offset + align_up(len, DMA_ALIGN);
        if new_offset > pool_size {
            unlock();
            return Err(DmaError::OutOfMemory);
        }
        POOL.offset.store(new_offset, Ordering::SeqCst);
        unlock();

        let base = POOL.base.load(Ordering::Relaxed);
        let paddr = base + aligned_offset;
        let ptr = paddr as *mut u8;
        // SAFETY: range is inside the pool, reserved above
        unsafe {
            core::ptr::write_bytes(ptr, 0, len);
        }
        let vaddr = NonNull::new(ptr).ok_or(DmaError::OutOfMemory)?;
        Ok((paddr, vaddr))
    }

    /// Get remaining free space in bytes.
    pub fn free_space() -> usize {
        if !Self::is_initialized() {
            return 0;
        }
        let size = POOL.size.load(Ordering::Relaxed);
        let offset = POOL.offset.load(Ordering::Relaxed);
        size.saturating_sub(offset)
    }

    /// Reset the allocator.
    ///
    /// # Safety
    ///
    /// All previous allocations must be abandoned; nothing may touch them
    /// after the reset.
    pub unsafe fn reset() {
        lock();
        POOL.offset.store(0, Ordering::SeqCst);
        unlock();
    }
}

// SAFETY: state is atomics guarded by the spinlock above
unsafe impl Sync for PoolState {}
unsafe impl Send for PoolState {}

// ============================================================================
// Bounce buffer
// ============================================================================

/// A pool allocation a driver stages DMA transfers through.
///
/// The caller's buffer never reaches the controller: writes are copied in
/// before the transfer, reads are copied out after completion.
pub struct BounceBuffer {
    paddr: usize,
    ptr: NonNull<u8>,
    len: usize,
}

impl BounceBuffer {
    /// Allocate a bounce buffer of `len` bytes from the global pool.
    pub fn alloc(len: usize) -> Result<Self> {
        let (paddr, ptr) = DmaPool::alloc(len)?;
        Ok(Self { paddr, ptr, len })
    }

    /// Physical address handed to the DMA engine.
    pub fn paddr(&self) -> usize {
        self.paddr
    }

    /// Buffer length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Stage caller data into the buffer before a write transfer.
    pub fn copy_in(&mut self, src: &[u8]) {
        let take = src.len().min(self.len);
        // SAFETY: buffer is a live pool allocation of self.len bytes
        unsafe {
            core::ptr::copy_nonoverlapping(src.as_ptr(), self.ptr.as_ptr(), take);
        }
    }

    /// Copy completed read data out to the caller.
    pub fn copy_out(&self, dst: &mut [u8]) {
        let take = dst.len().min(self.len);
        // SAFETY: buffer is a live pool allocation of self.len bytes
        unsafe {
            core::ptr::copy_nonoverlapping(self.ptr.as_ptr(), dst.as_mut_ptr(), take);
        }
    }

    /// View the staged bytes.
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: buffer is a live pool allocation of self.len bytes
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Mutable view of the staged bytes.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: buffer is a live pool allocation of self.len bytes
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

// ============================================================================
// Tests
// ============================================================================
