//! Heap bring-up for on-target builds
//!
//! A linked-list allocator over one region the platform carves out of
//! DRAM before anything allocates. Host tests run without this module
//! and use the host allocator.

use linked_list_allocator::LockedHeap;

#[global_allocator]
static HEAP: LockedHeap = LockedHeap::empty();

/// Hand the allocator its backing region.
///
/// # Safety
///
/// `start..start + size` must be unused RAM, valid for the lifetime of
/// the program. Call exactly once.
pub unsafe fn init(start: *mut u8, size: usize) {
    HEAP.lock().init(start, size);
}

/// Bytes still available on the heap
pub fn free() -> usize {
    HEAP.lock().free()
}
