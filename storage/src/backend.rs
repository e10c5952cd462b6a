//! Byte-range read abstraction over boot media
//!
//! Every boot medium is exposed to the loader as a [`BlockBackend`]: a
//! byte-addressed reader over one partition's address space. Each variant
//! adapts byte ranges to its native unit: whole blocks for MMC, driver
//! byte reads for SPI flash, a plain memory copy for XIP.

use crate::error::{Result, StorageError};

/// Largest native block length the block adapter can buffer
pub const MAX_BLOCK_LEN: usize = 512;

/// Physical medium behind a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediumKind {
    /// SD or eMMC card behind a block-granular controller
    Mmc,
    /// SPI NAND flash behind a byte-addressed driver
    SpiNand,
    /// SPI NOR flash behind a byte-addressed driver
    SpiNor,
    /// Memory-mapped NOR, read by direct copy
    XipNor,
}

/// Byte-range reader over one partition of a boot medium.
///
/// `offset` is relative to the backend's own window, not the raw medium. A
/// successful read fills the whole buffer; a short transfer is
/// `Io(actual_len)` and the caller treats it as fatal.
pub trait BlockBackend {
    /// Read `buf.len()` bytes starting at byte `offset`
    fn read(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Backend window size in bytes
    fn capacity(&self) -> u64;

    /// Physical medium kind
    fn kind(&self) -> MediumKind;
}

/// Block-granular device, the native contract of an MMC card.
///
/// Transfers move whole blocks; `read_blocks` returns the number of blocks
/// actually transferred.
pub trait BlockIo {
    /// Native block length in bytes
    fn block_len(&self) -> usize;

    /// Device size in blocks
    fn block_count(&self) -> u64;

    /// Read whole blocks starting at `start`; `buf` holds an exact multiple
    /// of the block length
    fn read_blocks(&mut self, start: u64, buf: &mut [u8]) -> Result<usize>;

    /// Write whole blocks starting at `start`
    fn write_blocks(&mut self, start: u64, buf: &[u8]) -> Result<usize>;

    /// Erase a span of blocks
    fn erase_blocks(&mut self, start: u64, count: u64) -> Result<()>;
}

/// Byte-addressed adapter over a [`BlockIo`] device, bound to one partition.
///
/// Unaligned head and tail bytes are served through a one-block scratch
/// buffer; aligned middle spans go straight into the caller's buffer.
pub struct BlockDeviceBackend<'a, D: BlockIo> {
    device: &'a mut D,
    /// Partition start on the raw medium, in bytes
    base: u64,
    /// Partition size in bytes
    size: u64,
    scratch: [u8; MAX_BLOCK_LEN],
}

impl<'a, D: BlockIo> BlockDeviceBackend<'a, D> {
    /// Bind a device to a partition window
    pub fn new(device: &'a mut D, base: u64, size: u64) -> Result<Self> {
        if device.block_len() == 0 || device.block_len() > MAX_BLOCK_LEN {
            return Err(StorageError::Unsupported);
        }
        let device_bytes = device.block_count() * device.block_len() as u64;
        if base + size > device_bytes {
            return Err(StorageError::OutOfRange);
        }
        Ok(Self {
            device,
            base,
            size,
            scratch: [0; MAX_BLOCK_LEN],
        })
    }

    fn read_one_block(&mut self, block: u64) -> Result<()> {
        let blk_len = self.device.block_len();
        let done = self.device.read_blocks(block, &mut self.scratch[..blk_len])?;
        if done != 1 {
            return Err(StorageError::Io(0));
        }
        Ok(())
    }
}

impl<'a, D: BlockIo> BlockBackend for BlockDeviceBackend<'a, D> {
    fn read(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if offset + buf.len() as u64 > self.size {
            return Err(StorageError::OutOfRange);
        }
        let blk_len = self.device.block_len() as u64;
        let abs = self.base + offset;

        let mut block = abs / blk_len;
        let mut done = 0usize;

        // Head: partial block served via scratch
        let head = (abs % blk_len) as usize;
        if head != 0 {
            self.read_one_block(block)?;
            let take = (blk_len as usize - head).min(buf.len());
            buf[..take].copy_from_slice(&self.scratch[head..head + take]);
            done += take;
            block += 1;
        }

        // Middle: whole blocks straight into the caller's buffer
        let whole = (buf.len() - done) / blk_len as usize;
        if whole > 0 {
            let span = whole * blk_len as usize;
            let got = self
                .device
                .read_blocks(block, &mut buf[done..done + span])?;
            if got != whole {
                return Err(StorageError::Io(done + got * blk_len as usize));
            }
            done += span;
            block += whole as u64;
        }

        // Tail: remaining partial block via scratch
        let tail = buf.len() - done;
        if tail > 0 {
            self.read_one_block(block)?;
            buf[done..].copy_from_slice(&self.scratch[..tail]);
            done += tail;
        }

        Ok(done)
    }

    fn capacity(&self) -> u64 {
        self.size
    }

    fn kind(&self) -> MediumKind {
        MediumKind::Mmc
    }
}

/// Byte-addressed read contract of an external flash driver
pub trait FlashRead {
    /// Read bytes at an absolute flash offset; returns the byte count
    /// actually read
    fn read(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Flash size in bytes
    fn capacity(&self) -> u64;
}

/// Backend over a byte-addressed flash driver, bound to one partition
pub struct FlashBackend<'a, F: FlashRead> {
    flash: &'a mut F,
    base: u64,
    size: u64,
    kind: MediumKind,
}

impl<'a, F: FlashRead> FlashBackend<'a, F> {
    /// Bind a flash driver to a partition window
    pub fn new(flash: &'a mut F, base: u64, size: u64, kind: MediumKind) -> Result<Self> {
        if base + size > flash.capacity() {
            return Err(StorageError::OutOfRange);
        }
        Ok(Self {
            flash,
            base,
            size,
            kind,
        })
    }
}

impl<'a, F: FlashRead> BlockBackend for FlashBackend<'a, F> {
    fn read(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if offset + buf.len() as u64 > self.size {
            return Err(StorageError::OutOfRange);
        }
        let done = self.flash.read(self.base + offset, buf)?;
        if done != buf.len() {
            return Err(StorageError::Io(done));
        }
        Ok(done)
    }

    fn capacity(&self) -> u64 {
        self.size
    }

    fn kind(&self) -> MediumKind {
        self.kind
    }
}

/// Backend over a memory-mapped flash window: reads are plain copies
pub struct XipBackend<'a> {
    window: &'a [u8],
    base: u64,
}

impl<'a> XipBackend<'a> {
    /// Wrap a mapped window with a fixed base offset into it
    pub fn new(window: &'a [u8], base: u64) -> Result<Self> {
        if base > window.len() as u64 {
            return Err(StorageError::OutOfRange);
        }
        Ok(Self { window, base })
    }
}

impl<'a> BlockBackend for XipBackend<'a> {
    fn read(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let start = self.base + offset;
        let end = start + buf.len() as u64;
        if end > self.window.len() as u64 {
            return Err(StorageError::OutOfRange);
        }
        buf.copy_from_slice(&self.window[start as usize..end as usize]);
        Ok(buf.len())
    }

    fn capacity(&self) -> u64 {
        self.window.len() as u64 - self.base
    }

    fn kind(&self) -> MediumKind {
        MediumKind::XipNor
    }
}
