//! Block transfers: FIFO and internal-DMA data paths
//!
//! Transfers below one block length go through the polled FIFO; anything
//! larger is staged through a bounce buffer and an IDMA descriptor chain.
//! Both paths converge on the same completion check: poll interrupt status
//! for data-done or an error bit within the computed timeout budget.

use dma_pool::{build_descriptor_chain, BounceBuffer};
use storage::{BlockIo, StorageError};

use crate::card::data_timeout_ms;
use crate::cmd::*;
use crate::engine::{Card, MAX_BLOCKS_PER_CMD, MAX_TRANSFER_BYTES};
use crate::error::{MmcError, Result};
use crate::host::HostController;

/// Transfers at or above this size take the IDMA path
const DMA_THRESHOLD: usize = 512;

/// Busy wait budget after writes and erases
const PROGRAM_BUSY_TIMEOUT_MS: u32 = 2000;

impl<H: HostController> Card<H> {
    /// Read whole blocks starting at `start`.
    ///
    /// `buf` must be an exact multiple of the block length. Requests larger
    /// than the per-command cap are served by advancing start and
    /// destination chunk by chunk.
    pub fn read(&mut self, start: u64, buf: &mut [u8]) -> Result<usize> {
        let blk_len = self.state.geometry.read_bl_len as usize;
        if buf.is_empty() || buf.len() % blk_len != 0 {
            return Err(MmcError::DataError);
        }

        let mut block = start;
        let mut off = 0usize;
        while off < buf.len() {
            let blocks = ((buf.len() - off) / blk_len)
                .min(MAX_BLOCKS_PER_CMD)
                .min(MAX_TRANSFER_BYTES / blk_len);
            let span = blocks * blk_len;
            self.read_chunk(block, &mut buf[off..off + span])?;
            block += blocks as u64;
            off += span;
        }
        Ok(buf.len() / blk_len)
    }

    /// Write whole blocks starting at `start`
    pub fn write(&mut self, start: u64, buf: &[u8]) -> Result<usize> {
        let blk_len = self.state.geometry.read_bl_len as usize;
        if buf.is_empty() || buf.len() % blk_len != 0 {
            return Err(MmcError::DataError);
        }

        let mut block = start;
        let mut off = 0usize;
        while off < buf.len() {
            let blocks = ((buf.len() - off) / blk_len)
                .min(MAX_BLOCKS_PER_CMD)
                .min(MAX_TRANSFER_BYTES / blk_len);
            let span = blocks * blk_len;
            self.write_chunk(block, &buf[off..off + span])?;
            block += blocks as u64;
            off += span;
        }
        Ok(buf.len() / blk_len)
    }

    /// Erase a span of blocks, one erase group at a time.
    ///
    /// Cards round partial groups to their erase-group size; chunking on
    /// group boundaries keeps each busy phase bounded and the rounding
    /// confined to the first and last groups of the span.
    pub fn erase(&mut self, start: u64, count: u64) -> Result<()> {
        let group = u64::from(self.state.geometry.erase_grp_size).max(1);
        let mut block = start;
        let mut left = count;
        while left > 0 {
            let span = left.min(group - block % group);
            self.erase_group_span(block, span)?;
            block += span;
            left -= span;
        }
        Ok(())
    }

    fn erase_group_span(&mut self, start: u64, count: u64) -> Result<()> {
        let first = self.data_addr(start);
        let last = self.data_addr(start + count - 1);
        self.send_command(Command::plain(
            MMC_CMD_ERASE_GROUP_START,
            first,
            ResponseKind::Short,
        ))?;
        self.send_command(Command::plain(
            MMC_CMD_ERASE_GROUP_END,
            last,
            ResponseKind::Short,
        ))?;
        self.send_command(Command::plain(MMC_CMD_ERASE, 0, ResponseKind::Short))?;
        self.wait_not_busy(PROGRAM_BUSY_TIMEOUT_MS)
    }

    /// Register-style data read used during identification (SCR, EXT_CSD)
    pub(crate) fn read_data(
        &mut self,
        cmd: Command,
        buf: &mut [u8],
        block_len: usize,
    ) -> Result<()> {
        self.host.set_block(block_len as u32, (buf.len() / block_len) as u32);
        let timeout = self.transfer_timeout(buf.len())?;
        if buf.len() >= DMA_THRESHOLD {
            self.dma_read(cmd, buf, block_len, timeout)
        } else {
            self.fifo_read(cmd, buf, timeout)
        }
    }

    fn read_chunk(&mut self, start: u64, buf: &mut [u8]) -> Result<()> {
        let blk_len = self.state.geometry.read_bl_len as usize;
        let blocks = buf.len() / blk_len;
        let opcode = if blocks > 1 {
            MMC_CMD_READ_MULTIPLE_BLOCK
        } else {
            MMC_CMD_READ_SINGLE_BLOCK
        };
        let cmd = Command::with_data(
            opcode,
            self.data_addr(start),
            ResponseKind::Short,
            DataDirection::Read,
        );

        self.host.set_block(blk_len as u32, blocks as u32);
        let timeout = self.transfer_timeout(buf.len())?;
        let result = if buf.len() >= DMA_THRESHOLD {
            self.dma_read(cmd, buf, blk_len, timeout)
        } else {
            self.fifo_read(cmd, buf, timeout)
        };

        // The controller's automatic stop is never armed here, so open-ended
        // multi-block transfers need an explicit CMD12
        if blocks > 1 {
            self.stop_transmission()?;
        }
        result
    }

    fn write_chunk(&mut self, start: u64, buf: &[u8]) -> Result<()> {
        let blk_len = self.state.geometry.read_bl_len as usize;
        let blocks = buf.len() / blk_len;
        let opcode = if blocks > 1 {
            MMC_CMD_WRITE_MULTIPLE_BLOCK
        } else {
            MMC_CMD_WRITE_SINGLE_BLOCK
        };
        let cmd = Command::with_data(
            opcode,
            self.data_addr(start),
            ResponseKind::Short,
            DataDirection::Write,
        );

        self.host.set_block(blk_len as u32, blocks as u32);
        let timeout = self.transfer_timeout(buf.len())?;
        let result = if buf.len() >= DMA_THRESHOLD {
            self.dma_write(cmd, buf, blk_len, timeout)
        } else {
            self.fifo_write(cmd, buf, timeout)
        };

        if blocks > 1 {
            self.stop_transmission()?;
        }
        self.wait_not_busy(PROGRAM_BUSY_TIMEOUT_MS)?;
        result
    }

    fn dma_read(
        &mut self,
        cmd: Command,
        buf: &mut [u8],
        block_len: usize,
        timeout_ms: u32,
    ) -> Result<()> {
        self.ensure_bounce()?;
        let bounce = match self.bounce.as_ref() {
            Some(bounce) => bounce,
            None => return Err(MmcError::DmaSetup),
        };
        build_descriptor_chain(&mut self.descs, bounce.paddr(), buf.len(), block_len)?;

        self.host
            .idma_start(self.descs.as_ptr() as usize, true);
        let issued = self.send_command(cmd);
        let status = if issued.is_ok() {
            self.host
                .wait_interrupt(INT_DATA_DONE, INT_DATA_ERR_MASK, timeout_ms)
        } else {
            0
        };
        self.host.idma_stop();
        issued?;
        self.finish_data_phase(status)?;

        if let Some(bounce) = self.bounce.as_ref() {
            bounce.copy_out(buf);
        }
        Ok(())
    }

    fn dma_write(
        &mut self,
        cmd: Command,
        buf: &[u8],
        block_len: usize,
        timeout_ms: u32,
    ) -> Result<()> {
        self.ensure_bounce()?;
        let bounce = match self.bounce.as_mut() {
            Some(bounce) => bounce,
            None => return Err(MmcError::DmaSetup),
        };
        bounce.copy_in(buf);
        build_descriptor_chain(&mut self.descs, bounce.paddr(), buf.len(), block_len)?;

        self.host
            .idma_start(self.descs.as_ptr() as usize, false);
        let issued = self.send_command(cmd);
        let status = if issued.is_ok() {
            self.host
                .wait_interrupt(INT_DATA_DONE, INT_DATA_ERR_MASK, timeout_ms)
        } else {
            0
        };
        self.host.idma_stop();
        issued?;
        self.finish_data_phase(status)
    }

    fn fifo_read(&mut self, cmd: Command, buf: &mut [u8], timeout_ms: u32) -> Result<()> {
        self.send_command(cmd)?;

        let deadline = self.host.now_ms() + timeout_ms as u64;
        let mut done = 0usize;
        while done < buf.len() {
            done += self.host.fifo_read(&mut buf[done..]);
            if done >= buf.len() {
                break;
            }
            let status = self.host.int_status();
            if status & INT_DATA_ERR_MASK != 0 {
                self.host.int_clear(status & INT_DATA_ERR_MASK);
                return Err(classify_data_error(status));
            }
            if self.host.now_ms() > deadline {
                return Err(MmcError::DataTimeout);
            }
            self.host.delay_us(10);
        }

        let status = self
            .host
            .wait_interrupt(INT_DATA_DONE, INT_DATA_ERR_MASK, timeout_ms);
        self.finish_data_phase(status)
    }

    fn fifo_write(&mut self, cmd: Command, buf: &[u8], timeout_ms: u32) -> Result<()> {
        self.send_command(cmd)?;

        let deadline = self.host.now_ms() + timeout_ms as u64;
        let mut done = 0usize;
        while done < buf.len() {
            done += self.host.fifo_write(&buf[done..]);
            if done >= buf.len() {
                break;
            }
            let status = self.host.int_status();
            if status & INT_DATA_ERR_MASK != 0 {
                self.host.int_clear(status & INT_DATA_ERR_MASK);
                return Err(classify_data_error(status));
            }
            if self.host.now_ms() > deadline {
                return Err(MmcError::DataTimeout);
            }
            self.host.delay_us(10);
        }

        let status = self
            .host
            .wait_interrupt(INT_DATA_DONE, INT_DATA_ERR_MASK, timeout_ms);
        self.finish_data_phase(status)
    }

    /// Classify the status word both data paths end on
    fn finish_data_phase(&mut self, status: u32) -> Result<()> {
        self.host
            .int_clear(status & (INT_DATA_DONE | INT_DATA_ERR_MASK));
        if status == 0 {
            return Err(MmcError::DataTimeout);
        }
        if status & INT_DATA_ERR_MASK != 0 {
            return Err(classify_data_error(status));
        }
        Ok(())
    }

    fn stop_transmission(&mut self) -> Result<()> {
        self.send_command(Command::plain(
            MMC_CMD_STOP_TRANSMISSION,
            0,
            ResponseKind::Short,
        ))?;
        self.wait_not_busy(PROGRAM_BUSY_TIMEOUT_MS)
    }

    /// Sector-addressed cards take block numbers, the rest byte offsets
    fn data_addr(&self, block: u64) -> u32 {
        if self.state.high_capacity {
            block as u32
        } else {
            (block * self.state.geometry.read_bl_len as u64) as u32
        }
    }

    fn transfer_timeout(&self, len: usize) -> Result<u32> {
        data_timeout_ms(
            len,
            self.state.bus_width,
            self.state.clock_hz,
            self.host.is_ddr(),
        )
    }

    fn ensure_bounce(&mut self) -> Result<()> {
        if self.bounce.is_none() {
            self.bounce = Some(BounceBuffer::alloc(MAX_TRANSFER_BYTES)?);
        }
        Ok(())
    }
}

fn classify_data_error(status: u32) -> MmcError {
    if status & INT_DATA_TIMEOUT != 0 {
        MmcError::DataTimeout
    } else {
        MmcError::DataError
    }
}

impl<H: HostController> BlockIo for Card<H> {
    fn block_len(&self) -> usize {
        self.state.geometry.read_bl_len as usize
    }

    fn block_count(&self) -> u64 {
        self.state.block_count()
    }

    fn read_blocks(&mut self, start: u64, buf: &mut [u8]) -> storage::Result<usize> {
        self.read(start, buf).map_err(|_| StorageError::Io(0))
    }

    fn write_blocks(&mut self, start: u64, buf: &[u8]) -> storage::Result<usize> {
        self.write(start, buf).map_err(|_| StorageError::Io(0))
    }

    fn erase_blocks(&mut self, start: u64, count: u64) -> storage::Result<()> {
        self.erase(start, count).map_err(|_| StorageError::Io(0))
    }
}
