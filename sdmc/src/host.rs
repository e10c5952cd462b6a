//! Host controller seam
//!
//! The engine drives any controller through [`HostController`]; the platform
//! supplies a register-level implementation, tests supply a scripted one.

use crate::cmd::Command;

/// Negotiated data bus width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusWidth {
    /// Single data line
    One,
    /// Four data lines
    Four,
    /// Eight data lines (eMMC only)
    Eight,
}

impl BusWidth {
    /// Number of data lines
    pub fn lanes(&self) -> u32 {
        match self {
            Self::One => 1,
            Self::Four => 4,
            Self::Eight => 8,
        }
    }
}

/// Register-level contract between the engine and one controller instance.
///
/// Completion is always observed through the interrupt-status register;
/// [`HostController::wait_interrupt`] provides the polled loop, and hosts
/// with interrupt wiring may override it to block on their completion
/// semaphore before performing the same status check. Callers never see
/// the difference.
pub trait HostController {
    /// Controller index on the platform; index 0 is the eMMC-first slot
    fn index(&self) -> usize;

    /// Program the card clock
    fn set_clock(&mut self, hz: u32);

    /// Current card clock
    fn clock_hz(&self) -> u32;

    /// Program the data bus width
    fn set_bus_width(&mut self, width: BusWidth);

    /// Current data bus width
    fn bus_width(&self) -> BusWidth;

    /// Enable or disable DDR sampling
    fn set_ddr(&mut self, enabled: bool);

    /// Whether DDR sampling is active
    fn is_ddr(&self) -> bool;

    /// Program block length and count for the next data phase
    fn set_block(&mut self, block_len: u32, count: u32);

    /// Latch argument and command register, starting the command
    fn start_command(&mut self, cmd: &Command);

    /// The four response words, most significant first
    fn response(&self) -> [u32; 4];

    /// Raw interrupt status
    fn int_status(&mut self) -> u32;

    /// Acknowledge interrupt-status bits
    fn int_clear(&mut self, bits: u32);

    /// Drain received bytes from the FIFO; returns bytes taken
    fn fifo_read(&mut self, buf: &mut [u8]) -> usize;

    /// Feed bytes into the FIFO; returns bytes accepted
    fn fifo_write(&mut self, buf: &[u8]) -> usize;

    /// Point the internal DMA at a descriptor chain and arm it
    fn idma_start(&mut self, desc_paddr: usize, read: bool);

    /// Disarm the internal DMA after completion or error
    fn idma_stop(&mut self);

    /// Whether the card is holding the data line busy
    fn data_busy(&mut self) -> bool;

    /// Monotonic milliseconds since some fixed point
    fn now_ms(&mut self) -> u64;

    /// Busy-wait for a short interval
    fn delay_us(&mut self, us: u32);

    /// Wait until a done or error bit appears, or the budget runs out.
    ///
    /// Returns the interrupt status that ended the wait, or `0` on timeout.
    /// Status bits are left set for the caller to classify and clear.
    fn wait_interrupt(&mut self, done_mask: u32, err_mask: u32, timeout_ms: u32) -> u32 {
        let deadline = self.now_ms() + timeout_ms as u64;
        loop {
            let status = self.int_status();
            if status & (done_mask | err_mask) != 0 {
                return status;
            }
            if self.now_ms() > deadline {
                return 0;
            }
            self.delay_us(100);
        }
    }
}
