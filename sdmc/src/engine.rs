//! Engine core: card handle and command plumbing

use dma_pool::{BounceBuffer, IdmaDescriptor};

use crate::card::CardState;
use crate::cmd::{
    Command, ResponseKind, INT_CMD_DONE, INT_CMD_ERR_MASK, INT_HW_LOCKED, INT_RESP_CRC,
    INT_RESP_TIMEOUT,
};
use crate::error::{MmcError, Result};
use crate::host::{BusWidth, HostController};

/// Clock used during identification, before negotiation
pub const IDENT_CLOCK_HZ: u32 = 400_000;

/// Command-phase wait budget
pub(crate) const COMMAND_TIMEOUT_MS: u32 = 250;

/// Blocks served per data command; larger requests are chunked
pub const MAX_BLOCKS_PER_CMD: usize = 300;

/// Staging buffer size for the DMA path
pub(crate) const MAX_TRANSFER_BYTES: usize = MAX_BLOCKS_PER_CMD * 512;

/// Descriptors covering a maximal transfer (one per 4 KB span)
pub(crate) const MAX_DESCRIPTORS: usize = MAX_TRANSFER_BYTES / dma_pool::PAGE_SIZE + 1;

/// Per-controller bring-up limits from the board configuration
#[derive(Debug, Clone, Copy)]
pub struct SdmcConfig {
    /// Widest bus the board wiring supports
    pub max_bus_width: BusWidth,
    /// Fastest clock the board wiring supports
    pub max_clock_hz: u32,
    /// Allow DDR sampling where the card supports it
    pub ddr: bool,
}

impl Default for SdmcConfig {
    fn default() -> Self {
        Self {
            max_bus_width: BusWidth::Four,
            max_clock_hz: 50_000_000,
            ddr: false,
        }
    }
}

/// A brought-up card bound to its host controller.
///
/// Created by [`Card::identify`]; the state is immutable once
/// identification completes.
pub struct Card<H: HostController> {
    pub(crate) host: H,
    pub(crate) state: CardState,
    pub(crate) config: SdmcConfig,
    pub(crate) bounce: Option<BounceBuffer>,
    pub(crate) descs: [IdmaDescriptor; MAX_DESCRIPTORS],
}

impl<H: HostController> Card<H> {
    /// Negotiated card state
    pub fn state(&self) -> &CardState {
        &self.state
    }

    /// The underlying host controller
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable access to the underlying host controller
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Release the host controller
    pub fn into_host(self) -> H {
        self.host
    }

    /// Issue one command and wait for the command phase to finish.
    ///
    /// Data-phase status bits are left untouched for the caller.
    pub(crate) fn send_command(&mut self, cmd: Command) -> Result<[u32; 4]> {
        self.host.start_command(&cmd);
        let status = self
            .host
            .wait_interrupt(INT_CMD_DONE, INT_CMD_ERR_MASK, COMMAND_TIMEOUT_MS);
        self.host
            .int_clear(status & (INT_CMD_DONE | INT_CMD_ERR_MASK));

        if status == 0 || status & INT_RESP_TIMEOUT != 0 {
            return Err(MmcError::CommandTimeout);
        }
        if status & INT_RESP_CRC != 0 {
            // Op-cond responses carry no valid CRC; the controller flags
            // them anyway
            if cmd.resp != ResponseKind::ShortNoCrc {
                return Err(MmcError::ResponseCrcError);
            }
        }
        if status & INT_HW_LOCKED != 0 {
            return Err(MmcError::ResponseError);
        }
        Ok(self.host.response())
    }

    /// Wait for the card to release the data line after an R1b command
    pub(crate) fn wait_not_busy(&mut self, timeout_ms: u32) -> Result<()> {
        let deadline = self.host.now_ms() + timeout_ms as u64;
        while self.host.data_busy() {
            if self.host.now_ms() > deadline {
                return Err(MmcError::DataTimeout);
            }
            self.host.delay_us(100);
        }
        Ok(())
    }
}
