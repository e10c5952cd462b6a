//! Command set and controller status bits

/// CMD0: reset the card to idle
pub const MMC_CMD_GO_IDLE_STATE: u32 = 0;
/// CMD1: eMMC operating-conditions negotiation
pub const MMC_CMD_SEND_OP_COND: u32 = 1;
/// CMD2: read the card identification register
pub const MMC_CMD_ALL_SEND_CID: u32 = 2;
/// CMD3: assign (eMMC) or request (SD) the relative card address
pub const MMC_CMD_SET_RELATIVE_ADDR: u32 = 3;
/// CMD6: eMMC EXT_CSD switch
pub const MMC_CMD_SWITCH: u32 = 6;
/// CMD7: select the addressed card
pub const MMC_CMD_SELECT_CARD: u32 = 7;
/// CMD8: eMMC EXT_CSD read (data transfer)
pub const MMC_CMD_SEND_EXT_CSD: u32 = 8;
/// CMD8: SD interface-condition probe (shares the opcode with EXT_CSD)
pub const SD_CMD_SEND_IF_COND: u32 = 8;
/// CMD9: read the card-specific-data register
pub const MMC_CMD_SEND_CSD: u32 = 9;
/// CMD12: stop an open-ended multi-block transfer
pub const MMC_CMD_STOP_TRANSMISSION: u32 = 12;
/// CMD16: set the block length for byte-addressed cards
pub const MMC_CMD_SET_BLOCKLEN: u32 = 16;
/// CMD17: single-block read
pub const MMC_CMD_READ_SINGLE_BLOCK: u32 = 17;
/// CMD18: multi-block read
pub const MMC_CMD_READ_MULTIPLE_BLOCK: u32 = 18;
/// CMD24: single-block write
pub const MMC_CMD_WRITE_SINGLE_BLOCK: u32 = 24;
/// CMD25: multi-block write
pub const MMC_CMD_WRITE_MULTIPLE_BLOCK: u32 = 25;
/// CMD35: first erase group address
pub const MMC_CMD_ERASE_GROUP_START: u32 = 35;
/// CMD36: last erase group address
pub const MMC_CMD_ERASE_GROUP_END: u32 = 36;
/// CMD38: execute the erase
pub const MMC_CMD_ERASE: u32 = 38;
/// CMD55: next command is application-specific
pub const MMC_CMD_APP_CMD: u32 = 55;

/// ACMD6: SD bus-width switch
pub const SD_CMD_APP_SET_BUS_WIDTH: u32 = 6;
/// CMD6: SD function switch (high-speed)
pub const SD_CMD_SWITCH_FUNC: u32 = 6;
/// ACMD41: SD operating-conditions negotiation
pub const SD_CMD_APP_SEND_OP_COND: u32 = 41;
/// ACMD51: read the SD configuration register
pub const SD_CMD_APP_SEND_SCR: u32 = 51;

/// OCR busy bit: clear while the card is still powering up
pub const OCR_BUSY: u32 = 0x8000_0000;
/// OCR high-capacity (sector-addressed) bit
pub const OCR_HCS: u32 = 0x4000_0000;
/// Supported voltage window advertised during op-cond
pub const OCR_VOLTAGE_WINDOW: u32 = 0x00ff_8000;

/// CMD8 check pattern: 2.7-3.6V plus the echo byte
pub const SD_IF_COND_ARG: u32 = 0x0000_01aa;

/// Op-cond poll ceiling; exhausting it is `CardNotResponding`
pub const OP_COND_RETRY_LIMIT: u32 = 1000;

/// Response format expected from the card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// No response phase
    None,
    /// 48-bit response with CRC (R1/R1b/R6/R7)
    Short,
    /// 48-bit response without CRC (R3, OCR reads)
    ShortNoCrc,
    /// 136-bit response (R2, CID/CSD reads)
    Long,
}

/// Direction of a data phase attached to a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataDirection {
    /// Card to host
    Read,
    /// Host to card
    Write,
}

/// One command as handed to the host controller
#[derive(Debug, Clone, Copy)]
pub struct Command {
    /// Command index
    pub opcode: u32,
    /// 32-bit argument
    pub arg: u32,
    /// Expected response format
    pub resp: ResponseKind,
    /// Attached data phase, if any
    pub data: Option<DataDirection>,
}

impl Command {
    /// A command without a data phase
    pub const fn plain(opcode: u32, arg: u32, resp: ResponseKind) -> Self {
        Self {
            opcode,
            arg,
            resp,
            data: None,
        }
    }

    /// A command with an attached data phase
    pub const fn with_data(opcode: u32, arg: u32, resp: ResponseKind, dir: DataDirection) -> Self {
        Self {
            opcode,
            arg,
            resp,
            data: Some(dir),
        }
    }
}

// Interrupt-status bits, shared by the polled and interrupt-driven paths.

/// Command done
pub const INT_CMD_DONE: u32 = 1 << 2;
/// Data transfer over
pub const INT_DATA_DONE: u32 = 1 << 3;
/// Response CRC error
pub const INT_RESP_CRC: u32 = 1 << 6;
/// Data CRC error
pub const INT_DATA_CRC: u32 = 1 << 7;
/// Response timeout
pub const INT_RESP_TIMEOUT: u32 = 1 << 8;
/// Data read timeout
pub const INT_DATA_TIMEOUT: u32 = 1 << 9;
/// FIFO underrun/overrun
pub const INT_FIFO_ERR: u32 = 1 << 11;
/// Hardware locked while issuing
pub const INT_HW_LOCKED: u32 = 1 << 12;
/// Start-bit error
pub const INT_START_BIT_ERR: u32 = 1 << 13;
/// End-bit error
pub const INT_END_BIT_ERR: u32 = 1 << 15;

/// Errors that can terminate a command phase
pub const INT_CMD_ERR_MASK: u32 = INT_RESP_CRC | INT_RESP_TIMEOUT | INT_HW_LOCKED;
/// Errors that can terminate a data phase
pub const INT_DATA_ERR_MASK: u32 =
    INT_DATA_CRC | INT_DATA_TIMEOUT | INT_FIFO_ERR | INT_START_BIT_ERR | INT_END_BIT_ERR;
