//! Scripted host controller standing in for real hardware

use sdmc::cmd::{
    Command, INT_CMD_DONE, INT_DATA_DONE, INT_RESP_TIMEOUT, MMC_CMD_ALL_SEND_CID,
    MMC_CMD_APP_CMD, MMC_CMD_ERASE, MMC_CMD_ERASE_GROUP_END, MMC_CMD_ERASE_GROUP_START,
    MMC_CMD_GO_IDLE_STATE, MMC_CMD_READ_MULTIPLE_BLOCK, MMC_CMD_READ_SINGLE_BLOCK,
    MMC_CMD_SELECT_CARD, MMC_CMD_SEND_CSD, MMC_CMD_SEND_OP_COND, MMC_CMD_SET_RELATIVE_ADDR,
    MMC_CMD_STOP_TRANSMISSION, MMC_CMD_SWITCH, MMC_CMD_WRITE_MULTIPLE_BLOCK,
    MMC_CMD_WRITE_SINGLE_BLOCK, OCR_BUSY, OCR_HCS, OCR_VOLTAGE_WINDOW, SD_CMD_APP_SEND_OP_COND,
    SD_CMD_APP_SEND_SCR, SD_CMD_APP_SET_BUS_WIDTH, SD_CMD_SEND_IF_COND,
};
use sdmc::{BusWidth, DataDirection, HostController};

pub const BLOCK_LEN: usize = 512;

/// High-capacity CSD with c_size = 0x1000, 512-byte blocks and a
/// 16-block erase group
pub const CSD_HC_4K: [u32; 4] = [0, 0x0009_0000, 0x1000_0c60, 0];

/// What kind of card the mock simulates
#[derive(Clone, Copy, PartialEq)]
pub enum MockMedia {
    /// SDHC card: answers CMD8/ACMD41, times out on CMD1
    SdHighCapacity,
    /// eMMC device: answers CMD1, times out on the CMD8 probe
    Emmc,
}

enum Pending {
    None,
    Fifo { data: Vec<u8>, pos: usize },
    IdmaRead { data: Vec<u8> },
    IdmaWrite { block: u64, len: usize },
}

pub struct MockHost {
    pub controller_index: usize,
    pub media: MockMedia,
    /// Card contents, block-addressed
    pub blocks: Vec<u8>,
    /// Busy iterations before op-cond reports ready
    pub op_cond_busy_polls: u32,
    /// Status polls before a data phase reports done; `None` never completes
    pub data_done_after_polls: Option<u32>,
    /// Status polls observed during the current data phase
    pub data_polls: u32,
    /// SCR reads that fail with a response timeout before one succeeds
    pub scr_failures: u32,
    /// Every opcode issued, in order
    pub issued: Vec<u32>,

    op_cond_seen: u32,
    app_next: bool,
    resp: [u32; 4],
    status: u32,
    data_phase: bool,
    pending: Pending,
    idma_desc: usize,
    idma_read: bool,
    clock: u32,
    width: BusWidth,
    ddr: bool,
    block_len: u32,
    block_count: u32,
    time_ms: u64,
    time_frac_us: u32,
}

impl MockHost {
    pub fn new(controller_index: usize, media: MockMedia, capacity_blocks: usize) -> Self {
        let mut blocks = vec![0u8; capacity_blocks * BLOCK_LEN];
        for (i, byte) in blocks.iter_mut().enumerate() {
            *byte = (i % 253) as u8;
        }
        Self {
            controller_index,
            media,
            blocks,
            op_cond_busy_polls: 2,
            data_done_after_polls: Some(1),
            data_polls: 0,
            scr_failures: 0,
            issued: Vec::new(),
            op_cond_seen: 0,
            app_next: false,
            resp: [0; 4],
            status: 0,
            data_phase: false,
            pending: Pending::None,
            idma_desc: 0,
            idma_read: false,
            clock: 0,
            width: BusWidth::One,
            ddr: false,
            block_len: BLOCK_LEN as u32,
            block_count: 1,
            time_ms: 0,
            time_frac_us: 0,
        }
    }

    pub fn issued_count(&self, opcode: u32) -> usize {
        self.issued.iter().filter(|&&op| op == opcode).count()
    }

    fn ocr_ready(&self) -> u32 {
        OCR_BUSY | OCR_HCS | OCR_VOLTAGE_WINDOW
    }

    fn begin_data(&mut self, pending: Pending) {
        self.pending = pending;
        self.data_phase = true;
        self.data_polls = 0;
    }

    fn ext_csd_image() -> Vec<u8> {
        let mut raw = vec![0u8; 512];
        raw[192] = 7; // rev -> 5.0
        raw[196] = 0x7; // HS + DDR card type
        // 8 GiB worth of sectors
        raw[212..216].copy_from_slice(&(16 * 1024 * 1024u32 * 2).to_le_bytes());
        raw
    }

    fn start_read(&mut self, block: u64, dma_capable_len: usize, data: Vec<u8>) {
        let _ = block;
        if dma_capable_len >= 512 {
            self.begin_data(Pending::IdmaRead { data });
        } else {
            self.begin_data(Pending::Fifo { data, pos: 0 });
        }
    }

    /// Deliver a completed IDMA transfer by walking the descriptor chain.
    ///
    /// Descriptor `addr`/`next` fields are the controller's 32-bit view;
    /// buffers are resolved as offsets into the DMA pool and descriptors
    /// by their index from the programmed chain base, so the walk stays
    /// valid on hosts with wider pointers.
    unsafe fn deliver_idma(&mut self) {
        let pool_base = dma_pool::DmaPool::base();
        let chain = self.idma_desc;
        let buffer = move |addr: u32| -> *mut u8 {
            let offset = addr.wrapping_sub(pool_base as u32) as usize;
            (pool_base + offset) as *mut u8
        };
        let descriptor = move |index: usize| -> dma_pool::IdmaDescriptor {
            *((chain + index * core::mem::size_of::<dma_pool::IdmaDescriptor>())
                as *const dma_pool::IdmaDescriptor)
        };

        match core::mem::replace(&mut self.pending, Pending::None) {
            Pending::IdmaRead { data } => {
                let mut off = 0usize;
                for index in 0.. {
                    let d = descriptor(index);
                    let take = (d.cnt as usize).min(data.len() - off);
                    core::ptr::copy_nonoverlapping(data[off..].as_ptr(), buffer(d.addr), take);
                    off += take;
                    if d.flags & dma_pool::IDMA_LD != 0 || d.next == 0 {
                        break;
                    }
                }
            }
            Pending::IdmaWrite { block, len } => {
                let mut off = block as usize * BLOCK_LEN;
                let mut left = len;
                for index in 0.. {
                    let d = descriptor(index);
                    let take = (d.cnt as usize).min(left);
                    core::ptr::copy_nonoverlapping(
                        buffer(d.addr),
                        self.blocks[off..].as_mut_ptr(),
                        take,
                    );
                    off += take;
                    left -= take;
                    if d.flags & dma_pool::IDMA_LD != 0 || d.next == 0 {
                        break;
                    }
                }
            }
            other => self.pending = other,
        }
    }
}

impl HostController for MockHost {
    fn index(&self) -> usize {
        self.controller_index
    }

    fn set_clock(&mut self, hz: u32) {
        self.clock = hz;
    }

    fn clock_hz(&self) -> u32 {
        self.clock
    }

    fn set_bus_width(&mut self, width: BusWidth) {
        self.width = width;
    }

    fn bus_width(&self) -> BusWidth {
        self.width
    }

    fn set_ddr(&mut self, enabled: bool) {
        self.ddr = enabled;
    }

    fn is_ddr(&self) -> bool {
        self.ddr
    }

    fn set_block(&mut self, block_len: u32, count: u32) {
        self.block_len = block_len;
        self.block_count = count;
    }

    fn start_command(&mut self, cmd: &Command) {
        self.issued.push(cmd.opcode);
        self.resp = [0; 4];
        let app = core::mem::replace(&mut self.app_next, false);
        let mut done = INT_CMD_DONE;

        match cmd.opcode {
            MMC_CMD_GO_IDLE_STATE => {
                self.op_cond_seen = 0;
            }
            MMC_CMD_APP_CMD => {
                self.app_next = true;
            }
            SD_CMD_SEND_IF_COND if cmd.data.is_none() => {
                if self.media == MockMedia::SdHighCapacity {
                    self.resp[0] = cmd.arg & 0xff | 0x100;
                } else {
                    done = INT_RESP_TIMEOUT;
                }
            }
            SD_CMD_APP_SEND_OP_COND if app => {
                if self.media != MockMedia::SdHighCapacity {
                    done = INT_RESP_TIMEOUT;
                } else {
                    self.op_cond_seen += 1;
                    if self.op_cond_seen > self.op_cond_busy_polls {
                        self.resp[0] = self.ocr_ready();
                    } else {
                        self.resp[0] = OCR_VOLTAGE_WINDOW;
                    }
                }
            }
            MMC_CMD_SEND_OP_COND => {
                if self.media != MockMedia::Emmc {
                    done = INT_RESP_TIMEOUT;
                } else {
                    self.op_cond_seen += 1;
                    if self.op_cond_seen > self.op_cond_busy_polls {
                        self.resp[0] = self.ocr_ready();
                    } else {
                        self.resp[0] = OCR_VOLTAGE_WINDOW;
                    }
                }
            }
            MMC_CMD_ALL_SEND_CID => {
                self.resp = [0x11223344, 0x55667788, 0x99aabbcc, 0xddeeff00];
            }
            MMC_CMD_SET_RELATIVE_ADDR => {
                if self.media == MockMedia::SdHighCapacity {
                    self.resp[0] = 0x1234 << 16;
                }
            }
            MMC_CMD_SEND_CSD => {
                self.resp = CSD_HC_4K;
            }
            MMC_CMD_SELECT_CARD | MMC_CMD_STOP_TRANSMISSION => {}
            SD_CMD_APP_SEND_SCR if app && cmd.data == Some(DataDirection::Read) => {
                if self.scr_failures > 0 {
                    self.scr_failures -= 1;
                    done = INT_RESP_TIMEOUT;
                } else {
                    // SD 2.0, 1-bit and 4-bit widths
                    self.begin_data(Pending::Fifo {
                        data: vec![0x02, 0x05, 0, 0, 0, 0, 0, 0],
                        pos: 0,
                    });
                }
            }
            SD_CMD_APP_SET_BUS_WIDTH if app => {}
            MMC_CMD_SWITCH if cmd.data == Some(DataDirection::Read) => {
                // SD CMD6 function switch status: group 1 set to high speed
                let mut status = vec![0u8; 64];
                status[16] = 1;
                self.begin_data(Pending::Fifo {
                    data: status,
                    pos: 0,
                });
            }
            MMC_CMD_SWITCH => {
                // eMMC EXT_CSD byte switch, nothing to deliver
            }
            8 if cmd.data == Some(DataDirection::Read) => {
                // EXT_CSD read
                self.start_read(0, 512, Self::ext_csd_image());
            }
            MMC_CMD_READ_SINGLE_BLOCK | MMC_CMD_READ_MULTIPLE_BLOCK => {
                let len = (self.block_len * self.block_count) as usize;
                let start = cmd.arg as usize * BLOCK_LEN;
                let data = self.blocks[start..start + len].to_vec();
                self.start_read(cmd.arg as u64, len, data);
            }
            MMC_CMD_WRITE_SINGLE_BLOCK | MMC_CMD_WRITE_MULTIPLE_BLOCK => {
                let len = (self.block_len * self.block_count) as usize;
                self.begin_data(Pending::IdmaWrite {
                    block: cmd.arg as u64,
                    len,
                });
            }
            MMC_CMD_ERASE_GROUP_START | MMC_CMD_ERASE_GROUP_END | MMC_CMD_ERASE => {}
            _ => {}
        }

        self.status |= done;
    }

    fn response(&self) -> [u32; 4] {
        self.resp
    }

    fn int_status(&mut self) -> u32 {
        if self.data_phase && self.status & INT_DATA_DONE == 0 {
            self.data_polls += 1;
            if let Some(needed) = self.data_done_after_polls {
                if self.data_polls >= needed {
                    if matches!(
                        self.pending,
                        Pending::IdmaRead { .. } | Pending::IdmaWrite { .. }
                    ) {
                        // SAFETY: descriptors and buffers live in this process
                        unsafe { self.deliver_idma() };
                    }
                    // FIFO contents stay pending until drained
                    self.status |= INT_DATA_DONE;
                    self.data_phase = false;
                }
            }
        }
        self.status
    }

    fn int_clear(&mut self, bits: u32) {
        self.status &= !bits;
    }

    fn fifo_read(&mut self, buf: &mut [u8]) -> usize {
        if let Pending::Fifo { data, pos } = &mut self.pending {
            let take = buf.len().min(data.len() - *pos);
            buf[..take].copy_from_slice(&data[*pos..*pos + take]);
            *pos += take;
            take
        } else {
            0
        }
    }

    fn fifo_write(&mut self, _buf: &[u8]) -> usize {
        0
    }

    fn idma_start(&mut self, desc_paddr: usize, read: bool) {
        self.idma_desc = desc_paddr;
        self.idma_read = read;
    }

    fn idma_stop(&mut self) {}

    fn data_busy(&mut self) -> bool {
        false
    }

    fn now_ms(&mut self) -> u64 {
        self.time_ms
    }

    fn delay_us(&mut self, us: u32) {
        self.time_frac_us += us;
        self.time_ms += (self.time_frac_us / 1000) as u64;
        self.time_frac_us %= 1000;
    }
}
