//! Card identification and startup
//!
//! The engine does not know a priori whether a slot holds an SD card or an
//! eMMC device. Controller index 0 (the soldered-down slot on reference
//! boards) probes the eMMC op-cond command first and falls back to the SD
//! path; every other index probes SD first. Each op-cond loop is bounded:
//! exhausting the retry ceiling is `CardNotResponding`, never an infinite
//! wait.
//!
//! ```text
//! Reset -> CMD0 -> {CMD1 | CMD8+ACMD41} -> CMD2 -> CMD3 -> CMD9 -> CMD7
//!       -> {sd_startup | emmc_startup} -> Ready
//! ```

use dma_pool::IdmaDescriptor;

use crate::card::{self, decode_csd, ext_csd_sector_count, CardState, Geometry, Version};
use crate::cmd::*;
use crate::engine::{Card, SdmcConfig, IDENT_CLOCK_HZ, MAX_DESCRIPTORS};
use crate::error::{MmcError, Result};
use crate::host::{BusWidth, HostController};

/// SCR read attempts before giving up
const SCR_RETRY_LIMIT: u32 = 3;

/// Busy wait budget after R1b switch commands
const SWITCH_BUSY_TIMEOUT_MS: u32 = 1000;

const SD_HIGH_SPEED_HZ: u32 = 50_000_000;
const SD_FULL_SPEED_HZ: u32 = 25_000_000;
const MMC_HIGH_SPEED_HZ: u32 = 52_000_000;
const MMC_FULL_SPEED_HZ: u32 = 26_000_000;

impl<H: HostController> Card<H> {
    /// Bring up whatever card sits behind `host`.
    ///
    /// Runs the full identification sequence and bus negotiation; on
    /// success the returned handle is ready for block I/O.
    pub fn identify(host: H, config: SdmcConfig) -> Result<Self> {
        let mut card = Self {
            host,
            state: power_on_state(),
            config,
            bounce: None,
            descs: [IdmaDescriptor::empty(); MAX_DESCRIPTORS],
        };

        card.host.set_clock(IDENT_CLOCK_HZ);
        card.host.set_bus_width(BusWidth::One);
        card.go_idle()?;

        // Dual-path probe; the losing path gets one clean retry after a
        // fresh CMD0
        let is_sd = if card.host.index() == 0 {
            match card.emmc_op_cond() {
                Ok(()) => false,
                Err(_) => {
                    card.go_idle()?;
                    card.sd_op_cond()?;
                    true
                }
            }
        } else {
            match card.sd_op_cond() {
                Ok(()) => true,
                Err(_) => {
                    card.go_idle()?;
                    card.emmc_op_cond()?;
                    false
                }
            }
        };

        card.send_command(Command::plain(MMC_CMD_ALL_SEND_CID, 0, ResponseKind::Long))?;

        if is_sd {
            let resp = card.send_command(Command::plain(
                MMC_CMD_SET_RELATIVE_ADDR,
                0,
                ResponseKind::Short,
            ))?;
            card.state.rca = resp[0] >> 16;
        } else {
            card.state.rca = 1;
            card.send_command(Command::plain(
                MMC_CMD_SET_RELATIVE_ADDR,
                card.state.rca << 16,
                ResponseKind::Short,
            ))?;
        }

        let resp = card.send_command(Command::plain(
            MMC_CMD_SEND_CSD,
            card.state.rca << 16,
            ResponseKind::Long,
        ))?;
        card.state.geometry = decode_csd(&resp, card.state.high_capacity);

        card.send_command(Command::plain(
            MMC_CMD_SELECT_CARD,
            card.state.rca << 16,
            ResponseKind::Short,
        ))?;

        if is_sd {
            card.sd_startup()?;
        } else {
            card.emmc_startup()?;
        }
        Ok(card)
    }

    fn go_idle(&mut self) -> Result<()> {
        self.send_command(Command::plain(MMC_CMD_GO_IDLE_STATE, 0, ResponseKind::None))?;
        self.host.delay_us(2000);
        Ok(())
    }

    /// SD op-cond: CMD8 interface probe, then ACMD41 until busy clears
    fn sd_op_cond(&mut self) -> Result<()> {
        let if_cond = self.send_command(Command::plain(
            SD_CMD_SEND_IF_COND,
            SD_IF_COND_ARG,
            ResponseKind::Short,
        ));
        let hcs_arg = match if_cond {
            Ok(resp) => {
                // 2.0 card must echo the check pattern
                if resp[0] & 0xff != SD_IF_COND_ARG & 0xff {
                    return Err(MmcError::UnusableCard);
                }
                self.state.version = Version::Sd2_0;
                OCR_HCS
            }
            // 1.x cards do not answer CMD8
            Err(_) => {
                self.state.version = Version::Sd1_10;
                0
            }
        };

        for _ in 0..OP_COND_RETRY_LIMIT {
            self.send_command(Command::plain(MMC_CMD_APP_CMD, 0, ResponseKind::Short))?;
            let resp = self.send_command(Command::plain(
                SD_CMD_APP_SEND_OP_COND,
                OCR_VOLTAGE_WINDOW | hcs_arg,
                ResponseKind::ShortNoCrc,
            ))?;
            if resp[0] & OCR_BUSY != 0 {
                self.state.ocr = resp[0];
                self.state.high_capacity = resp[0] & OCR_HCS != 0;
                return Ok(());
            }
            self.host.delay_us(1000);
        }
        Err(MmcError::CardNotResponding)
    }

    /// eMMC op-cond: CMD1 until busy clears
    fn emmc_op_cond(&mut self) -> Result<()> {
        for _ in 0..OP_COND_RETRY_LIMIT {
            let resp = self.send_command(Command::plain(
                MMC_CMD_SEND_OP_COND,
                OCR_VOLTAGE_WINDOW | OCR_HCS,
                ResponseKind::ShortNoCrc,
            ))?;
            if resp[0] & OCR_BUSY != 0 {
                self.state.ocr = resp[0];
                self.state.high_capacity = resp[0] & OCR_HCS != 0;
                self.state.version = Version::Mmc3;
                return Ok(());
            }
            self.host.delay_us(1000);
        }
        Err(MmcError::CardNotResponding)
    }

    /// SD post-select negotiation: SCR, high-speed switch, 4-bit bus
    fn sd_startup(&mut self) -> Result<()> {
        // SCR reads are allowed to fail transiently right after select
        let mut scr = [0u8; 8];
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self.read_sd_register(
                Command::with_data(SD_CMD_APP_SEND_SCR, 0, ResponseKind::Short, DataDirection::Read),
                &mut scr,
                true,
            );
            match result {
                Ok(()) => break,
                Err(err) if attempt >= SCR_RETRY_LIMIT => return Err(err),
                Err(_) => self.host.delay_us(1000),
            }
        }

        self.state.version = match scr[0] & 0xf {
            0 => Version::Sd1_0,
            1 => Version::Sd1_10,
            _ => Version::Sd2_0,
        };
        let four_bit = scr[1] & 0x4 != 0;

        // High-speed eligibility via CMD6 function switch, 64-byte status
        let mut high_speed = false;
        if self.state.version != Version::Sd1_0 {
            let mut status = [0u8; 64];
            self.read_sd_register(
                Command::with_data(
                    SD_CMD_SWITCH_FUNC,
                    0x80ff_fff1,
                    ResponseKind::Short,
                    DataDirection::Read,
                ),
                &mut status,
                false,
            )?;
            high_speed = status[16] & 0xf == 1;
        }

        if four_bit && self.config.max_bus_width.lanes() >= 4 {
            self.send_command(Command::plain(
                MMC_CMD_APP_CMD,
                self.state.rca << 16,
                ResponseKind::Short,
            ))?;
            self.send_command(Command::plain(
                SD_CMD_APP_SET_BUS_WIDTH,
                2,
                ResponseKind::Short,
            ))?;
            self.host.set_bus_width(BusWidth::Four);
            self.state.bus_width = BusWidth::Four;
        }

        let clock = if high_speed {
            SD_HIGH_SPEED_HZ
        } else {
            SD_FULL_SPEED_HZ
        }
        .min(self.config.max_clock_hz);
        self.host.set_clock(clock);
        self.state.clock_hz = clock;
        Ok(())
    }

    /// eMMC post-select negotiation: EXT_CSD, bus width, high speed
    fn emmc_startup(&mut self) -> Result<()> {
        let mut raw = [0u8; 512];
        self.read_data(
            Command::with_data(
                MMC_CMD_SEND_EXT_CSD,
                0,
                ResponseKind::Short,
                DataDirection::Read,
            ),
            &mut raw,
            512,
        )?;

        self.state.version = Version::from_ext_csd_rev(raw[card::ext_csd::REV]);

        // Above 2 GiB the CSD capacity saturates; SEC_CNT takes over
        let sectors = ext_csd_sector_count(&raw) as u64;
        if sectors * 512 > 2 * 1024 * 1024 * 1024 {
            self.state.geometry = Geometry {
                capacity_kb: sectors / 2,
                ..self.state.geometry
            };
            self.state.high_capacity = true;
        }

        let width_value = match self.config.max_bus_width {
            BusWidth::Eight => 2u8,
            BusWidth::Four => 1,
            BusWidth::One => 0,
        };
        if width_value != 0 {
            self.emmc_switch(183, width_value)?; // BUS_WIDTH
            self.host.set_bus_width(self.config.max_bus_width);
            self.state.bus_width = self.config.max_bus_width;
        }

        let card_type = raw[card::ext_csd::CARD_TYPE];
        let high_speed = card_type & 0x3 != 0;
        if high_speed {
            self.emmc_switch(185, 1)?; // HS_TIMING
        }

        let clock = if high_speed {
            MMC_HIGH_SPEED_HZ
        } else {
            MMC_FULL_SPEED_HZ
        }
        .min(self.config.max_clock_hz);
        self.host.set_clock(clock);
        self.state.clock_hz = clock;

        if self.config.ddr && card_type & 0xc != 0 {
            self.host.set_ddr(true);
        }
        Ok(())
    }

    /// CMD6 EXT_CSD write-byte switch, waiting out the busy phase
    fn emmc_switch(&mut self, byte_index: u8, value: u8) -> Result<()> {
        let arg = 0x0300_0000 | (byte_index as u32) << 16 | (value as u32) << 8;
        self.send_command(Command::plain(MMC_CMD_SWITCH, arg, ResponseKind::Short))?;
        self.wait_not_busy(SWITCH_BUSY_TIMEOUT_MS)
    }

    /// Short register read (SCR, switch status) with optional APP_CMD prefix
    fn read_sd_register(&mut self, cmd: Command, buf: &mut [u8], app: bool) -> Result<()> {
        if app {
            self.send_command(Command::plain(
                MMC_CMD_APP_CMD,
                self.state.rca << 16,
                ResponseKind::Short,
            ))?;
        }
        let len = buf.len();
        self.read_data(cmd, buf, len)
    }
}

fn power_on_state() -> CardState {
    CardState {
        version: Version::Sd1_0,
        rca: 0,
        ocr: 0,
        high_capacity: false,
        geometry: Geometry {
            read_bl_len: 512,
            capacity_kb: 0,
            erase_grp_size: 1,
        },
        bus_width: BusWidth::One,
        clock_hz: IDENT_CLOCK_HZ,
    }
}
