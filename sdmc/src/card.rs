//! Card state and register decoding
//!
//! Everything here is filled in during identification and immutable
//! afterwards: one card per boot, no hot-swap in this path.

use crate::error::{MmcError, Result};
use crate::host::BusWidth;

/// Card protocol family and version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    /// SD physical layer 1.0/1.01
    Sd1_0,
    /// SD physical layer 1.10
    Sd1_10,
    /// SD physical layer 2.00+
    Sd2_0,
    /// MMC up to 3.x
    Mmc3,
    /// eMMC 4.0-4.3
    Mmc4,
    /// eMMC 4.41
    Mmc4_41,
    /// eMMC 4.5
    Mmc4_5,
    /// eMMC 5.0
    Mmc5_0,
    /// eMMC 5.1
    Mmc5_1,
}

impl Version {
    /// Whether this is an SD-family card
    pub fn is_sd(&self) -> bool {
        matches!(self, Self::Sd1_0 | Self::Sd1_10 | Self::Sd2_0)
    }

    /// Map an EXT_CSD revision byte to an eMMC version
    pub fn from_ext_csd_rev(rev: u8) -> Self {
        match rev {
            0..=4 => Self::Mmc4,
            5 => Self::Mmc4_41,
            6 => Self::Mmc4_5,
            7 => Self::Mmc5_0,
            _ => Self::Mmc5_1,
        }
    }
}

/// Geometry and capability fields decoded from CSD
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Native read block length in bytes
    pub read_bl_len: u32,
    /// Card capacity in KB
    pub capacity_kb: u64,
    /// Erase group size in write blocks
    pub erase_grp_size: u32,
}

/// Decode geometry from the raw CSD response words (most significant first).
pub fn decode_csd(resp: &[u32; 4], high_capacity: bool) -> Geometry {
    let read_bl_len = 1u32 << ((resp[1] >> 16) & 0xf);

    let (csize, cmult) = if high_capacity {
        let csize = (resp[1] & 0x3f) << 16 | (resp[2] & 0xffff_0000) >> 16;
        (csize, 8u32)
    } else {
        let csize = (resp[1] & 0x3ff) << 2 | (resp[2] & 0xc000_0000) >> 30;
        let cmult = (resp[2] & 0x0003_8000) >> 15;
        (csize, cmult)
    };

    let capacity_kb = (((csize as u64) + 1) << (cmult + 2)) * read_bl_len as u64 >> 10;

    let erase_grp_size = (((resp[2] & 0x7c00) >> 10) + 1) * (((resp[2] & 0x3e0) >> 5) + 1);

    Geometry {
        read_bl_len,
        capacity_kb,
        erase_grp_size,
    }
}

/// EXT_CSD byte offsets used by the engine
pub mod ext_csd {
    /// Device revision
    pub const REV: usize = 192;
    /// Sector count, little-endian u32; authoritative for >2 GiB cards
    pub const SEC_CNT: usize = 212;
    /// High-speed / DDR capability bits
    pub const CARD_TYPE: usize = 196;
}

/// Sector count from a raw EXT_CSD block
pub fn ext_csd_sector_count(raw: &[u8; 512]) -> u32 {
    u32::from_le_bytes([
        raw[ext_csd::SEC_CNT],
        raw[ext_csd::SEC_CNT + 1],
        raw[ext_csd::SEC_CNT + 2],
        raw[ext_csd::SEC_CNT + 3],
    ])
}

/// State accumulated while bringing a card up
#[derive(Debug, Clone, Copy)]
pub struct CardState {
    /// Protocol family and version
    pub version: Version,
    /// Relative card address assigned during identification
    pub rca: u32,
    /// Raw OCR from op-cond negotiation
    pub ocr: u32,
    /// Sector-addressed card (OCR HCS / EXT_CSD capacity)
    pub high_capacity: bool,
    /// Decoded CSD geometry
    pub geometry: Geometry,
    /// Negotiated bus width
    pub bus_width: BusWidth,
    /// Negotiated clock in Hz
    pub clock_hz: u32,
}

impl CardState {
    /// Device size in native blocks
    pub fn block_count(&self) -> u64 {
        self.geometry.capacity_kb * 1024 / self.geometry.read_bl_len as u64
    }
}

/// Compute the timeout budget for one data transfer, in milliseconds.
///
/// Transfer time at the negotiated width and clock, scaled x10 as margin,
/// halved in DDR (two transfers per clock), floored at one second.
pub fn data_timeout_ms(len: usize, width: BusWidth, clock_hz: u32, ddr: bool) -> Result<u32> {
    if clock_hz < 1000 {
        return Err(MmcError::UnusableCard);
    }
    let bits = len as u64 * 8;
    let mut ms = bits / width.lanes() as u64 * 10 / (clock_hz as u64 / 1000);
    if ddr {
        ms /= 2;
    }
    Ok(ms.max(1000) as u32)
}
