//! Fixed container header parsing
//!
//! The header is ten big-endian 32-bit words. Only the magic, the total
//! size and the structure/strings windows matter to this loader; the rest
//! are carried for diagnostics.

use crate::error::{FitError, Result};
use crate::types::{align4, FDT_MAGIC, HEADER_SIZE};

/// Parsed container header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Total container size in bytes, bounds all offset arithmetic
    pub total_size: u32,
    /// Byte offset of the structure block
    pub off_dt_struct: u32,
    /// Byte offset of the strings block
    pub off_dt_strings: u32,
    /// Format version
    pub version: u32,
    /// Size of the strings block in bytes
    pub size_dt_strings: u32,
    /// Size of the structure block in bytes
    pub size_dt_struct: u32,
}

impl Header {
    /// Parse and validate the header from the first bytes of a container.
    ///
    /// The magic word is checked before any other field is trusted; a
    /// mismatch is `BadMagic` and nothing else is read.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(FitError::Truncated);
        }

        let word = |idx: usize| -> u32 {
            let off = idx * 4;
            u32::from_be_bytes([data[off], data[off + 1], data[off + 2], data[off + 3]])
        };

        if word(0) != FDT_MAGIC {
            return Err(FitError::BadMagic);
        }

        Ok(Self {
            total_size: word(1),
            off_dt_struct: word(2),
            off_dt_strings: word(3),
            version: word(5),
            size_dt_strings: word(8),
            size_dt_struct: word(9),
        })
    }

    /// Offset of external payload data: the 4-byte-aligned total size.
    ///
    /// External images are appended immediately after the container and
    /// their `data-offset` properties are relative to this value.
    pub fn ext_data_offset(&self) -> u64 {
        align4(self.total_size) as u64
    }
}
