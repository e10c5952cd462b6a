//! Partition tables built from static descriptor strings
//!
//! MMC boot media carry no on-medium partition table this early; the layout
//! comes from a board-level descriptor string instead:
//!
//! ```text
//! size[K|M|G][@start](name),size[@start](name),...
//! ```
//!
//! A bare `-` as the size means "remainder of the capacity" and must be the
//! last entry. An absent `@start` places the partition immediately after the
//! previous one. Numbers are decimal or `0x`-prefixed hex; a leading `s:` on
//! the whole descriptor switches all numbers to 512-byte sector units (no
//! suffixes in that mode).

use crate::error::{Result, StorageError};

/// First partition start: the space reserved for a GPT header and entry
/// array at the front of the medium
pub const GPT_RESERVED_BYTES: u64 = 69632;

/// Maximum stored partition name length in bytes; longer names are truncated
pub const MAX_NAME_LEN: usize = 32;

/// Maximum partitions per table
pub const MAX_PARTITIONS: usize = 16;

const SECTOR_LEN: u64 = 512;

/// One named byte range on a medium
#[derive(Debug, Clone, Copy)]
pub struct Partition {
    name: [u8; MAX_NAME_LEN],
    name_len: usize,
    /// Start offset on the raw medium, in bytes
    pub start: u64,
    /// Size in bytes
    pub size: u64,
}

impl Partition {
    fn new(name: &str, start: u64, size: u64) -> Self {
        // Truncate to the last char boundary that fits
        let mut len = name.len().min(MAX_NAME_LEN);
        while !name.is_char_boundary(len) {
            len -= 1;
        }
        let mut bytes = [0u8; MAX_NAME_LEN];
        bytes[..len].copy_from_slice(&name.as_bytes()[..len]);
        Self {
            name: bytes,
            name_len: len,
            start,
            size,
        }
    }

    /// Partition name
    pub fn name(&self) -> &str {
        // Truncation above preserved UTF-8 validity
        core::str::from_utf8(&self.name[..self.name_len]).unwrap_or_default()
    }

    /// One byte past the end of the partition
    pub fn end(&self) -> u64 {
        self.start + self.size
    }
}

/// Ordered, fixed-capacity sequence of partitions
#[derive(Debug)]
pub struct PartitionTable {
    partitions: [Option<Partition>; MAX_PARTITIONS],
    count: usize,
}

impl PartitionTable {
    /// Parse a descriptor string against a medium of `capacity` bytes.
    ///
    /// The first partition must start exactly at [`GPT_RESERVED_BYTES`];
    /// partitions must be in order, never overlap and never exceed the
    /// capacity.
    pub fn from_descriptor(descriptor: &str, capacity: u64) -> Result<Self> {
        let (descriptor, unit) = match descriptor.strip_prefix("s:") {
            Some(rest) => (rest, Unit::Sectors),
            None => (descriptor, Unit::Bytes),
        };

        let mut table = Self {
            partitions: [None; MAX_PARTITIONS],
            count: 0,
        };
        let mut cursor = Cursor::new(descriptor);
        let mut next_start = GPT_RESERVED_BYTES;
        let mut saw_remainder = false;

        loop {
            if saw_remainder {
                // Remainder consumed the rest of the medium
                return Err(StorageError::PartitionSyntax);
            }

            let size = if cursor.eat('-') {
                saw_remainder = true;
                None
            } else {
                Some(cursor.number(unit)?)
            };

            let start = if cursor.eat('@') {
                cursor.number(unit)?
            } else {
                next_start
            };

            let name = cursor.parenthesized_name()?;

            if table.count == 0 && start != GPT_RESERVED_BYTES {
                return Err(StorageError::PartitionSyntax);
            }
            if start < next_start || start > capacity {
                return Err(StorageError::PartitionSyntax);
            }

            let size = match size {
                Some(size) => size,
                None => capacity - start,
            };
            let end = start
                .checked_add(size)
                .ok_or(StorageError::PartitionSyntax)?;
            if size == 0 || end > capacity {
                return Err(StorageError::PartitionSyntax);
            }

            if table.count >= MAX_PARTITIONS {
                return Err(StorageError::PartitionSyntax);
            }
            table.partitions[table.count] = Some(Partition::new(name, start, size));
            table.count += 1;
            next_start = end;

            if cursor.at_end() {
                return Ok(table);
            }
            if !cursor.eat(',') {
                return Err(StorageError::PartitionSyntax);
            }
        }
    }

    /// Number of partitions
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Look up a partition by exact name
    pub fn find(&self, name: &str) -> Result<&Partition> {
        self.iter()
            .find(|partition| partition.name() == name)
            .ok_or(StorageError::PartitionNotFound)
    }

    /// Iterate partitions in descriptor order
    pub fn iter(&self) -> impl Iterator<Item = &Partition> {
        self.partitions[..self.count]
            .iter()
            .filter_map(|slot| slot.as_ref())
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Unit {
    Bytes,
    Sectors,
}

/// Single-pass reader over the descriptor string
struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(descriptor: &'a str) -> Self {
        Self { rest: descriptor }
    }

    fn at_end(&self) -> bool {
        self.rest.is_empty()
    }

    fn eat(&mut self, ch: char) -> bool {
        match self.rest.strip_prefix(ch) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn number(&mut self, unit: Unit) -> Result<u64> {
        let (radix, digits) = match self.rest.strip_prefix("0x").or(self.rest.strip_prefix("0X"))
        {
            Some(rest) => (16, rest),
            None => (10, self.rest),
        };

        let len = digits
            .find(|c: char| !c.is_digit(radix))
            .unwrap_or(digits.len());
        if len == 0 {
            return Err(StorageError::PartitionSyntax);
        }
        let value =
            u64::from_str_radix(&digits[..len], radix).map_err(|_| StorageError::PartitionSyntax)?;
        self.rest = &digits[len..];

        let scale = match unit {
            Unit::Sectors => SECTOR_LEN,
            Unit::Bytes => {
                if self.eat('K') {
                    1 << 10
                } else if self.eat('M') {
                    1 << 20
                } else if self.eat('G') {
                    1 << 30
                } else {
                    1
                }
            }
        };
        value
            .checked_mul(scale)
            .ok_or(StorageError::PartitionSyntax)
    }

    fn parenthesized_name(&mut self) -> Result<&'a str> {
        if !self.eat('(') {
            return Err(StorageError::PartitionSyntax);
        }
        let close = self.rest.find(')').ok_or(StorageError::PartitionSyntax)?;
        let name = &self.rest[..close];
        if name.is_empty() {
            return Err(StorageError::PartitionSyntax);
        }
        self.rest = &self.rest[close + 1..];
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAPACITY: u64 = 8 * 1024 * 1024 * 1024;

    #[test]
    fn test_two_partition_descriptor() {
        let table = PartitionTable::from_descriptor("0x100000@69632(os),-(ext)", CAPACITY)
            .expect("descriptor should parse");
        assert_eq!(table.len(), 2);

        let os = table.find("os").unwrap();
        assert_eq!(os.start, 69632);
        assert_eq!(os.size, 0x100000);

        let ext = table.find("ext").unwrap();
        assert_eq!(ext.start, 69632 + 0x100000);
        assert_eq!(ext.size, CAPACITY - (69632 + 0x100000));
    }

    #[test]
    fn test_implicit_start_follows_previous_partition() {
        let table =
            PartitionTable::from_descriptor("1M@69632(boot),2M(os),4M(data)", CAPACITY).unwrap();
        let os = table.find("os").unwrap();
        assert_eq!(os.start, 69632 + (1 << 20));
        let data = table.find("data").unwrap();
        assert_eq!(data.start, 69632 + (1 << 20) + (2 << 20));
        assert_eq!(data.size, 4 << 20);
    }

    #[test]
    fn test_size_suffixes() {
        let table = PartitionTable::from_descriptor("512K@69632(a),1G(b)", CAPACITY).unwrap();
        assert_eq!(table.find("a").unwrap().size, 512 << 10);
        assert_eq!(table.find("b").unwrap().size, 1 << 30);
    }

    #[test]
    fn test_sector_unit_descriptor() {
        let table = PartitionTable::from_descriptor("s:2048@136(os),-(ext)", CAPACITY).unwrap();
        let os = table.find("os").unwrap();
        assert_eq!(os.start, 136 * 512);
        assert_eq!(os.start, GPT_RESERVED_BYTES);
        assert_eq!(os.size, 2048 * 512);
    }

    #[test]
    fn test_first_partition_must_start_at_reservation() {
        assert_eq!(
            PartitionTable::from_descriptor("1M@0(os)", CAPACITY).unwrap_err(),
            StorageError::PartitionSyntax
        );
        assert_eq!(
            PartitionTable::from_descriptor("1M@4096(os)", CAPACITY).unwrap_err(),
            StorageError::PartitionSyntax
        );
    }

    #[test]
    fn test_remainder_must_be_last() {
        assert_eq!(
            PartitionTable::from_descriptor("-(a),1M(b)", CAPACITY).unwrap_err(),
            StorageError::PartitionSyntax
        );
    }

    #[test]
    fn test_overlap_rejected() {
        assert_eq!(
            PartitionTable::from_descriptor("1M@69632(a),1M@69632(b)", CAPACITY).unwrap_err(),
            StorageError::PartitionSyntax
        );
    }

    #[test]
    fn test_oversized_partition_rejected() {
        assert_eq!(
            PartitionTable::from_descriptor("1M@69632(a)", 69632 + 4096).unwrap_err(),
            StorageError::PartitionSyntax
        );
    }

    #[test]
    fn test_wrapping_size_rejected() {
        // start + size wraps u64; the wrapped end would pass a naive
        // capacity check
        assert_eq!(
            PartitionTable::from_descriptor("0xffffffffffffffff@69632(a)", u64::MAX).unwrap_err(),
            StorageError::PartitionSyntax
        );
    }

    #[test]
    fn test_garbage_descriptors_rejected() {
        for descriptor in ["", "@69632(a)", "1M@69632", "1M@69632()", "1M@69632(a),,"] {
            assert!(
                PartitionTable::from_descriptor(descriptor, CAPACITY).is_err(),
                "descriptor {:?} should fail",
                descriptor
            );
        }
    }

    #[test]
    fn test_long_name_truncated() {
        let long = "abcdefghijklmnopqrstuvwxyz0123456789";
        let table = PartitionTable::from_descriptor(
            "1M@69632(abcdefghijklmnopqrstuvwxyz0123456789)",
            CAPACITY,
        )
        .unwrap();
        let part = table.iter().next().unwrap();
        assert_eq!(part.name().len(), MAX_NAME_LEN);
        assert_eq!(part.name(), &long[..MAX_NAME_LEN]);
    }
}
