//! Common types and constants for FIT containers

/// Device-tree magic word, big-endian first word of every container
pub const FDT_MAGIC: u32 = 0xd00d_feed;

/// Fixed header size in bytes
pub const HEADER_SIZE: usize = 40;

/// Structure-block token: start of a node, followed by its NUL-terminated name
pub const FDT_BEGIN_NODE: u32 = 0x1;
/// Structure-block token: end of the current node
pub const FDT_END_NODE: u32 = 0x2;
/// Structure-block token: property, followed by length, name offset and value
pub const FDT_PROP: u32 = 0x3;
/// Structure-block token: padding, no payload
pub const FDT_NOP: u32 = 0x4;
/// Structure-block token: end of the structure block
pub const FDT_END: u32 = 0x9;

/// Align a value up to the container's 4-byte granularity
#[inline]
pub const fn align4(value: u32) -> u32 {
    (value + 3) & !3
}

/// Role an image plays within a boot configuration.
///
/// Each role maps to a configuration property holding a NUL-separated list
/// of image node names, walked by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRole {
    /// Firmware payloads; index 0 carries the boot entry point
    Firmware,
    /// Kernel image
    Kernel,
    /// Device tree passed to the payload
    Fdt,
    /// Initial ramdisk
    Ramdisk,
    /// Additional side-loaded image
    Loadable,
}

impl ImageRole {
    /// Configuration property name holding this role's image list
    pub fn prop_name(&self) -> &'static str {
        match self {
            Self::Firmware => "firmware",
            Self::Kernel => "kernel",
            Self::Fdt => "fdt",
            Self::Ramdisk => "ramdisk",
            Self::Loadable => "loadables",
        }
    }
}

/// Where an image's payload bytes live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataLocation<'a> {
    /// Payload embedded in the tree itself (rejected by this loader)
    Inline(&'a [u8]),
    /// Absolute byte position on the backing medium
    Position(u64),
    /// Byte offset relative to the aligned end of the container
    Offset(u64),
    /// No data property at all
    Missing,
}

/// Parsed image node, prior to payload resolution
#[derive(Debug, Clone, Copy)]
pub struct ImageDescriptor<'a> {
    /// Image node name
    pub name: &'a str,
    /// RAM address the payload is copied to
    pub load_address: u64,
    /// Execution entry point; only meaningful for the first firmware image
    pub entry_point: Option<u64>,
    /// Declared payload size; authoritative for external payloads
    pub size: Option<u32>,
    /// Payload location variant
    pub location: DataLocation<'a>,
}

/// Absolute read window for an external payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedLocation {
    /// Absolute byte position on the backing medium
    pub pos: u64,
    /// Payload size in bytes
    pub size: u32,
}
