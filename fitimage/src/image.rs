//! Image node interpretation and payload location resolution

use crate::error::{FitError, Result};
use crate::tree::{Fit, Node};
use crate::types::{DataLocation, ImageDescriptor, ResolvedLocation};

impl<'a> Fit<'a> {
    /// Parse an `/images` child node into a descriptor.
    ///
    /// `load` is required; `entry` and `data-size` are optional. The payload
    /// location is probed in order: `data-position`, `data-offset`, inline
    /// `data`.
    pub fn describe_image(&self, node: Node) -> Result<ImageDescriptor<'a>> {
        let name = self.node_name(node)?;

        let load_address = self
            .address_property(node, "load")?
            .ok_or(FitError::MissingProperty)?;
        let entry_point = self.address_property(node, "entry")?;

        let size = match self.property(node, "data-size")? {
            Some(value) => Some(be_u32(value)?),
            None => None,
        };

        let location = if let Some(value) = self.property(node, "data-position")? {
            DataLocation::Position(be_u32(value)? as u64)
        } else if let Some(value) = self.property(node, "data-offset")? {
            DataLocation::Offset(be_u32(value)? as u64)
        } else if let Some(value) = self.property(node, "data")? {
            DataLocation::Inline(value)
        } else {
            DataLocation::Missing
        };

        Ok(ImageDescriptor {
            name,
            load_address,
            entry_point,
            size,
            location,
        })
    }

    /// Resolve a descriptor to an absolute read window on the medium.
    ///
    /// `data-offset` is relative to the 4-byte-aligned end of the container.
    /// Inline data and images with no location at all are `NoExternalData`:
    /// this loader only boots externally appended payloads.
    pub fn resolve(&self, image: &ImageDescriptor<'a>) -> Result<ResolvedLocation> {
        let pos = match image.location {
            DataLocation::Position(pos) => pos,
            DataLocation::Offset(off) => self.ext_data_offset() + off,
            DataLocation::Inline(_) | DataLocation::Missing => {
                return Err(FitError::NoExternalData)
            }
        };
        let size = image.size.ok_or(FitError::MissingProperty)?;
        Ok(ResolvedLocation { pos, size })
    }

    /// Address property reassembled from its big-endian cells.
    ///
    /// Addresses are encoded in one or two 32-bit cells; any other width is
    /// `MalformedProperty`.
    fn address_property(&self, node: Node, name: &str) -> Result<Option<u64>> {
        let value = match self.property(node, name)? {
            Some(value) => value,
            None => return Ok(None),
        };
        match value.len() {
            4 => Ok(Some(be_u32(value)? as u64)),
            8 => {
                let hi = be_u32(&value[0..4])? as u64;
                let lo = be_u32(&value[4..8])? as u64;
                Ok(Some(hi << 32 | lo))
            }
            _ => Err(FitError::MalformedProperty),
        }
    }
}

fn be_u32(value: &[u8]) -> Result<u32> {
    if value.len() < 4 {
        return Err(FitError::MalformedProperty);
    }
    Ok(u32::from_be_bytes([value[0], value[1], value[2], value[3]]))
}
