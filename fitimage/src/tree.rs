//! Bounds-checked structure-block walking
//!
//! The structure block is a stream of big-endian tokens: `BEGIN_NODE` with a
//! NUL-terminated name, `PROP` with a length/name-offset pair and an inline
//! value, `END_NODE`, `NOP` and a final `END`. Nodes nest; properties of a
//! node precede its subnodes.
//!
//! All offsets here are byte offsets into the caller's blob. The blob is
//! untrusted: token, name and value accesses are checked against the real
//! buffer length, never against the sizes the header claims.

use crate::error::{FitError, Result};
use crate::header::Header;
use crate::types::{
    FDT_BEGIN_NODE, FDT_END, FDT_END_NODE, FDT_NOP, FDT_PROP, HEADER_SIZE,
};

/// Handle to a node: the offset of its `BEGIN_NODE` token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node(pub(crate) usize);

/// A parsed FIT container borrowing the underlying blob
#[derive(Debug)]
pub struct Fit<'a> {
    blob: &'a [u8],
    header: Header,
    /// Structure block window, clamped to the real buffer
    struct_off: usize,
    struct_end: usize,
    /// Strings block window, clamped to the real buffer
    strings_off: usize,
    strings_end: usize,
    root: Node,
}

impl<'a> Fit<'a> {
    /// Parse a container from an in-memory blob.
    ///
    /// The blob may be shorter than the header's `total_size` (a truncated
    /// read); parsing then fails only when a walk actually leaves the buffer.
    pub fn parse(blob: &'a [u8]) -> Result<Self> {
        let header = Header::parse(blob)?;

        let clamp = |off: u32, size: u32| -> (usize, usize) {
            let start = (off as usize).min(blob.len());
            let end = (off as usize)
                .saturating_add(size as usize)
                .min(blob.len());
            (start, end.max(start))
        };

        let (struct_off, struct_end) = clamp(header.off_dt_struct, header.size_dt_struct);
        let (strings_off, strings_end) = clamp(header.off_dt_strings, header.size_dt_strings);

        if struct_off < HEADER_SIZE {
            return Err(FitError::Truncated);
        }

        let mut fit = Self {
            blob,
            header,
            struct_off,
            struct_end,
            strings_off,
            strings_end,
            root: Node(struct_off),
        };
        fit.root = fit.find_root()?;
        Ok(fit)
    }

    /// The container header
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Offset of external payload data (4-byte-aligned total size)
    pub fn ext_data_offset(&self) -> u64 {
        self.header.ext_data_offset()
    }

    /// The root node
    pub fn root(&self) -> Node {
        self.root
    }

    fn find_root(&self) -> Result<Node> {
        let mut pos = self.struct_off;
        loop {
            match self.token(pos)? {
                FDT_NOP => pos += 4,
                FDT_BEGIN_NODE => return Ok(Node(pos)),
                _ => return Err(FitError::Truncated),
            }
        }
    }

    /// Read one big-endian token word
    fn token(&self, pos: usize) -> Result<u32> {
        self.read_u32(pos)
    }

    fn read_u32(&self, pos: usize) -> Result<u32> {
        if pos + 4 > self.struct_end {
            return Err(FitError::Truncated);
        }
        let b = &self.blob[pos..pos + 4];
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Offset just past a node's name (aligned to the next token)
    fn skip_name(&self, node: Node) -> Result<usize> {
        let start = node.0 + 4;
        let mut end = start;
        loop {
            if end >= self.struct_end {
                return Err(FitError::Truncated);
            }
            if self.blob[end] == 0 {
                break;
            }
            end += 1;
        }
        // NUL byte included, then pad to 4
        Ok((end + 1 + 3) & !3)
    }

    /// Offset just past a property's value (aligned to the next token)
    fn skip_prop(&self, pos: usize) -> Result<usize> {
        let len = self.read_u32(pos + 4)? as usize;
        let value = pos + 12;
        let end = value.checked_add(len).ok_or(FitError::Truncated)?;
        if end > self.struct_end {
            return Err(FitError::Truncated);
        }
        Ok((end + 3) & !3)
    }

    /// Offset just past a node's matching `END_NODE`
    fn skip_node(&self, node: Node) -> Result<usize> {
        let mut pos = self.skip_name(node)?;
        let mut depth = 0usize;
        loop {
            match self.token(pos)? {
                FDT_NOP => pos += 4,
                FDT_PROP => pos = self.skip_prop(pos)?,
                FDT_BEGIN_NODE => {
                    depth += 1;
                    pos = self.skip_name(Node(pos))?;
                }
                FDT_END_NODE => {
                    if depth == 0 {
                        return Ok(pos + 4);
                    }
                    depth -= 1;
                    pos += 4;
                }
                _ => return Err(FitError::Truncated),
            }
        }
    }

    /// Node name (empty for the root)
    pub fn node_name(&self, node: Node) -> Result<&'a str> {
        let start = node.0 + 4;
        let mut end = start;
        loop {
            if end >= self.struct_end {
                return Err(FitError::Truncated);
            }
            if self.blob[end] == 0 {
                break;
            }
            end += 1;
        }
        core::str::from_utf8(&self.blob[start..end]).map_err(|_| FitError::InvalidString)
    }

    /// First child of a node, if any
    pub fn first_subnode(&self, node: Node) -> Result<Option<Node>> {
        let mut pos = self.skip_name(node)?;
        loop {
            match self.token(pos)? {
                FDT_NOP => pos += 4,
                FDT_PROP => pos = self.skip_prop(pos)?,
                FDT_BEGIN_NODE => return Ok(Some(Node(pos))),
                FDT_END_NODE => return Ok(None),
                _ => return Err(FitError::Truncated),
            }
        }
    }

    /// Next sibling of a node, if any
    pub fn next_subnode(&self, node: Node) -> Result<Option<Node>> {
        let mut pos = self.skip_node(node)?;
        loop {
            match self.token(pos)? {
                FDT_NOP => pos += 4,
                FDT_PROP => pos = self.skip_prop(pos)?,
                FDT_BEGIN_NODE => return Ok(Some(Node(pos))),
                FDT_END_NODE | FDT_END => return Ok(None),
                _ => return Err(FitError::Truncated),
            }
        }
    }

    /// Child of `parent` with the given name, if any
    pub fn subnode(&self, parent: Node, name: &str) -> Result<Option<Node>> {
        let mut child = self.first_subnode(parent)?;
        while let Some(node) = child {
            if self.node_name(node)? == name {
                return Ok(Some(node));
            }
            child = self.next_subnode(node)?;
        }
        Ok(None)
    }

    /// Property value of a node by name.
    ///
    /// Lookup is a linear scan of the node's property list; typical nodes
    /// carry tens of entries at most.
    pub fn property(&self, node: Node, name: &str) -> Result<Option<&'a [u8]>> {
        let mut pos = self.skip_name(node)?;
        loop {
            match self.token(pos)? {
                FDT_NOP => pos += 4,
                FDT_PROP => {
                    let len = self.read_u32(pos + 4)? as usize;
                    let name_off = self.read_u32(pos + 8)? as usize;
                    let value = pos + 12;
                    let end = value.checked_add(len).ok_or(FitError::Truncated)?;
                    if end > self.struct_end {
                        return Err(FitError::Truncated);
                    }
                    if self.prop_name(name_off)? == name {
                        return Ok(Some(&self.blob[value..end]));
                    }
                    pos = (end + 3) & !3;
                }
                // Properties always precede subnodes
                FDT_BEGIN_NODE | FDT_END_NODE => return Ok(None),
                _ => return Err(FitError::Truncated),
            }
        }
    }

    /// Property value interpreted as a NUL-terminated string
    pub fn property_str(&self, node: Node, name: &str) -> Result<Option<&'a str>> {
        match self.property(node, name)? {
            Some(value) => {
                let end = value
                    .iter()
                    .position(|&b| b == 0)
                    .unwrap_or(value.len());
                core::str::from_utf8(&value[..end])
                    .map(Some)
                    .map_err(|_| FitError::InvalidString)
            }
            None => Ok(None),
        }
    }

    /// Resolve a property name from the strings block
    fn prop_name(&self, name_off: usize) -> Result<&'a str> {
        let start = self
            .strings_off
            .checked_add(name_off)
            .ok_or(FitError::MalformedProperty)?;
        if start >= self.strings_end {
            return Err(FitError::MalformedProperty);
        }
        let mut end = start;
        while end < self.strings_end && self.blob[end] != 0 {
            end += 1;
        }
        core::str::from_utf8(&self.blob[start..end]).map_err(|_| FitError::InvalidString)
    }
}
