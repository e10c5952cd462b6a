//! FIT/ITB Boot Container Parser
//!
//! A `no_std` parser for the Flattened-Image-Tree container format used by
//! second-stage bootloaders to bundle firmware payloads with named boot
//! configurations.
//!
//! # Overview
//!
//! A FIT container is a big-endian, 4-byte-aligned device-tree blob with two
//! top-level nodes:
//! - `/images` - one child node per payload, carrying load/entry addresses
//!   and the location of the payload data
//! - `/configurations` - named sets of image references plus a `default`
//!   property selecting the configuration to boot
//!
//! Payload data normally lives *outside* the tree, appended after the
//! container and addressed either absolutely (`data-position`) or relative to
//! the 4-byte-aligned end of the container (`data-offset`).
//!
//! # Architecture
//!
//! The implementation is layered:
//! 1. **Header layer** - Fixed 40-byte big-endian header, magic validation
//! 2. **Tree layer** - Bounds-checked structure-block walking
//! 3. **Configuration layer** - Default-configuration selection, image lists
//! 4. **Image layer** - Address reassembly and payload location resolution
//!
//! The blob is untrusted input: every offset and length read from it is
//! checked against the caller-supplied buffer before use, never against the
//! blob's own claimed sizes alone.
//!
//! # Usage
//!
//! ```ignore
//! use fitimage::{Fit, ImageRole};
//!
//! let fit = Fit::parse(&blob)?;
//! let config = fit.select_configuration()?;
//!
//! let mut index = 0;
//! while let Some(node) = fit.image_node(&config, ImageRole::Firmware, index)? {
//!     let image = fit.describe_image(node)?;
//!     let loc = fit.resolve(&image)?;
//!     // read loc.size bytes at loc.pos, copy to image.load_address
//!     index += 1;
//! }
//! ```

#![no_std]
#![warn(missing_docs)]

pub mod error;
pub mod types;
pub mod header;
pub mod tree;
pub mod config;
pub mod image;

pub use error::{FitError, Result};
pub use types::{DataLocation, ImageDescriptor, ImageRole, ResolvedLocation, HEADER_SIZE};
pub use header::Header;
pub use tree::{Fit, Node};
pub use config::Configuration;
