//! Container loading and hand-off
//!
//! Pulls the boot container off a [`BlockBackend`], drains the default
//! configuration's firmware list in index order, and copies every
//! payload into RAM. The image at index 0 supplies the entry point and
//! must carry one; later images are side-loaded data with no control-flow
//! significance.

use fitimage::{Fit, FitError, Header, ImageRole, HEADER_SIZE};
use storage::{BlockBackend, MediumKind, StorageError};

use crate::bprintln;
use crate::error::BootError;
use crate::ram::{Handoff, Ram};

/// Outcome of a completed load, before hand-off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    /// Entry point taken from the first firmware image
    pub entry_point: u64,
    /// Number of firmware images copied
    pub images: usize,
}

fn read_exact(
    backend: &mut dyn BlockBackend,
    offset: u64,
    buf: &mut [u8],
) -> Result<(), BootError> {
    let got = backend.read(offset, buf)?;
    if got != buf.len() {
        return Err(BootError::Storage(StorageError::Io(got)));
    }
    Ok(())
}

/// Load every firmware image of the default configuration into RAM.
///
/// `scratch` stages the container itself; payloads are read straight
/// from the backend into their load windows. The header is validated
/// before any further read, so a wrong magic costs exactly one
/// header-sized transfer.
pub fn load(
    backend: &mut dyn BlockBackend,
    ram: &mut dyn Ram,
    scratch: &mut [u8],
) -> Result<LoadSummary, BootError> {
    let mut head = [0u8; HEADER_SIZE];
    read_exact(backend, 0, &mut head)?;
    let header = Header::parse(&head)?;

    let total = header.total_size as usize;
    if total > scratch.len() {
        return Err(BootError::ContainerTooLarge);
    }
    let container = &mut scratch[..total];
    read_exact(backend, 0, container)?;

    let fit = Fit::parse(container)?;
    let config = fit.select_configuration()?;
    match config.description {
        Some(desc) => bprintln!("boot: configuration '{}' ({})", config.name, desc),
        None => bprintln!("boot: configuration '{}'", config.name),
    }

    let mut entry_point = None;
    let mut index = 0;
    while let Some(node) = fit.image_node(&config, ImageRole::Firmware, index)? {
        let image = fit.describe_image(node)?;
        let loc = fit.resolve(&image)?;

        let window = ram.window(image.load_address, loc.size as usize)?;
        read_exact(backend, loc.pos, window)?;
        bprintln!(
            "boot: '{}' {} bytes -> {:#x}",
            image.name,
            loc.size,
            image.load_address
        );

        if index == 0 {
            // Images past index 0 carry no entry point for the loader
            entry_point = Some(
                image
                    .entry_point
                    .ok_or(BootError::Container(FitError::MissingProperty))?,
            );
        }
        index += 1;
    }

    let entry_point = entry_point.ok_or(BootError::NoFirmware)?;
    Ok(LoadSummary {
        entry_point,
        images: index,
    })
}

/// Load the container and jump through the platform trampoline.
///
/// For a memory-mapped boot medium the data cache is cleaned first, so
/// the copied regions are visible to the next stage. Returns only on
/// failure; the `Infallible` success type makes that explicit.
pub fn boot(
    backend: &mut dyn BlockBackend,
    ram: &mut dyn Ram,
    scratch: &mut [u8],
    handoff: &mut dyn Handoff,
) -> Result<core::convert::Infallible, BootError> {
    let summary = load(backend, ram, scratch)?;

    if backend.kind() == MediumKind::XipNor {
        handoff.clean_dcache();
    }
    bprintln!("boot: jumping to {:#x}", summary.entry_point);
    handoff.jump(summary.entry_point)
}
