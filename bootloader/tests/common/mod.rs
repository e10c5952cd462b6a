//! Shared fixtures: container assembly and platform test doubles

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use bootloader::{BootError, Handoff, Ram};

const FDT_MAGIC: u32 = 0xd00d_feed;
const FDT_BEGIN_NODE: u32 = 0x1;
const FDT_END_NODE: u32 = 0x2;
const FDT_PROP: u32 = 0x3;
const FDT_END: u32 = 0x9;

/// One firmware image entry for [`make_container`]
pub struct ImageSpec<'a> {
    pub name: &'a str,
    pub load: u32,
    pub entry: Option<u32>,
    pub payload: &'a [u8],
}

/// Assemble a bootable container: the given firmware images under
/// `/images`, one default configuration listing them in order, payloads
/// appended after the aligned end of the tree.
pub fn make_container(images: &[ImageSpec<'_>]) -> Vec<u8> {
    let mut structure = Vec::new();
    let mut strings = Vec::new();

    let token = |buf: &mut Vec<u8>, value: u32| buf.extend_from_slice(&value.to_be_bytes());
    let pad = |buf: &mut Vec<u8>| {
        while buf.len() % 4 != 0 {
            buf.push(0);
        }
    };
    let mut intern = |name: &str| -> u32 {
        let mut needle = name.as_bytes().to_vec();
        needle.push(0);
        if let Some(off) = strings
            .windows(needle.len())
            .position(|window| window == needle)
        {
            return off as u32;
        }
        let off = strings.len() as u32;
        strings.extend_from_slice(&needle);
        off
    };

    let mut begin_node = |structure: &mut Vec<u8>, name: &str| {
        token(structure, FDT_BEGIN_NODE);
        structure.extend_from_slice(name.as_bytes());
        structure.push(0);
        pad(structure);
    };
    let mut prop = |structure: &mut Vec<u8>, name: &str, value: &[u8]| {
        let name_off = intern(name);
        token(structure, FDT_PROP);
        token(structure, value.len() as u32);
        token(structure, name_off);
        structure.extend_from_slice(value);
        pad(structure);
    };

    // Payload offsets relative to the aligned end of the container,
    // assigned in order with 4-byte alignment between payloads
    let mut offsets = Vec::new();
    let mut next_offset = 0u32;
    for image in images {
        offsets.push(next_offset);
        next_offset += (image.payload.len() as u32 + 3) & !3;
    }

    begin_node(&mut structure, ""); // root
    begin_node(&mut structure, "images");
    for (image, offset) in images.iter().zip(&offsets) {
        begin_node(&mut structure, image.name);
        prop(&mut structure, "load", &image.load.to_be_bytes());
        if let Some(entry) = image.entry {
            prop(&mut structure, "entry", &entry.to_be_bytes());
        }
        prop(
            &mut structure,
            "data-size",
            &(image.payload.len() as u32).to_be_bytes(),
        );
        prop(&mut structure, "data-offset", &offset.to_be_bytes());
        token(&mut structure, FDT_END_NODE);
    }
    token(&mut structure, FDT_END_NODE); // /images

    begin_node(&mut structure, "configurations");
    let mut list = Vec::new();
    for image in images {
        list.extend_from_slice(image.name.as_bytes());
        list.push(0);
    }
    prop(&mut structure, "default", b"boot\0");
    begin_node(&mut structure, "boot");
    prop(&mut structure, "firmware", &list);
    token(&mut structure, FDT_END_NODE);
    token(&mut structure, FDT_END_NODE); // /configurations

    token(&mut structure, FDT_END_NODE); // root
    token(&mut structure, FDT_END);

    let header_size = 40u32;
    let memrsv_size = 16u32;
    let off_dt_struct = header_size + memrsv_size;
    let off_dt_strings = off_dt_struct + structure.len() as u32;
    let total_size = off_dt_strings + strings.len() as u32;

    let mut blob = Vec::new();
    for word in [
        FDT_MAGIC,
        total_size,
        off_dt_struct,
        off_dt_strings,
        header_size,
        17,
        16,
        0,
        strings.len() as u32,
        structure.len() as u32,
    ] {
        blob.extend_from_slice(&word.to_be_bytes());
    }
    blob.extend_from_slice(&[0u8; 16]);
    blob.extend_from_slice(&structure);
    blob.extend_from_slice(&strings);

    // External data area
    let ext_base = ((total_size + 3) & !3) as usize;
    blob.resize(ext_base, 0);
    for image in images {
        blob.extend_from_slice(image.payload);
        while (blob.len() - ext_base) % 4 != 0 {
            blob.push(0);
        }
    }
    blob
}

/// RAM arena over one address range, recording every window handed out
pub struct TestRam {
    base: u64,
    mem: Vec<u8>,
    pub windows: Vec<(u64, usize)>,
}

impl TestRam {
    pub fn new(base: u64, len: usize) -> Self {
        Self {
            base,
            mem: vec![0; len],
            windows: Vec::new(),
        }
    }

    pub fn bytes_at(&self, addr: u64, len: usize) -> &[u8] {
        let start = (addr - self.base) as usize;
        &self.mem[start..start + len]
    }
}

impl Ram for TestRam {
    fn window(&mut self, addr: u64, len: usize) -> Result<&mut [u8], BootError> {
        let end = addr.checked_add(len as u64).ok_or(BootError::BadLoadRegion)?;
        if addr < self.base || end > self.base + self.mem.len() as u64 {
            return Err(BootError::BadLoadRegion);
        }
        self.windows.push((addr, len));
        let start = (addr - self.base) as usize;
        Ok(&mut self.mem[start..start + len])
    }
}

/// Trampoline double: records the jump, then unwinds out of the
/// never-returning call so the test can inspect it
pub struct PanicHandoff {
    pub entry: Arc<AtomicU64>,
    pub cleaned: Arc<AtomicBool>,
}

impl PanicHandoff {
    pub fn new() -> (Self, Arc<AtomicU64>, Arc<AtomicBool>) {
        let entry = Arc::new(AtomicU64::new(0));
        let cleaned = Arc::new(AtomicBool::new(false));
        (
            Self {
                entry: entry.clone(),
                cleaned: cleaned.clone(),
            },
            entry,
            cleaned,
        )
    }
}

impl Handoff for PanicHandoff {
    fn clean_dcache(&mut self) {
        self.cleaned.store(true, Ordering::SeqCst);
    }

    fn jump(&mut self, entry: u64) -> ! {
        self.entry.store(entry, Ordering::SeqCst);
        panic!("handoff");
    }
}
