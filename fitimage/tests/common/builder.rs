//! Test fixture emitting real FIT blobs byte by byte

const FDT_MAGIC: u32 = 0xd00d_feed;
const FDT_BEGIN_NODE: u32 = 0x1;
const FDT_END_NODE: u32 = 0x2;
const FDT_PROP: u32 = 0x3;
const FDT_END: u32 = 0x9;

/// Builds a structurally valid container: header, empty memory reservation
/// block, structure block, strings block, in that order.
pub struct FitBuilder {
    structure: Vec<u8>,
    strings: Vec<u8>,
}

impl FitBuilder {
    pub fn new() -> Self {
        let mut builder = Self {
            structure: Vec::new(),
            strings: Vec::new(),
        };
        builder.begin_node(""); // root
        builder
    }

    pub fn begin_node(&mut self, name: &str) -> &mut Self {
        self.token(FDT_BEGIN_NODE);
        self.structure.extend_from_slice(name.as_bytes());
        self.structure.push(0);
        self.pad();
        self
    }

    pub fn end_node(&mut self) -> &mut Self {
        self.token(FDT_END_NODE);
        self
    }

    pub fn prop(&mut self, name: &str, value: &[u8]) -> &mut Self {
        let name_off = self.intern(name);
        self.token(FDT_PROP);
        self.token(value.len() as u32);
        self.token(name_off);
        self.structure.extend_from_slice(value);
        self.pad();
        self
    }

    pub fn prop_str(&mut self, name: &str, value: &str) -> &mut Self {
        let mut bytes = value.as_bytes().to_vec();
        bytes.push(0);
        self.prop(name, &bytes)
    }

    /// NUL-separated string list, as used by configuration image lists
    pub fn prop_str_list(&mut self, name: &str, values: &[&str]) -> &mut Self {
        let mut bytes = Vec::new();
        for value in values {
            bytes.extend_from_slice(value.as_bytes());
            bytes.push(0);
        }
        self.prop(name, &bytes)
    }

    pub fn prop_u32(&mut self, name: &str, value: u32) -> &mut Self {
        self.prop(name, &value.to_be_bytes())
    }

    pub fn prop_u64(&mut self, name: &str, value: u64) -> &mut Self {
        self.prop(name, &value.to_be_bytes())
    }

    /// Assemble the final blob. The root node is closed automatically.
    pub fn build(mut self) -> Vec<u8> {
        self.end_node();
        self.token(FDT_END);

        let header_size = 40;
        let memrsv_size = 16; // one terminating (0, 0) entry
        let off_dt_struct = header_size + memrsv_size;
        let off_dt_strings = off_dt_struct + self.structure.len() as u32;
        let total_size = off_dt_strings + self.strings.len() as u32;

        let mut blob = Vec::with_capacity(total_size as usize);
        for word in [
            FDT_MAGIC,
            total_size,
            off_dt_struct,
            off_dt_strings,
            header_size, // off_mem_rsvmap
            17,          // version
            16,          // last_comp_version
            0,           // boot_cpuid_phys
            self.strings.len() as u32,
            self.structure.len() as u32,
        ] {
            blob.extend_from_slice(&word.to_be_bytes());
        }
        blob.extend_from_slice(&[0u8; 16]);
        blob.extend_from_slice(&self.structure);
        blob.extend_from_slice(&self.strings);
        blob
    }

    fn token(&mut self, value: u32) {
        self.structure.extend_from_slice(&value.to_be_bytes());
    }

    fn pad(&mut self) {
        while self.structure.len() % 4 != 0 {
            self.structure.push(0);
        }
    }

    fn intern(&mut self, name: &str) -> u32 {
        // Reuse an existing entry when the name is already present
        let needle = {
            let mut bytes = name.as_bytes().to_vec();
            bytes.push(0);
            bytes
        };
        if let Some(off) = find_subslice(&self.strings, &needle) {
            return off as u32;
        }
        let off = self.strings.len() as u32;
        self.strings.extend_from_slice(&needle);
        off
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Append an external payload after the container at the next 4-byte-aligned
/// slot. Returns the payload's offset relative to the aligned end of the
/// container, i.e. the value a `data-offset` property would carry.
pub fn append_payload(blob: &mut Vec<u8>, payload: &[u8]) -> u64 {
    let total_size = u32::from_be_bytes([blob[4], blob[5], blob[6], blob[7]]);
    let ext_base = ((total_size + 3) & !3) as usize;
    while blob.len() < ext_base || (blob.len() - ext_base) % 4 != 0 {
        blob.push(0);
    }
    let offset = (blob.len() - ext_base) as u64;
    blob.extend_from_slice(payload);
    offset
}

/// A typical two-firmware container: `fw@1` at data-offset 0 with an entry
/// point, `fw@2` at the next offset without one.
pub fn two_firmware_fit(payload1: &[u8], payload2: &[u8]) -> Vec<u8> {
    let mut builder = FitBuilder::new();
    builder
        .begin_node("images")
        .begin_node("fw@1")
        .prop_str("description", "first stage payload")
        .prop_u32("load", 0x4000_0000)
        .prop_u32("entry", 0x4000_0000)
        .prop_u32("data-size", payload1.len() as u32)
        .prop_u32("data-offset", 0)
        .end_node()
        .begin_node("fw@2")
        .prop_str("description", "second stage payload")
        .prop_u32("load", 0x4100_0000)
        .prop_u32("data-size", payload2.len() as u32)
        .prop_u32("data-offset", ((payload1.len() + 3) & !3) as u32)
        .end_node()
        .end_node()
        .begin_node("configurations")
        .prop_str("default", "boot")
        .begin_node("boot")
        .prop_str_list("firmware", &["fw@1", "fw@2"])
        .end_node()
        .end_node();

    let mut blob = builder.build();
    append_payload(&mut blob, payload1);
    append_payload(&mut blob, payload2);
    blob
}
