//! The finished lowering artifact.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::placeholder::Placeholder;

// ─── Buffer slots ──────────────────────────────────────────────────

/// Fixed kernel argument slots. Every generated kernel takes the same
/// three buffers in this order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BufferSlot {
    Static,
    Dynamic,
    Meta,
}

impl BufferSlot {
    pub const ALL: [BufferSlot; 3] = [BufferSlot::Static, BufferSlot::Dynamic, BufferSlot::Meta];

    /// `[[buffer(n)]]` binding index.
    pub fn index(self) -> u32 {
        match self {
            BufferSlot::Static => 0,
            BufferSlot::Dynamic => 1,
            BufferSlot::Meta => 2,
        }
    }

    /// Argument identifier in generated source.
    pub fn ident(self) -> &'static str {
        match self {
            BufferSlot::Static => "static_buffer",
            BufferSlot::Dynamic => "dynamic_buffer",
            BufferSlot::Meta => "meta_buffer",
        }
    }

    /// Template placeholder name (without delimiters).
    pub fn placeholder(self) -> &'static str {
        match self {
            BufferSlot::Static => "STATIC_BUFFER",
            BufferSlot::Dynamic => "DYNAMIC_BUFFER",
            BufferSlot::Meta => "META_BUFFER",
        }
    }
}

// ─── Metadata buffer ───────────────────────────────────────────────

/// Width of one metadata cell in bytes.
pub const META_CELL_BYTES: usize = 4;

/// One 32-bit metadata cell. Integers are stored two's complement,
/// floats as their IEEE-754 bits.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MetaCell(pub u32);

impl MetaCell {
    pub fn int(v: i32) -> Self {
        Self(v as u32)
    }

    pub fn float(v: f32) -> Self {
        Self(v.to_bits())
    }

    pub fn as_int(self) -> i32 {
        self.0 as i32
    }
}

/// Packed scalar metadata, one cell per scalar key in registration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetaBuffer {
    cells: Vec<MetaCell>,
}

impl MetaBuffer {
    pub fn new(cells: Vec<MetaCell>) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[MetaCell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Byte view handed to the device (host endianness; Metal devices are
    /// little-endian).
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.cells)
    }
}

impl Serialize for MetaBuffer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.cells.iter().map(|c| c.as_int()))
    }
}

/// One kernel argument, in slot order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "slot", rename_all = "lowercase")]
pub enum KernelBuffer {
    Static,
    Dynamic,
    Meta { cells: MetaBuffer },
}

impl KernelBuffer {
    pub fn slot(&self) -> BufferSlot {
        match self {
            KernelBuffer::Static => BufferSlot::Static,
            KernelBuffer::Dynamic => BufferSlot::Dynamic,
            KernelBuffer::Meta { .. } => BufferSlot::Meta,
        }
    }
}

/// A metadata cell whose value the loader must fill in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UnresolvedValue {
    /// Cell index in the metadata buffer.
    pub cell: usize,
    pub byte_offset: usize,
    /// Metadata key that produced the cell.
    pub key: String,
    pub placeholder: Placeholder,
}

// ─── Launch sizes ──────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Dim {
    Fixed(u32),
    Preset(Placeholder),
}

impl Serialize for Dim {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Dim::Fixed(v) => serializer.serialize_u32(*v),
            Dim::Preset(p) => serializer.serialize_str(&p.label),
        }
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dim::Fixed(v) => write!(f, "{}", v),
            Dim::Preset(p) => write!(f, "{}", p),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GpuSize {
    pub x: Dim,
    pub y: Dim,
    pub z: Dim,
}

impl GpuSize {
    pub fn fixed(x: u32, y: u32, z: u32) -> Self {
        Self {
            x: Dim::Fixed(x),
            y: Dim::Fixed(y),
            z: Dim::Fixed(z),
        }
    }

    /// `(MAX_THREADS_PER_THREADGROUP, 1, 1)`.
    pub fn max_threads() -> Self {
        Self {
            x: Dim::Preset(Placeholder::max_threads_per_threadgroup()),
            y: Dim::Fixed(1),
            z: Dim::Fixed(1),
        }
    }

    pub fn dims(&self) -> [&Dim; 3] {
        [&self.x, &self.y, &self.z]
    }
}

impl fmt::Display for GpuSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

// ─── Kernel ────────────────────────────────────────────────────────

/// A generated kernel: source, launch configuration, and buffers.
///
/// Immutable once built. Deferred metadata cells are zero until a loader
/// patches them (see `Kernel::patch`).
#[derive(Clone, Debug, Serialize)]
pub struct Kernel {
    name: String,
    sources: BTreeMap<String, String>,
    entry_point: String,
    grid_size: GpuSize,
    threadgroup_size: GpuSize,
    buffers: Vec<KernelBuffer>,
    unresolved_values: Vec<UnresolvedValue>,
    #[serde(serialize_with = "serialize_hex")]
    fingerprint: [u8; 32],
}

impl Kernel {
    /// Build a single-source kernel whose entry point is `name`.
    pub fn new(
        name: String,
        source: String,
        grid_size: GpuSize,
        threadgroup_size: GpuSize,
        buffers: Vec<KernelBuffer>,
        unresolved_values: Vec<UnresolvedValue>,
    ) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(source.as_bytes());
        for buffer in &buffers {
            if let KernelBuffer::Meta { cells } = buffer {
                hasher.update(cells.as_bytes());
            }
        }
        for value in &unresolved_values {
            hasher.update(&(value.cell as u64).to_le_bytes());
            hasher.update(value.key.as_bytes());
            hasher.update(&[0]);
            hasher.update(value.placeholder.label.as_bytes());
            hasher.update(&[0]);
        }
        for dim in grid_size.dims().into_iter().chain(threadgroup_size.dims()) {
            match dim {
                Dim::Fixed(v) => {
                    hasher.update(&[1]);
                    hasher.update(&v.to_le_bytes());
                }
                Dim::Preset(p) => {
                    hasher.update(&[2]);
                    hasher.update(p.label.as_bytes());
                    hasher.update(&[0]);
                }
            }
        }
        let fingerprint = *hasher.finalize().as_bytes();

        let mut sources = BTreeMap::new();
        sources.insert(name.clone(), source);
        Self {
            entry_point: name.clone(),
            name,
            sources,
            grid_size,
            threadgroup_size,
            buffers,
            unresolved_values,
            fingerprint,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sources(&self) -> &BTreeMap<String, String> {
        &self.sources
    }

    /// Source text of the entry point.
    pub fn source(&self) -> &str {
        self.sources
            .get(&self.entry_point)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    pub fn grid_size(&self) -> &GpuSize {
        &self.grid_size
    }

    pub fn threadgroup_size(&self) -> &GpuSize {
        &self.threadgroup_size
    }

    pub fn buffers(&self) -> &[KernelBuffer] {
        &self.buffers
    }

    pub fn meta_buffer(&self) -> Option<&MetaBuffer> {
        self.buffers.iter().find_map(|b| match b {
            KernelBuffer::Meta { cells } => Some(cells),
            _ => None,
        })
    }

    pub fn unresolved_values(&self) -> &[UnresolvedValue] {
        &self.unresolved_values
    }

    /// True when no metadata cell or launch dimension waits on the loader.
    pub fn is_ready(&self) -> bool {
        self.unresolved_values.is_empty()
            && self
                .grid_size
                .dims()
                .into_iter()
                .chain(self.threadgroup_size.dims())
                .all(|d| matches!(d, Dim::Fixed(_)))
    }

    /// BLAKE3 over the source, metadata bytes, unresolved cells, and launch sizes.
    pub fn fingerprint(&self) -> &[u8; 32] {
        &self.fingerprint
    }

    pub fn fingerprint_hex(&self) -> String {
        hex(&self.fingerprint)
    }
}

pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn serialize_hex<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex(bytes))
}
