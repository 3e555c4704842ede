//! Buffer injector: packs a kernel's named values into the metadata
//! buffer and rewrites `LOAD_BUFFER(key)` placeholders into loads.
//!
//! Cells are assigned in registration order, one per value that has to
//! be read at run time:
//!
//! | value                               | cell | load expression                       |
//! |-------------------------------------|------|---------------------------------------|
//! | static allocation, fixed offset     | no   | `(static_buffer + OFF)`               |
//! | dynamic or deferred-offset alloc    | yes  | `(dynamic_buffer + meta_buffer[K])`   |
//! | `Int`                               | yes  | `meta_buffer[K]`                      |
//! | `Float`                             | yes  | `as_type<float>(meta_buffer[K])`      |
//! | `Deferred`                          | yes  | `meta_buffer[K]` (zero until patched) |

use std::collections::{HashMap, HashSet};

use crate::diagnostic::Diagnostic;
use crate::error::{LowerError, Result};
use crate::kir::kernel::{
    BufferSlot, KernelBuffer, MetaBuffer, MetaCell, UnresolvedValue, META_CELL_BYTES,
};
use crate::kir::template::{Directive, Template};
use crate::layout::{Allocation, Offset, Segment};
use crate::placeholder::Placeholder;
use crate::span::Span;

/// A value a kernel reads through `LOAD_BUFFER(key)`.
#[derive(Clone, Debug, PartialEq)]
pub enum InjectValue {
    Allocation(Allocation),
    Int(i32),
    Float(f32),
    Deferred(Placeholder),
}

impl InjectValue {
    /// Integer from an unsigned extent or parameter.
    pub fn extent(name: &str, value: u32) -> Result<Self> {
        i32::try_from(value)
            .map(InjectValue::Int)
            .map_err(|_| LowerError::InvalidParameter {
                name: name.to_string(),
                reason: format!("{} exceeds the 32-bit metadata cell", value),
            })
    }
}

impl From<&Allocation> for InjectValue {
    fn from(a: &Allocation) -> Self {
        InjectValue::Allocation(a.clone())
    }
}

impl From<i32> for InjectValue {
    fn from(v: i32) -> Self {
        InjectValue::Int(v)
    }
}

impl From<f32> for InjectValue {
    fn from(v: f32) -> Self {
        InjectValue::Float(v)
    }
}

impl From<Placeholder> for InjectValue {
    fn from(p: Placeholder) -> Self {
        InjectValue::Deferred(p)
    }
}

struct Entry {
    key: String,
    cell: Option<usize>,
    load: String,
}

#[derive(Default)]
pub struct BufferInjector {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
    cells: Vec<MetaCell>,
    unresolved: Vec<UnresolvedValue>,
    warnings: Vec<Diagnostic>,
}

impl BufferInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register values in order. Fails without registering anything if
    /// any key is already present or repeated within `values`.
    pub fn register<I, K>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, InjectValue)>,
        K: Into<String>,
    {
        let batch: Vec<(String, InjectValue)> =
            values.into_iter().map(|(k, v)| (k.into(), v)).collect();

        let mut seen = HashSet::new();
        for (key, _) in &batch {
            if self.index.contains_key(key) || !seen.insert(key.as_str()) {
                return Err(LowerError::DuplicateKey { key: key.clone() });
            }
        }
        for (key, value) in &batch {
            if let InjectValue::Allocation(Allocation {
                offset: Offset::Fixed(off),
                segment: Segment::Dynamic,
                ..
            }) = value
            {
                if i32::try_from(*off).is_err() {
                    return Err(LowerError::InvalidParameter {
                        name: key.clone(),
                        reason: format!("offset {} exceeds the 32-bit metadata cell", off),
                    });
                }
            }
        }

        for (key, value) in batch {
            let entry = self.pack(key, value);
            self.index.insert(entry.key.clone(), self.entries.len());
            self.entries.push(entry);
        }
        Ok(())
    }

    fn pack(&mut self, key: String, value: InjectValue) -> Entry {
        let meta = BufferSlot::Meta.ident();
        let cell = self.cells.len();
        let (packed, deferred, load) = match value {
            InjectValue::Allocation(alloc) => {
                let base = match alloc.segment {
                    Segment::Static => BufferSlot::Static.ident(),
                    Segment::Dynamic => BufferSlot::Dynamic.ident(),
                };
                let load = format!("({} + {}[{}])", base, meta, cell);
                match (alloc.segment, alloc.offset) {
                    (Segment::Static, Offset::Fixed(off)) => {
                        return Entry {
                            key,
                            cell: None,
                            load: format!("({} + {})", base, off),
                        };
                    }
                    (_, Offset::Fixed(off)) => (MetaCell::int(off as i32), None, load),
                    (_, Offset::Deferred(p)) => (MetaCell::default(), Some(p), load),
                }
            }
            InjectValue::Int(v) => (MetaCell::int(v), None, format!("{}[{}]", meta, cell)),
            InjectValue::Float(v) => (
                MetaCell::float(v),
                None,
                format!("as_type<float>({}[{}])", meta, cell),
            ),
            InjectValue::Deferred(p) => (MetaCell::default(), Some(p), format!("{}[{}]", meta, cell)),
        };
        self.cells.push(packed);
        if let Some(placeholder) = deferred {
            self.unresolved.push(UnresolvedValue {
                cell,
                byte_offset: cell * META_CELL_BYTES,
                key: key.clone(),
                placeholder,
            });
        }
        Entry {
            key,
            cell: Some(cell),
            load,
        }
    }

    /// Replace buffer slots and `LOAD_BUFFER` placeholders in `text`.
    /// `%%FUNC_NAME%%` is left for the name injector.
    pub fn inject(&mut self, text: &str) -> Result<String> {
        let template = Template::parse(text)?;
        self.warnings.clear();
        let mut used = HashSet::new();
        let source = template.render(|directive| match directive {
            Directive::FuncName => Ok(directive.to_string()),
            Directive::Slot(slot) => Ok(slot.ident().to_string()),
            Directive::LoadBuffer(key) => {
                let entry = self
                    .index
                    .get(*key)
                    .map(|&i| &self.entries[i])
                    .ok_or_else(|| LowerError::UnknownPlaceholder {
                        key: key.to_string(),
                    })?;
                used.insert(entry.key.clone());
                Ok(entry.load.clone())
            }
        })?;

        for entry in &self.entries {
            if !used.contains(&entry.key) {
                tracing::warn!(key = %entry.key, "metadata key registered but never loaded");
                self.warnings.push(Diagnostic::warning(
                    format!("metadata key '{}' is never loaded by the kernel", entry.key),
                    Span::dummy(),
                ));
            }
        }
        Ok(source)
    }

    pub fn meta_buffer(&self) -> MetaBuffer {
        MetaBuffer::new(self.cells.clone())
    }

    /// Kernel arguments in slot order.
    pub fn buffers(&self) -> Vec<KernelBuffer> {
        vec![
            KernelBuffer::Static,
            KernelBuffer::Dynamic,
            KernelBuffer::Meta {
                cells: self.meta_buffer(),
            },
        ]
    }

    pub fn unresolved_values(&self) -> &[UnresolvedValue] {
        &self.unresolved
    }

    /// Soft warnings from the last `inject` (unused keys).
    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    /// Metadata cell assigned to `key`, if it has one.
    pub fn cell_of(&self, key: &str) -> Option<usize> {
        self.index.get(key).and_then(|&i| self.entries[i].cell)
    }
}
