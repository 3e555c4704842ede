//! Memory layout: where each tensor lives on the device.
//!
//! The allocator runs upstream and hands over a finished layout. Static
//! tensors (weights) sit in the static buffer at offsets fixed at compile
//! time; dynamic tensors (activations) sit in the dynamic buffer, and
//! their offsets may only be known once the loader sizes that buffer.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{LowerError, Result};
use crate::graph::TensorDescriptor;
use crate::placeholder::Placeholder;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Segment {
    Static,
    Dynamic,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Static => f.write_str("static"),
            Segment::Dynamic => f.write_str("dynamic"),
        }
    }
}

/// Element offset into a segment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Offset {
    Fixed(u32),
    Deferred(Placeholder),
}

/// One tensor's place in device memory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub segment: Segment,
    pub offset: Offset,
    /// Element count reserved for the tensor.
    pub size: u32,
}

impl Allocation {
    pub fn fixed(segment: Segment, offset: u32, size: u32) -> Self {
        Self {
            segment,
            offset: Offset::Fixed(offset),
            size,
        }
    }

    pub fn deferred(segment: Segment, offset: Placeholder, size: u32) -> Self {
        Self {
            segment,
            offset: Offset::Deferred(offset),
            size,
        }
    }
}

/// Tensor name → allocation. Read-only once lowering starts.
#[derive(Clone, Debug, Default)]
pub struct MemoryLayout {
    allocations: HashMap<String, Allocation>,
}

impl MemoryLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tensor: impl Into<String>, allocation: Allocation) {
        self.allocations.insert(tensor.into(), allocation);
    }

    /// Allocation of `tensor`. A missing entry is an allocator bug.
    pub fn lookup(&self, tensor: &TensorDescriptor) -> Result<&Allocation> {
        self.allocations
            .get(tensor.name())
            .ok_or_else(|| LowerError::MissingLayout {
                tensor: tensor.name().to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.allocations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Order;

    fn tensor(name: &str) -> TensorDescriptor {
        TensorDescriptor::new(name, Order::nhwc(), vec![1, 2, 2, 4]).unwrap()
    }

    #[test]
    fn test_lookup_hit() {
        let mut layout = MemoryLayout::new();
        layout.insert("x", Allocation::fixed(Segment::Static, 16, 16));
        let alloc = layout.lookup(&tensor("x")).unwrap();
        assert_eq!(alloc.segment, Segment::Static);
        assert_eq!(alloc.offset, Offset::Fixed(16));
    }

    #[test]
    fn test_lookup_missing_is_error() {
        let layout = MemoryLayout::new();
        let err = layout.lookup(&tensor("ghost")).unwrap_err();
        assert!(matches!(err, LowerError::MissingLayout { tensor } if tensor == "ghost"));
    }

    #[test]
    fn test_offset_json_forms() {
        let fixed: Allocation =
            serde_json::from_str(r#"{"segment":"dynamic","offset":32,"size":8}"#).unwrap();
        assert_eq!(fixed, Allocation::fixed(Segment::Dynamic, 32, 8));

        let deferred: Allocation = serde_json::from_str(
            r#"{"segment":"dynamic","offset":{"label":"y_offset"},"size":8}"#,
        )
        .unwrap();
        assert_eq!(
            deferred,
            Allocation::deferred(Segment::Dynamic, Placeholder::new("y_offset"), 8)
        );
    }
}
