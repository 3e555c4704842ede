//! Operator graph: tensor descriptors and the operators that consume them.
//!
//! The graph is built upstream (parsing, scheduling) and is read-only
//! here. Operators are a closed set of kinds with typed fields, so a
//! handler never looks up inputs or parameters by string at lowering
//! time; the string-keyed form only exists at the file boundary in
//! `description`.

pub mod description;
#[cfg(test)]
mod tests;

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LowerError, Result};

// ─── Axes and orders ───────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    N,
    H,
    W,
    C,
}

impl Axis {
    pub fn as_char(self) -> char {
        match self {
            Axis::N => 'N',
            Axis::H => 'H',
            Axis::W => 'W',
            Axis::C => 'C',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'N' => Some(Axis::N),
            'H' => Some(Axis::H),
            'W' => Some(Axis::W),
            'C' => Some(Axis::C),
            _ => None,
        }
    }
}

/// Memory order of a tensor's axes, outermost first.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Order(Vec<Axis>);

impl Order {
    pub fn new(axes: Vec<Axis>) -> Result<Self> {
        let mut seen = HashSet::new();
        for axis in &axes {
            if !seen.insert(*axis) {
                return Err(LowerError::InvalidOrder {
                    order: axes.iter().map(|a| a.as_char()).collect(),
                    reason: format!("axis {} repeated", axis.as_char()),
                });
            }
        }
        Ok(Self(axes))
    }

    pub fn nhwc() -> Self {
        Self(vec![Axis::N, Axis::H, Axis::W, Axis::C])
    }

    pub fn nchw() -> Self {
        Self(vec![Axis::N, Axis::C, Axis::H, Axis::W])
    }

    pub fn axes(&self) -> &[Axis] {
        &self.0
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    pub fn position(&self, axis: Axis) -> Option<usize> {
        self.0.iter().position(|a| *a == axis)
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for axis in &self.0 {
            write!(f, "{}", axis.as_char())?;
        }
        Ok(())
    }
}

impl FromStr for Order {
    type Err = LowerError;

    fn from_str(s: &str) -> Result<Self> {
        let axes = s
            .chars()
            .map(|c| {
                Axis::from_char(c.to_ascii_uppercase()).ok_or_else(|| LowerError::InvalidOrder {
                    order: s.to_string(),
                    reason: format!("unknown axis '{}'", c),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Order::new(axes)
    }
}

impl TryFrom<String> for Order {
    type Error = LowerError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Order> for String {
    fn from(order: Order) -> String {
        order.to_string()
    }
}

// ─── Tensors ───────────────────────────────────────────────────────

/// Shape and axis order of one named tensor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TensorDescriptor {
    name: String,
    order: Order,
    shape: Vec<u32>,
}

impl TensorDescriptor {
    /// `shape[i]` is the extent of `order.axes()[i]`.
    pub fn new(name: impl Into<String>, order: Order, shape: Vec<u32>) -> Result<Self> {
        let name = name.into();
        if shape.len() != order.rank() {
            return Err(LowerError::InvalidTensor {
                tensor: name,
                reason: format!("shape has {} extents but order {} has {}", shape.len(), order, order.rank()),
            });
        }
        if let Some(i) = shape.iter().position(|&d| d == 0) {
            return Err(LowerError::InvalidTensor {
                tensor: name,
                reason: format!("extent of axis {} is zero", order.axes()[i].as_char()),
            });
        }
        Ok(Self { name, order, shape })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn order(&self) -> &Order {
        &self.order
    }

    pub fn shape(&self) -> &[u32] {
        &self.shape
    }

    pub fn shape_of(&self, axis: Axis) -> Result<u32> {
        self.order
            .position(axis)
            .map(|i| self.shape[i])
            .ok_or_else(|| LowerError::MissingAxis {
                tensor: self.name.clone(),
                axis: axis.as_char(),
            })
    }

    /// Element count.
    pub fn size(&self) -> u64 {
        self.shape.iter().map(|&d| d as u64).product()
    }
}

// ─── Operators ─────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OperatorId(pub u32);

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tag of every operator the engine knows how to represent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    Depth2Space,
    Space2Depth,
}

impl OperatorKind {
    pub const ALL: [OperatorKind; 2] = [OperatorKind::Depth2Space, OperatorKind::Space2Depth];

    /// Lowercase tag used in kernel names and metadata keys.
    pub fn tag(self) -> &'static str {
        match self {
            OperatorKind::Depth2Space => "depth2space",
            OperatorKind::Space2Depth => "space2depth",
        }
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for OperatorKind {
    type Err = LowerError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        OperatorKind::ALL
            .into_iter()
            .find(|k| k.tag() == lower)
            .ok_or_else(|| LowerError::UnknownOperatorType { tag: s.to_string() })
    }
}

/// Block rearrangement between channels and space with block size `r`.
///
/// Shared by depth-to-space (channels → r×r spatial blocks) and its
/// inverse space-to-depth.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockRearrange {
    pub id: OperatorId,
    pub x: TensorDescriptor,
    pub y: TensorDescriptor,
    pub r: u32,
}

impl BlockRearrange {
    pub fn new(id: OperatorId, x: TensorDescriptor, y: TensorDescriptor, r: u32) -> Result<Self> {
        if r == 0 {
            return Err(LowerError::InvalidParameter {
                name: "r".to_string(),
                reason: "block size must be positive".to_string(),
            });
        }
        Ok(Self { id, x, y, r })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operator {
    Depth2Space(BlockRearrange),
    Space2Depth(BlockRearrange),
}

impl Operator {
    pub fn kind(&self) -> OperatorKind {
        match self {
            Operator::Depth2Space(_) => OperatorKind::Depth2Space,
            Operator::Space2Depth(_) => OperatorKind::Space2Depth,
        }
    }

    pub fn id(&self) -> OperatorId {
        match self {
            Operator::Depth2Space(op) | Operator::Space2Depth(op) => op.id,
        }
    }

    /// Human-readable identity for diagnostics, e.g. `depth2space#3`.
    pub fn label(&self) -> String {
        format!("{}#{}", self.kind(), self.id())
    }

    pub fn inputs(&self) -> Vec<&TensorDescriptor> {
        match self {
            Operator::Depth2Space(op) | Operator::Space2Depth(op) => vec![&op.x],
        }
    }

    pub fn outputs(&self) -> Vec<&TensorDescriptor> {
        match self {
            Operator::Depth2Space(op) | Operator::Space2Depth(op) => vec![&op.y],
        }
    }
}

// ─── Graph ─────────────────────────────────────────────────────────

/// Operators in execution order.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    operators: Vec<Operator>,
}

impl Graph {
    pub fn new(operators: Vec<Operator>) -> Result<Self> {
        let mut seen = HashSet::new();
        for op in &operators {
            if !seen.insert(op.id()) {
                return Err(LowerError::DuplicateOperatorId { id: op.id().0 });
            }
        }
        Ok(Self { operators })
    }

    pub fn operators(&self) -> &[Operator] {
        &self.operators
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}
