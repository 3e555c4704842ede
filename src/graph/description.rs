//! JSON graph description: the file-level handoff from the upstream
//! graph compiler.
//!
//! ```json
//! {
//!   "tensors":   [{"name": "x", "order": "NHWC", "shape": [1, 2, 2, 4]}],
//!   "operators": [{"id": 0, "type": "Depth2Space",
//!                  "inputs": {"x": "x"}, "outputs": {"y": "y"},
//!                  "parameters": {"r": 2}}],
//!   "layout":    {"x": {"segment": "static", "offset": 0, "size": 16}}
//! }
//! ```
//!
//! Operators arrive with string-keyed inputs, outputs and parameters;
//! `into_parts` checks every key a kind needs and produces typed
//! `Operator`s.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{BlockRearrange, Graph, Operator, OperatorId, OperatorKind, Order, TensorDescriptor};
use crate::error::{LowerError, Result};
use crate::layout::{Allocation, MemoryLayout};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GraphDescription {
    pub tensors: Vec<TensorEntry>,
    pub operators: Vec<OperatorEntry>,
    #[serde(default)]
    pub layout: BTreeMap<String, Allocation>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TensorEntry {
    pub name: String,
    pub order: Order,
    pub shape: Vec<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OperatorEntry {
    pub id: u32,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub inputs: BTreeMap<String, String>,
    #[serde(default)]
    pub outputs: BTreeMap<String, String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, i64>,
}

impl GraphDescription {
    pub fn from_json(text: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Validate and split into the operator graph and its memory layout.
    pub fn into_parts(self) -> Result<(Graph, MemoryLayout)> {
        let mut tensors = BTreeMap::new();
        for entry in self.tensors {
            let desc = TensorDescriptor::new(entry.name.clone(), entry.order, entry.shape)?;
            tensors.insert(entry.name, desc);
        }

        let operators = self
            .operators
            .iter()
            .map(|entry| entry.to_operator(&tensors))
            .collect::<Result<Vec<_>>>()?;
        let graph = Graph::new(operators)?;

        let mut layout = MemoryLayout::new();
        for (tensor, allocation) in self.layout {
            layout.insert(tensor, allocation);
        }
        Ok((graph, layout))
    }
}

impl OperatorEntry {
    fn label(&self) -> String {
        format!("{}#{}", self.kind.to_ascii_lowercase(), self.id)
    }

    fn to_operator(&self, tensors: &BTreeMap<String, TensorDescriptor>) -> Result<Operator> {
        let kind: OperatorKind = self.kind.parse()?;
        let id = OperatorId(self.id);
        match kind {
            OperatorKind::Depth2Space => Ok(Operator::Depth2Space(self.block_rearrange(id, tensors)?)),
            OperatorKind::Space2Depth => Ok(Operator::Space2Depth(self.block_rearrange(id, tensors)?)),
        }
    }

    fn block_rearrange(
        &self,
        id: OperatorId,
        tensors: &BTreeMap<String, TensorDescriptor>,
    ) -> Result<BlockRearrange> {
        let x = self.tensor(&self.inputs, "x", tensors, true)?;
        let y = self.tensor(&self.outputs, "y", tensors, false)?;
        let r = self.parameter("r")?;
        let r = u32::try_from(r).map_err(|_| LowerError::InvalidParameter {
            name: "r".to_string(),
            reason: format!("{} does not fit a block size", r),
        })?;
        BlockRearrange::new(id, x, y, r)
    }

    fn tensor(
        &self,
        map: &BTreeMap<String, String>,
        name: &str,
        tensors: &BTreeMap<String, TensorDescriptor>,
        input: bool,
    ) -> Result<TensorDescriptor> {
        let tensor_name = map.get(name).ok_or_else(|| {
            if input {
                LowerError::MissingInput {
                    op: self.label(),
                    name: name.to_string(),
                }
            } else {
                LowerError::MissingOutput {
                    op: self.label(),
                    name: name.to_string(),
                }
            }
        })?;
        tensors
            .get(tensor_name)
            .cloned()
            .ok_or_else(|| LowerError::UnknownTensor {
                op: self.label(),
                tensor: tensor_name.clone(),
            })
    }

    fn parameter(&self, name: &str) -> Result<i64> {
        self.parameters
            .get(name)
            .copied()
            .ok_or_else(|| LowerError::MissingParameter {
                op: self.label(),
                name: name.to_string(),
            })
    }
}
