//! KernelLowering: turns a scheduled operator graph into GPU kernels.
//!
//! Each operator kind has a handler that knows its kernel template. The
//! `HandlerRegistry` maps kinds to handlers and is built once at startup;
//! `lower_graph` walks the graph in execution order and dispatches each
//! operator. Handlers only read the operator and the shared layout, so
//! operators may be lowered in parallel; the one piece of shared mutable
//! state is the program's `KernelNames`.

pub mod metal;

use std::collections::HashMap;

use rayon::prelude::*;

use super::inject::KernelNames;
use super::kernel::Kernel;
use crate::config::{LaunchConfig, LoweringConfig};
use crate::error::{LowerError, Result};
use crate::graph::{Graph, Operator, OperatorKind};
use crate::layout::MemoryLayout;

/// Read-only state shared by every handler call in one program.
pub struct LoweringContext<'a> {
    pub layout: &'a MemoryLayout,
    pub names: &'a KernelNames,
    pub launch: &'a LaunchConfig,
}

/// Builds the kernels for one operator.
pub type Handler = fn(&Operator, &LoweringContext<'_>) -> Result<Vec<Kernel>>;

#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<OperatorKind, Handler>,
}

impl HandlerRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in Metal handlers.
    pub fn metal() -> Self {
        let mut registry = Self::new();
        registry.register(OperatorKind::Depth2Space, metal::depth2space);
        registry.register(OperatorKind::Space2Depth, metal::space2depth);
        registry
    }

    /// Associate `handler` with `kind`. A second registration for the same
    /// kind replaces the first; the replaced handler is returned.
    pub fn register(&mut self, kind: OperatorKind, handler: Handler) -> Option<Handler> {
        let previous = self.handlers.insert(kind, handler);
        if previous.is_some() {
            tracing::debug!(kind = %kind, "kernel handler replaced");
        }
        previous
    }

    pub fn get(&self, kind: OperatorKind) -> Option<Handler> {
        self.handlers.get(&kind).copied()
    }

    pub fn contains(&self, kind: OperatorKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Lower one operator with its registered handler.
    pub fn dispatch(&self, op: &Operator, ctx: &LoweringContext<'_>) -> Result<Vec<Kernel>> {
        let handler = self.get(op.kind()).ok_or_else(|| LowerError::MissingHandler {
            op: op.label(),
        })?;
        let kernels = handler(op, ctx).map_err(|e| LowerError::Lowering {
            op: op.label(),
            source: Box::new(e),
        })?;
        tracing::debug!(op = %op.label(), kernels = kernels.len(), "lowered operator");
        Ok(kernels)
    }
}

/// Lower every operator of `graph`, returning kernels in execution order.
///
/// With `config.parallel` operators are lowered on the rayon pool; the
/// output order is the same either way. The first contract violation
/// aborts lowering and no kernels are returned.
pub fn lower_graph(
    graph: &Graph,
    layout: &MemoryLayout,
    registry: &HandlerRegistry,
    config: &LoweringConfig,
) -> Result<Vec<Kernel>> {
    let names = KernelNames::new();
    let ctx = LoweringContext {
        layout,
        names: &names,
        launch: &config.launch,
    };

    let per_op: Vec<Vec<Kernel>> = if config.parallel {
        graph
            .operators()
            .par_iter()
            .map(|op| registry.dispatch(op, &ctx))
            .collect::<Result<_>>()?
    } else {
        graph
            .operators()
            .iter()
            .map(|op| registry.dispatch(op, &ctx))
            .collect::<Result<_>>()?
    };

    let kernels: Vec<Kernel> = per_op.into_iter().flatten().collect();
    tracing::debug!(
        operators = graph.len(),
        kernels = kernels.len(),
        "lowered graph"
    );
    Ok(kernels)
}

/// A backend that lowers whole graphs.
pub trait KernelLowering {
    /// The target name (e.g. "metal").
    fn target_name(&self) -> &str;

    /// Lower `graph` against `layout` into kernels, in execution order.
    fn lower(&self, graph: &Graph, layout: &MemoryLayout) -> Result<Vec<Kernel>>;
}

/// Metal Shading Language backend.
pub struct MetalLowering {
    registry: HandlerRegistry,
    config: LoweringConfig,
}

impl MetalLowering {
    pub fn new(config: LoweringConfig) -> Self {
        Self {
            registry: HandlerRegistry::metal(),
            config,
        }
    }

    pub fn with_registry(registry: HandlerRegistry, config: LoweringConfig) -> Self {
        Self { registry, config }
    }
}

impl KernelLowering for MetalLowering {
    fn target_name(&self) -> &str {
        "metal"
    }

    fn lower(&self, graph: &Graph, layout: &MemoryLayout) -> Result<Vec<Kernel>> {
        lower_graph(graph, layout, &self.registry, &self.config)
    }
}

/// Create a kernel-lowering backend for the given target name.
pub fn create_kernel_lowering(target: &str, config: LoweringConfig) -> Option<Box<dyn KernelLowering>> {
    match target {
        "metal" | "msl" | "webgpu" => Some(Box::new(MetalLowering::new(config))),
        _ => None,
    }
}
