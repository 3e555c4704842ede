pub mod config;
pub mod diagnostic;
pub mod error;
pub mod graph;
pub mod kir;
pub mod layout;
pub mod placeholder;
pub mod program;
pub mod span;

// Re-exports — the lowering entry points used by the CLI and tests
pub use config::{LaunchConfig, LoweringConfig};
pub use error::{LowerError, Result};
pub use graph::description::GraphDescription;
pub use graph::{Graph, Operator, OperatorKind};
pub use kir::kernel::Kernel;
pub use kir::lower::{create_kernel_lowering, lower_graph, HandlerRegistry, KernelLowering};
pub use layout::MemoryLayout;
pub use program::ProgramDescriptor;

/// Lower a graph description with the built-in backend for `config.target`.
pub fn lower_description(
    description: GraphDescription,
    config: &LoweringConfig,
) -> Result<ProgramDescriptor> {
    let lowering = create_kernel_lowering(&config.target, config.clone()).ok_or_else(|| {
        LowerError::InvalidParameter {
            name: "target".to_string(),
            reason: format!("no backend for target '{}'", config.target),
        }
    })?;
    let (graph, layout) = description.into_parts()?;
    let kernels = lowering.lower(&graph, &layout)?;
    Ok(ProgramDescriptor::new(kernels))
}
