//! Metal handlers.
//!
//! Both block-rearrangement kernels take NHWC tensors and share one
//! handler body; only the index map differs. Scalar naming is fixed: the
//! `1` extents belong to the input `x`, the `2` extents to the output `y`.

mod depth2space;
mod space2depth;

pub use depth2space::index_map as depth2space_index_map;
pub use space2depth::index_map as space2depth_index_map;

use std::sync::OnceLock;

use super::LoweringContext;
use crate::error::{LowerError, Result};
use crate::graph::{Axis, BlockRearrange, Operator, OperatorKind, Order, TensorDescriptor};
use crate::kir::builder::MetalKernelBuilder;
use crate::kir::expr::{var, IndexMap};
use crate::kir::inject::{BufferInjector, InjectValue, KernelNameInjector};
use crate::kir::kernel::Kernel;

/// Scalars declared by every block-rearrangement kernel, in load order.
pub const SCALARS: [&str; 8] = ["r", "N", "C1", "C2", "H1", "H2", "W1", "W2"];

pub fn depth2space(op: &Operator, ctx: &LoweringContext<'_>) -> Result<Vec<Kernel>> {
    static TEMPLATE: OnceLock<String> = OnceLock::new();
    match op {
        Operator::Depth2Space(params) => {
            let text =
                TEMPLATE.get_or_init(|| template(OperatorKind::Depth2Space, depth2space::index_map()));
            lower_block_rearrange(op, params, text, ctx)
        }
        other => Err(wrong_kind(other, OperatorKind::Depth2Space)),
    }
}

pub fn space2depth(op: &Operator, ctx: &LoweringContext<'_>) -> Result<Vec<Kernel>> {
    static TEMPLATE: OnceLock<String> = OnceLock::new();
    match op {
        Operator::Space2Depth(params) => {
            let text =
                TEMPLATE.get_or_init(|| template(OperatorKind::Space2Depth, space2depth::index_map()));
            lower_block_rearrange(op, params, text, ctx)
        }
        other => Err(wrong_kind(other, OperatorKind::Space2Depth)),
    }
}

/// Template text for a block-rearrangement kernel of `kind`.
pub fn template(kind: OperatorKind, map: IndexMap) -> String {
    let key = |name: &str| format!("{}_{}", kind.tag(), name);
    let mut builder = MetalKernelBuilder::new()
        .input("x", &key("x"))
        .output("y", &key("y"));
    for scalar in SCALARS {
        builder = builder.int(scalar, &key(scalar));
    }
    let limit = var("N") * var("H2") * var("W2") * var("C2");
    builder.grid_stride(limit, map, "y", "x").build()
}

fn lower_block_rearrange(
    op: &Operator,
    params: &BlockRearrange,
    template: &str,
    ctx: &LoweringContext<'_>,
) -> Result<Vec<Kernel>> {
    let tag = op.kind().tag();
    let x = &params.x;
    let y = &params.y;
    expect_nhwc(op, x)?;
    expect_nhwc(op, y)?;
    expect_indexable(x)?;
    expect_indexable(y)?;

    let key = |name: &str| format!("{}_{}", tag, name);
    let mut buffers = BufferInjector::new();
    buffers.register([
        (key("x"), InjectValue::from(ctx.layout.lookup(x)?)),
        (key("y"), InjectValue::from(ctx.layout.lookup(y)?)),
        (key("r"), InjectValue::extent("r", params.r)?),
        (key("N"), InjectValue::extent("N", x.shape_of(Axis::N)?)?),
        (key("C1"), InjectValue::extent("C1", x.shape_of(Axis::C)?)?),
        (key("C2"), InjectValue::extent("C2", y.shape_of(Axis::C)?)?),
        (key("H1"), InjectValue::extent("H1", x.shape_of(Axis::H)?)?),
        (key("H2"), InjectValue::extent("H2", y.shape_of(Axis::H)?)?),
        (key("W1"), InjectValue::extent("W1", x.shape_of(Axis::W)?)?),
        (key("W2"), InjectValue::extent("W2", y.shape_of(Axis::W)?)?),
    ])?;

    let names = KernelNameInjector::new(op, ctx.names)?;
    let source = buffers.inject(template)?;
    let source = names.inject(&source)?;

    let kernel = Kernel::new(
        names.name().to_string(),
        source,
        ctx.launch.grid.clone(),
        ctx.launch.threadgroup.clone(),
        buffers.buffers(),
        buffers.unresolved_values().to_vec(),
    );
    tracing::debug!(
        kernel = kernel.name(),
        meta_cells = kernel.meta_buffer().map_or(0, |m| m.len()),
        unresolved = kernel.unresolved_values().len(),
        "generated kernel"
    );
    Ok(vec![kernel])
}

fn expect_nhwc(op: &Operator, tensor: &TensorDescriptor) -> Result<()> {
    let expected = Order::nhwc();
    if *tensor.order() == expected {
        Ok(())
    } else {
        Err(LowerError::LayoutMismatch {
            op: op.label(),
            tensor: tensor.name().to_string(),
            expected: expected.to_string(),
            found: tensor.order().to_string(),
        })
    }
}

/// Kernel indices are 32-bit `int`; the flat element count must fit.
fn expect_indexable(tensor: &TensorDescriptor) -> Result<()> {
    if tensor.size() > i32::MAX as u64 {
        return Err(LowerError::InvalidTensor {
            tensor: tensor.name().to_string(),
            reason: format!(
                "{} elements overflow 32-bit kernel indices (max {})",
                tensor.size(),
                i32::MAX
            ),
        });
    }
    Ok(())
}

fn wrong_kind(op: &Operator, expected: OperatorKind) -> LowerError {
    LowerError::InvalidParameter {
        name: "type".to_string(),
        reason: format!("{} handler called with {}", expected, op.label()),
    }
}
