//! KIR — Kernel IR for data-parallel GPU targets.
//!
//! KIR does not carry its own instruction set. Each operator kind is
//! lowered straight to kernel source through a template, and every
//! generated kernel shares one calling convention: a static buffer, a
//! dynamic buffer, and a metadata buffer of 32-bit cells.
//!
//! Pipeline:
//! ```text
//! Graph + MemoryLayout ─→ HandlerRegistry ─→ handler(op)
//!     MetalKernelBuilder ─→ template text
//!     BufferInjector     ─→ loads + MetaBuffer
//!     KernelNameInjector ─→ entry point
//!                        ─→ Kernel
//! ```
//!
//! Each GPU thread walks the output with a grid stride:
//! - `gid` starts at the thread position and advances by the thread count
//! - `y[gid] = x[map(gid)]`, with `map` an `IndexMap`
//! - no synchronization; every output element has exactly one writer
//!
//! Supported targets:
//! - Metal (MSL) — Apple Silicon GPUs, also served as WebGPU

pub mod builder;
pub mod expr;
pub mod inject;
pub mod kernel;
pub mod lower;
pub mod patch;
pub mod reference;
pub mod template;
