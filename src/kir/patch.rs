//! Load-time patching of deferred values.
//!
//! A `Kernel` leaves deferred metadata cells zeroed and may carry preset
//! launch dimensions. Before dispatch the loader binds every placeholder
//! label; `Kernel::patch` produces the concrete metadata and launch sizes
//! without touching the kernel itself.

use super::kernel::{Dim, GpuSize, Kernel, MetaBuffer, MetaCell};
use crate::error::{LowerError, Result};
use crate::placeholder::{Placeholder, PresetBindings};

/// A kernel's run-time values after every placeholder is bound.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatchedKernel {
    pub meta: MetaBuffer,
    pub grid_size: [u32; 3],
    pub threadgroup_size: [u32; 3],
}

impl Kernel {
    pub fn patch(&self, bindings: &PresetBindings) -> Result<PatchedKernel> {
        let mut cells = self
            .meta_buffer()
            .map(|m| m.cells().to_vec())
            .unwrap_or_default();

        for value in self.unresolved_values() {
            let bound = lookup(bindings, &value.placeholder)?;
            let v = i32::try_from(bound).map_err(|_| LowerError::InvalidParameter {
                name: value.key.clone(),
                reason: format!(
                    "{} bound to {} which exceeds the 32-bit metadata cell",
                    value.placeholder, bound
                ),
            })?;
            let cell = cells
                .get_mut(value.cell)
                .ok_or_else(|| LowerError::InvalidParameter {
                    name: value.key.clone(),
                    reason: format!("cell {} is outside the metadata buffer", value.cell),
                })?;
            *cell = MetaCell::int(v);
        }

        Ok(PatchedKernel {
            meta: MetaBuffer::new(cells),
            grid_size: resolve_size(self.grid_size(), bindings)?,
            threadgroup_size: resolve_size(self.threadgroup_size(), bindings)?,
        })
    }
}

fn lookup(bindings: &PresetBindings, placeholder: &Placeholder) -> Result<i64> {
    bindings
        .get(placeholder)
        .ok_or_else(|| LowerError::UnboundPlaceholder {
            label: placeholder.label.clone(),
        })
}

fn resolve_size(size: &GpuSize, bindings: &PresetBindings) -> Result<[u32; 3]> {
    let mut out = [0u32; 3];
    for (slot, dim) in out.iter_mut().zip(size.dims()) {
        *slot = match dim {
            Dim::Fixed(v) => *v,
            Dim::Preset(p) => {
                let bound = lookup(bindings, p)?;
                u32::try_from(bound)
                    .ok()
                    .filter(|v| *v > 0)
                    .ok_or_else(|| LowerError::InvalidParameter {
                        name: p.label.clone(),
                        reason: format!("launch dimension must be positive, got {}", bound),
                    })?
            }
        };
    }
    Ok(out)
}
