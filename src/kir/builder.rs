//! Structured builder for MSL kernel templates.
//!
//! Handlers describe a kernel as declarations plus one grid-stride loop;
//! the builder renders that description into template text carrying the
//! `%%…%%` placeholders the injectors resolve. Nothing is formatted by
//! hand in the handlers.

use std::fmt::Write;

use super::expr::{Expr, IndexMap};
use super::kernel::BufferSlot;

enum Decl {
    /// Read-only float pointer into a data buffer.
    Input { name: String, key: String },
    /// Writable float pointer into a data buffer.
    Output { name: String, key: String },
    /// Integer scalar from the metadata buffer.
    Int { name: String, key: String },
}

struct GridStride {
    limit: Expr,
    map: IndexMap,
    output: String,
    input: String,
}

#[derive(Default)]
pub struct MetalKernelBuilder {
    decls: Vec<Decl>,
    body: Option<GridStride>,
}

impl MetalKernelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, name: &str, key: &str) -> Self {
        self.decls.push(Decl::Input {
            name: name.to_string(),
            key: key.to_string(),
        });
        self
    }

    pub fn output(mut self, name: &str, key: &str) -> Self {
        self.decls.push(Decl::Output {
            name: name.to_string(),
            key: key.to_string(),
        });
        self
    }

    pub fn int(mut self, name: &str, key: &str) -> Self {
        self.decls.push(Decl::Int {
            name: name.to_string(),
            key: key.to_string(),
        });
        self
    }

    /// `output[i] = input[map(i)]` for every `i < limit`, each thread
    /// striding by the total thread count.
    pub fn grid_stride(mut self, limit: Expr, map: IndexMap, output: &str, input: &str) -> Self {
        self.body = Some(GridStride {
            limit,
            map,
            output: output.to_string(),
            input: input.to_string(),
        });
        self
    }

    /// Render template text.
    pub fn build(&self) -> String {
        let mut out = String::new();
        out.push_str("kernel void %%FUNC_NAME%%(\n");
        for slot in BufferSlot::ALL {
            let ty = match slot {
                BufferSlot::Meta => "const device int",
                _ => "device float",
            };
            let _ = writeln!(
                out,
                "    {} *%%{}%% [[buffer({})]],",
                ty,
                slot.placeholder(),
                slot.index()
            );
        }
        out.push_str("    uint index [[thread_position_in_grid]],\n");
        out.push_str("    uint num_threads [[threads_per_grid]])\n");
        out.push_str("{\n");

        for decl in &self.decls {
            let _ = match decl {
                Decl::Input { name, key } => writeln!(
                    out,
                    "    const device float *{} = %%LOAD_BUFFER({})%%;",
                    name, key
                ),
                Decl::Output { name, key } => {
                    writeln!(out, "    device float *{} = %%LOAD_BUFFER({})%%;", name, key)
                }
                Decl::Int { name, key } => {
                    writeln!(out, "    const int {} = %%LOAD_BUFFER({})%%;", name, key)
                }
            };
        }

        if let Some(body) = &self.body {
            let var = &body.map.index_var;
            out.push('\n');
            let _ = writeln!(
                out,
                "    for (int {v} = index; {v} < {}; {v} += num_threads) {{",
                body.limit.render(),
                v = var
            );
            for (name, expr) in &body.map.bindings {
                let _ = writeln!(out, "        const int {} = {};", name, expr.render());
            }
            let _ = writeln!(
                out,
                "        {}[{}] = {}[{}];",
                body.output,
                var,
                body.input,
                body.map.source.render()
            );
            out.push_str("    }\n");
        }

        out.push_str("}\n");
        out
    }
}
