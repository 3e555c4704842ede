//! Program descriptor: the kernels of one graph, in execution order.

use serde::Serialize;

use crate::kir::kernel::{hex, Kernel};

#[derive(Clone, Debug, Serialize)]
pub struct ProgramDescriptor {
    kernels: Vec<Kernel>,
    #[serde(serialize_with = "serialize_hash")]
    hash: [u8; 32],
}

impl ProgramDescriptor {
    pub fn new(kernels: Vec<Kernel>) -> Self {
        let mut hasher = blake3::Hasher::new();
        for kernel in &kernels {
            hasher.update(kernel.name().as_bytes());
            hasher.update(kernel.fingerprint());
        }
        Self {
            kernels,
            hash: *hasher.finalize().as_bytes(),
        }
    }

    pub fn kernels(&self) -> &[Kernel] {
        &self.kernels
    }

    pub fn kernel(&self, name: &str) -> Option<&Kernel> {
        self.kernels.iter().find(|k| k.name() == name)
    }

    /// BLAKE3 over kernel names and fingerprints.
    pub fn hash(&self) -> &[u8; 32] {
        &self.hash
    }

    /// Deferred values left for the loader, across all kernels.
    pub fn unresolved_count(&self) -> usize {
        self.kernels.iter().map(|k| k.unresolved_values().len()).sum()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// One line per kernel, then the program hash.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for kernel in &self.kernels {
            out.push_str(&format!(
                "{:<24} grid {} threadgroup {} meta {:>3} cells  unresolved {}  {}\n",
                kernel.name(),
                kernel.grid_size(),
                kernel.threadgroup_size(),
                kernel.meta_buffer().map_or(0, |m| m.len()),
                kernel.unresolved_values().len(),
                &kernel.fingerprint_hex()[..16],
            ));
        }
        out.push_str(&format!(
            "{} kernel(s), program {}\n",
            self.kernels.len(),
            &hex(&self.hash)[..16]
        ));
        out
    }
}

fn serialize_hash<S: serde::Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex(bytes))
}
