//! Kernel name injector.
//!
//! Each operator instance gets its own entry point, `{kind}_{id}`, even
//! when two instances share kind and parameters: they bind different
//! buffers. `KernelNames` is the program-wide registry that turns an
//! accidental collision into an error instead of a silently shadowed
//! kernel.

use std::collections::HashSet;

use parking_lot::Mutex;

use crate::error::{LowerError, Result};
use crate::graph::Operator;
use crate::kir::template::{Directive, Template};

/// Names issued so far in one program. Shared across lowering threads.
#[derive(Debug, Default)]
pub struct KernelNames {
    taken: Mutex<HashSet<String>>,
}

impl KernelNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `name`; fails if it was already issued.
    pub fn claim(&self, name: &str) -> Result<()> {
        if self.taken.lock().insert(name.to_string()) {
            Ok(())
        } else {
            Err(LowerError::DuplicateKernelName {
                name: name.to_string(),
            })
        }
    }

    pub fn len(&self) -> usize {
        self.taken.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.taken.lock().is_empty()
    }
}

pub struct KernelNameInjector {
    name: String,
}

impl KernelNameInjector {
    /// Issue the name for `op` from `names`.
    pub fn new(op: &Operator, names: &KernelNames) -> Result<Self> {
        let name = format!("{}_{}", op.kind().tag(), op.id());
        names.claim(&name)?;
        Ok(Self { name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replace `%%FUNC_NAME%%`. Must run after buffer injection: any
    /// other placeholder left in `text` is an error.
    pub fn inject(&self, text: &str) -> Result<String> {
        Template::parse(text)?.render(|directive| match directive {
            Directive::FuncName => Ok(self.name.clone()),
            other => Err(LowerError::MalformedTemplate {
                reason: format!("placeholder {} left after buffer injection", other),
            }),
        })
    }
}
