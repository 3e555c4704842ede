//! Load-time values.
//!
//! A `Placeholder` stands for an integer the code generator cannot know:
//! a device limit, or a dynamic buffer offset chosen by the loader. The
//! generator records where each placeholder lands; the loader binds a
//! value for every label before the kernel runs.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Label of the device's maximum threads per threadgroup preset.
pub const MAX_THREADS_PER_THREADGROUP: &str = "MAX_THREADS_PER_THREADGROUP";

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Placeholder {
    pub label: String,
}

impl Placeholder {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    /// Preset resolved by the loader from the device limits.
    pub fn max_threads_per_threadgroup() -> Self {
        Self::new(MAX_THREADS_PER_THREADGROUP)
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.label)
    }
}

/// Concrete values for placeholders, keyed by label.
#[derive(Clone, Debug, Default)]
pub struct PresetBindings {
    values: BTreeMap<String, i64>,
}

impl PresetBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(mut self, label: impl Into<String>, value: i64) -> Self {
        self.values.insert(label.into(), value);
        self
    }

    pub fn get(&self, placeholder: &Placeholder) -> Option<i64> {
        self.values.get(&placeholder.label).copied()
    }
}
