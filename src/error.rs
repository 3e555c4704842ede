//! Error taxonomy for the lowering pipeline.
//!
//! Every variant is a contract violation: the graph, layout or template
//! handed to the lowering engine is inconsistent. None of them are
//! retried. Load-time values are not errors (they are carried in
//! `Kernel::unresolved_values`), and unused metadata keys are only
//! warnings, so neither appears here.

use thiserror::Error;

use crate::diagnostic::Diagnostic;
use crate::span::Span;

/// Result type for lowering operations.
pub type Result<T, E = LowerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum LowerError {
    /// No handler is registered for the operator's kind.
    #[error("no kernel handler registered for operator {op}")]
    MissingHandler { op: String },

    /// The allocator produced no entry for a tensor.
    #[error("tensor '{tensor}' has no memory layout entry")]
    MissingLayout { tensor: String },

    /// A tensor's axis order differs from the order the kernel assumes.
    #[error("operator {op}: tensor '{tensor}' has order {found}, expected {expected}")]
    LayoutMismatch {
        op: String,
        tensor: String,
        expected: String,
        found: String,
    },

    #[error("tensor '{tensor}' has no axis {axis}")]
    MissingAxis { tensor: String, axis: char },

    #[error("invalid axis order '{order}': {reason}")]
    InvalidOrder { order: String, reason: String },

    #[error("invalid tensor '{tensor}': {reason}")]
    InvalidTensor { tensor: String, reason: String },

    /// A metadata key was registered twice on one buffer injector.
    #[error("metadata key '{key}' is already registered")]
    DuplicateKey { key: String },

    /// The template loads a key that was never registered.
    #[error("template references unregistered key '{key}'")]
    UnknownPlaceholder { key: String },

    #[error("malformed kernel template: {reason}")]
    MalformedTemplate { reason: String },

    #[error("kernel name '{name}' is already taken in this program")]
    DuplicateKernelName { name: String },

    #[error("operator id {id} appears more than once in the graph")]
    DuplicateOperatorId { id: u32 },

    #[error("unknown operator type '{tag}'")]
    UnknownOperatorType { tag: String },

    #[error("operator {op} references unknown tensor '{tensor}'")]
    UnknownTensor { op: String, tensor: String },

    #[error("operator {op} has no input '{name}'")]
    MissingInput { op: String, name: String },

    #[error("operator {op} has no output '{name}'")]
    MissingOutput { op: String, name: String },

    #[error("operator {op} has no parameter '{name}'")]
    MissingParameter { op: String, name: String },

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// A deferred value had no binding when the kernel was patched.
    #[error("no binding for load-time placeholder '{label}'")]
    UnboundPlaceholder { label: String },

    /// A handler failed; carries the operator identity.
    #[error("failed to lower {op}: {source}")]
    Lowering {
        op: String,
        #[source]
        source: Box<LowerError>,
    },
}

impl LowerError {
    /// Innermost error, skipping `Lowering` context wrappers.
    pub fn root(&self) -> &LowerError {
        match self {
            LowerError::Lowering { source, .. } => source.root(),
            other => other,
        }
    }

    /// Convert to a diagnostic for the CLI.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = Diagnostic::error(self.root().to_string(), Span::dummy());
        if let LowerError::Lowering { op, .. } = self {
            diag = diag.with_note(format!("while lowering operator {}", op));
        }
        match self.root() {
            LowerError::MissingHandler { .. } => diag.with_help(
                "register a handler for this operator kind before lowering".to_string(),
            ),
            LowerError::MissingLayout { .. } => diag.with_help(
                "every tensor used by an operator needs an allocation in the layout".to_string(),
            ),
            LowerError::LayoutMismatch { .. } => diag.with_help(
                "insert a transpose upstream so both tensors use the expected order".to_string(),
            ),
            _ => diag,
        }
    }
}
