//! Error types for the edgequake-latex2pdf library.
//!
//! Two distinct error types reflect two distinct failure scopes:
//!
//! * [`ConversionError`] — **Item-level**: one input item could not be turned
//!   into a PDF (bad parameter, missing binary payload, rejected by the
//!   pre-flight scan, compiler error). Under continue-on-failure its message
//!   becomes that item's `{success: false, error}` result.
//!
//! * [`Latex2PdfError`] — **Batch-level**: the whole run stops. Either an item
//!   failed while continue-on-failure was off (annotated with the item's
//!   position), or the run could not start at all.
//!
//! Workspace cleanup failures have no variant on purpose: they are swallowed
//! where they happen and never reach a caller.

use thiserror::Error;

/// The three error families an item can fail with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Raised before any external invocation.
    Configuration,
    /// The pre-flight scan rejected the source.
    Validation,
    /// The external compiler failed, timed out, or produced nothing.
    Compilation,
}

/// Failure of a single input item.
#[derive(Debug, Error)]
pub enum ConversionError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// A parameter is present but unusable (empty name, wrong type, …).
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// The resource/operation pair does not select the conversion operation.
    #[error("The operation '{operation}' is not supported for resource '{resource}'")]
    UnsupportedOperation { resource: String, operation: String },

    /// The item has no binary payload under the referenced name.
    #[error("No binary data property '{property}' exists on item!")]
    MissingBinaryData { property: String },

    /// The binary payload is not valid base64.
    #[error("Binary property '{property}' could not be decoded: {reason}")]
    InvalidBinaryData { property: String, reason: String },

    // ── Validation errors ─────────────────────────────────────────────────
    /// The pre-flight scan rejected the source; one line per warning.
    #[error("LaTeX validation failed:\n{}", .warnings.join("\n"))]
    ValidationFailed { warnings: Vec<String> },

    // ── Compilation errors ────────────────────────────────────────────────
    /// The compiler signalled an error. `message` is already enriched.
    #[error("{message}")]
    CompilationFailed { message: String },

    /// The compiler finished cleanly but emitted zero bytes.
    #[error("LaTeX compilation produced no output")]
    EmptyOutput,

    /// The configured compile timeout elapsed.
    #[error("LaTeX compilation timed out after {secs}s")]
    CompileTimeout { secs: u64 },

    /// The per-item scratch directory could not be created.
    #[error("Failed to create temporary workspace: {0}")]
    Workspace(#[source] std::io::Error),
}

impl ConversionError {
    /// Which error family this belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConversionError::InvalidParameter { .. }
            | ConversionError::UnsupportedOperation { .. }
            | ConversionError::MissingBinaryData { .. }
            | ConversionError::InvalidBinaryData { .. } => ErrorKind::Configuration,
            ConversionError::ValidationFailed { .. } => ErrorKind::Validation,
            ConversionError::CompilationFailed { .. }
            | ConversionError::EmptyOutput
            | ConversionError::CompileTimeout { .. }
            | ConversionError::Workspace(_) => ErrorKind::Compilation,
        }
    }

    pub(crate) fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        ConversionError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Fatal errors that stop a whole batch.
#[derive(Debug, Error)]
pub enum Latex2PdfError {
    /// An item failed and continue-on-failure is disabled.
    #[error("Item {index}: {source}")]
    ItemFailed {
        index: usize,
        #[source]
        source: ConversionError,
    },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Could not read a `.tex` input file.
    #[error("Failed to read input file '{path}': {source}")]
    InputReadFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Latex2PdfError {
    /// Position of the failing item, when the error is item-scoped.
    pub fn item_index(&self) -> Option<usize> {
        match self {
            Latex2PdfError::ItemFailed { index, .. } => Some(*index),
            _ => None,
        }
    }
}
