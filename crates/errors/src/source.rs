//! Source materialization and patch error types

use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum SourceError {
    #[error("unknown source: {name}")]
    UnknownSource { name: String },

    #[error("unsupported source declaration for {name}: {reason}")]
    Unsupported { name: String, reason: String },

    #[error("failed to materialize source {name}: {message}")]
    MaterializeFailed { name: String, message: String },

    #[error("failed to plan patch {path} for source {name}: {message}")]
    PatchFailed {
        name: String,
        path: String,
        message: String,
    },

    #[error("generated source {name} cannot be patched")]
    GeneratedNotPatchable { name: String },
}
