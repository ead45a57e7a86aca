//! Package spec validation error types

use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum SpecError {
    #[error("spec has no package name")]
    MissingName,

    #[error("duplicate source name: {name}")]
    DuplicateSource { name: String },

    #[error("source name {name} is reserved for generated sources")]
    ReservedSourceName { name: String },

    #[error("patch for unknown source: {name}")]
    UnknownPatchSource { name: String },

    #[error("patch {path} references generated source {name}")]
    PatchOnGeneratedSource { name: String, path: String },

    #[error("gomod declaration references unknown source: {name}")]
    UnknownGomodSource { name: String },

    #[error("invalid systemd unit name {name}: {reason}")]
    InvalidUnitName { name: String, reason: String },

    #[error("systemd drop-in {name} has no owning unit")]
    DropinMissingUnit { name: String },

    #[error("failed to expand build args in {context}: {reason}")]
    ArgExpansion { context: String, reason: String },

    #[error("undeclared build arg: {name}")]
    UndeclaredArg { name: String },

    #[error("build arg {name} has no value and no default")]
    UnresolvedArg { name: String },
}
