#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Error types for the pakket build-graph compiler
//!
//! This crate provides fine-grained error types organized by domain.
//! Every compiler stage fails fast and wraps the underlying cause with
//! enough context (stage, target key, source or step identifier) to
//! localize the fault; callers match on variants, not message text.

use thiserror::Error;

pub mod build;
pub mod image;
pub mod install;
pub mod signing;
pub mod source;
pub mod spec;
pub mod target;

// Re-export all error types at the root
pub use build::BuildError;
pub use image::ImageError;
pub use install::InstallError;
pub use signing::SigningError;
pub use source::SourceError;
pub use spec::SpecError;
pub use target::TargetError;

/// Generic error type for cross-crate boundaries
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Error {
    #[error("spec error: {0}")]
    Spec(#[from] SpecError),

    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error("install error: {0}")]
    Install(#[from] InstallError),

    #[error("build error: {0}")]
    Build(#[from] BuildError),

    #[error("image error: {0}")]
    Image(#[from] ImageError),

    #[error("signing error: {0}")]
    Signing(#[from] SigningError),

    #[error("target error: {0}")]
    Target(#[from] TargetError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an internal error with a message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias for pakket operations
pub type Result<T> = std::result::Result<T, Error>;

