//! Target routing error types

use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum TargetError {
    #[error("unknown target {target}, available: {}", available.join(", "))]
    UnknownTarget {
        target: String,
        available: Vec<String>,
    },

    #[error("target mux for {distro} has no default target")]
    NoDefaultTarget { distro: String },

    #[error("duplicate target registration: {target}")]
    DuplicateTarget { target: String },
}
