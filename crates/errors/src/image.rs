//! Image config resolution error types

use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum ImageError {
    #[error("failed to resolve image config for {reference}: {message}")]
    ResolutionFailed { reference: String, message: String },

    #[error("failed to decode image config for {reference}: {message}")]
    ConfigDecode { reference: String, message: String },
}
