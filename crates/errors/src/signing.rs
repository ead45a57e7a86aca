//! Signing boundary error types

use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum SigningError {
    #[error("signing failed for {target_key}: {message}")]
    SignFailed { target_key: String, message: String },

    #[error("spec requests signing for {target_key} but no signer is configured")]
    NoSigner { target_key: String },
}
