#![deny(clippy::pedantic, unsafe_code)]

//! Signing boundary for pakket
//!
//! Signing is an external collaborator invoked once per packaging target
//! after artifact capture. A spec that declares no signer for the target
//! passes artifacts through untouched; a declared signer that fails is
//! fatal for that target, never silently skipped.

use async_trait::async_trait;

use pakket_errors::{Result, SigningError};
use pakket_graph::State;
use pakket_types::PackageSpec;

/// External signing collaborator
#[async_trait]
pub trait Signer: Send + Sync {
    /// Wrap `state` so the engine routes its artifacts through the
    /// signing service, returning the signed state.
    ///
    /// # Errors
    ///
    /// Returns an error when the signing request cannot be constructed.
    async fn sign(&self, state: State, spec: &PackageSpec, target_key: &str) -> Result<State>;
}

/// Forward `state` through the signer when the spec requests signing for
/// `target_key`.
///
/// # Errors
///
/// Returns [`SigningError::NoSigner`] when the spec requests signing but
/// no signer is wired, and propagates any signer failure.
pub async fn maybe_sign(
    signer: Option<&dyn Signer>,
    state: State,
    spec: &PackageSpec,
    target_key: &str,
) -> Result<State> {
    if spec.signer(target_key).is_none() {
        return Ok(state);
    }

    match signer {
        Some(signer) => signer.sign(state, spec, target_key).await,
        None => Err(SigningError::NoSigner {
            target_key: target_key.to_string(),
        }
        .into()),
    }
}
