//! Build graph assembly error types

use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum BuildError {
    #[error("build step {index} failed ({command}): {message}")]
    StepFailed {
        index: usize,
        command: String,
        message: String,
    },

    #[error("spec declares no build steps for {target_key}")]
    NoBuildSteps { target_key: String },

    #[error("failed to assemble {stage} for {target_key}: {message}")]
    AssembleFailed {
        stage: String,
        target_key: String,
        message: String,
    },
}
