//! Dependency installation error types

use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum InstallError {
    #[error("failed to install build dependencies for {target_key}: {message}")]
    BuildDepsFailed { target_key: String, message: String },

    #[error("failed to install runtime dependencies for {target_key}: {message}")]
    RuntimeDepsFailed { target_key: String, message: String },

    #[error("no package installer for distro {distro}")]
    NoInstaller { distro: String },
}
