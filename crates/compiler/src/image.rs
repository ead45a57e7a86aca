//! Image config resolution
//!
//! Resolves the base-image config for a container target (registry
//! lookup or platform default) and merges the spec's declared overrides
//! with override precedence.

use tracing::debug;

use pakket_errors::{ImageError, Result};
use pakket_graph::ImageMetaResolver;
use pakket_types::{ImageConfig, PackageSpec, Platform};

/// Resolve the final image config for `target_key`.
///
/// When the spec names no base output image for the target, a minimal
/// platform-default config is used. Spec-declared override fields replace
/// base fields field-by-field; unspecified fields retain the base value.
///
/// # Errors
///
/// Registry lookup failures and undecodable payloads are fatal; there is
/// no silent fallback to the default config.
pub async fn resolve_image_config(
    resolver: &dyn ImageMetaResolver,
    spec: &PackageSpec,
    platform: &Platform,
    target_key: &str,
) -> Result<ImageConfig> {
    let mut config = match spec.base_output_image(target_key) {
        None => ImageConfig::default_for_platform(platform),
        Some(reference) => {
            debug!(reference, target = target_key, "resolving base image config");
            let bytes = resolver
                .resolve_image_config(reference, Some(platform))
                .await
                .map_err(|e| ImageError::ResolutionFailed {
                    reference: reference.to_string(),
                    message: e.to_string(),
                })?;
            serde_json::from_slice(&bytes).map_err(|e| ImageError::ConfigDecode {
                reference: reference.to_string(),
                message: e.to_string(),
            })?
        }
    };

    if let Some(over) = spec.image_override(target_key) {
        config.merge_override(over);
    }

    Ok(config)
}
