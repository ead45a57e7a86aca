//! Registry resolution boundary

use async_trait::async_trait;

use pakket_errors::Result;
use pakket_types::Platform;

/// External collaborator resolving an image reference to its raw config
/// bytes. The compiler only decodes the returned payload; fetching,
/// authentication, and retries live behind this trait.
#[async_trait]
pub trait ImageMetaResolver: Send + Sync {
    /// Resolve `reference` for `platform` and return the raw image
    /// config bytes.
    ///
    /// # Errors
    ///
    /// Implementations return an error when the registry lookup fails;
    /// the caller treats that as fatal for the requesting pipeline.
    async fn resolve_image_config(
        &self,
        reference: &str,
        platform: Option<&Platform>,
    ) -> Result<Vec<u8>>;
}
