//! Packaging pipelines
//!
//! One handler per output format, composed from the distro backend, the
//! build graph assembler, and the format-specific packaging run. The
//! target mux owns routing; handlers own semantics.

mod container;
mod deb;
mod rpm;

pub use container::{ContainerTarget, PACKAGE_DIR, ROOTFS_DIR};
pub use deb::{
    build_deb, deb_version, debian_dir_state, synthesize_changelog, synthesize_control,
    synthesize_rules, DebTarget, DscTarget, DEB_BUILD_DIR,
};
pub use rpm::{build_rpm, synthesize_rpm_spec, RpmTarget, RPM_TOPDIR};

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use pakket_errors::Result;
use crate::assemble::{build_binaries, zip_archive};
use crate::distro::DistroBackend;
use crate::target::{CompileOutput, CompileRequest, PipelineHandler};

/// Pipeline returning the bare worker image for a distro. Useful for
/// inspecting or pre-warming the build environment.
pub struct WorkerTarget {
    backend: Arc<dyn DistroBackend>,
}

impl WorkerTarget {
    #[must_use]
    pub fn new(backend: Arc<dyn DistroBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl PipelineHandler for WorkerTarget {
    async fn handle(&self, req: &CompileRequest<'_>) -> Result<CompileOutput> {
        debug!(
            package = %req.spec.name,
            target = self.backend.config().target_key,
            "compiling worker target"
        );
        Ok(CompileOutput {
            state: self.backend.base(),
            image: None,
        })
    }
}

/// Pipeline wrapping the built binaries into a zip archive named after
/// the package.
pub struct ZipTarget {
    backend: Arc<dyn DistroBackend>,
}

impl ZipTarget {
    #[must_use]
    pub fn new(backend: Arc<dyn DistroBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl PipelineHandler for ZipTarget {
    async fn handle(&self, req: &CompileRequest<'_>) -> Result<CompileOutput> {
        let target_key = self.backend.config().target_key;
        debug!(package = %req.spec.name, target = target_key, "compiling zip target");

        let artifacts = build_binaries(
            self.backend.as_ref(),
            req.spec,
            target_key,
            req.signer,
            &req.source_options,
        )
        .await?;

        Ok(CompileOutput {
            state: zip_archive(&self.backend.base(), &req.spec.name, artifacts),
            image: None,
        })
    }
}
