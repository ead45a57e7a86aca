//! Container image pipeline
//!
//! Produces a rootfs state for the target's output image: the distro's
//! base packages plus the spec's runtime dependencies installed into the
//! resolved base image, then (unless running deps-only) the freshly
//! built package installed on top. The resolved image config rides along
//! in the compile output.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use pakket_errors::Result;
use pakket_graph::State;

use crate::distro::DistroBackend;
use crate::image::resolve_image_config;
use crate::target::{CompileOutput, CompileRequest, PipelineHandler};

/// Mount point the output rootfs is assembled under
pub const ROOTFS_DIR: &str = "/tmp/rootfs";

/// Mount point the built package files are exposed at
pub const PACKAGE_DIR: &str = "/tmp/pkg";

/// Pipeline producing a container rootfs plus its image config.
///
/// `packager` builds the distro package to install; `None` selects the
/// deps-only variant, which stops after installing dependencies.
pub struct ContainerTarget {
    backend: Arc<dyn DistroBackend>,
    packager: Option<Arc<dyn PipelineHandler>>,
}

impl ContainerTarget {
    #[must_use]
    pub fn new(
        backend: Arc<dyn DistroBackend>,
        packager: Option<Arc<dyn PipelineHandler>>,
    ) -> Self {
        Self { backend, packager }
    }
}

#[async_trait]
impl PipelineHandler for ContainerTarget {
    async fn handle(&self, req: &CompileRequest<'_>) -> Result<CompileOutput> {
        let config = self.backend.config();
        let target_key = config.target_key;

        let image =
            resolve_image_config(req.resolver, req.spec, &req.platform, target_key).await?;

        let base_ref = req
            .spec
            .base_output_image(target_key)
            .unwrap_or(config.default_output_image);
        let base = State::image_for_platform(base_ref, req.platform.clone());

        let mut packages: Vec<String> =
            config.base_packages.iter().map(ToString::to_string).collect();
        packages.extend(req.spec.runtime_deps(target_key));
        packages.sort();
        packages.dedup();

        debug!(
            package = %req.spec.name,
            target = target_key,
            base = base_ref,
            deps = packages.len(),
            "compiling container target"
        );

        let worker = self.backend.base();
        let mut rootfs = if packages.is_empty() {
            base
        } else {
            let install = self
                .backend
                .install(ROOTFS_DIR, &packages, false)
                .with_mount(ROOTFS_DIR, base);
            worker.run(install).capture(ROOTFS_DIR)
        };

        if let Some(packager) = &self.packager {
            let package = packager.handle(req).await?.state;
            let install = self
                .backend
                .install_local(ROOTFS_DIR, PACKAGE_DIR)
                .with_mount(ROOTFS_DIR, rootfs)
                .with_readonly_mount(PACKAGE_DIR, package);
            rootfs = worker.run(install).capture(ROOTFS_DIR);
        }

        Ok(CompileOutput {
            state: rootfs,
            image: Some(image),
        })
    }
}
