//! Target routing
//!
//! A target path string selects one pipeline; the mux is routing plus
//! advertised metadata, nothing more. Exactly one target per distro is
//! the default, taken when the caller names no target.

use std::sync::Arc;

use async_trait::async_trait;

use pakket_errors::{Result, TargetError};
use pakket_graph::{ImageMetaResolver, State};
use pakket_signing::Signer;
use pakket_types::{validation, ImageConfig, PackageSpec, Platform};

use crate::distro::{Jammy, Mariner2, WindowsWorker};
use crate::pipelines;
use crate::source::SourceOptions;

/// Advertised metadata for one registered target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetInfo {
    pub name: String,
    pub description: String,
    pub default: bool,
}

/// One compilation request against a mux
pub struct CompileRequest<'a> {
    pub spec: &'a PackageSpec,
    pub platform: Platform,
    pub resolver: &'a dyn ImageMetaResolver,
    pub signer: Option<&'a dyn Signer>,
    pub source_options: SourceOptions,
}

/// Result of compiling one target: the output state plus, for container
/// targets, the finalized image config
#[derive(Debug)]
pub struct CompileOutput {
    pub state: State,
    pub image: Option<ImageConfig>,
}

/// One registered pipeline
#[async_trait]
pub trait PipelineHandler: Send + Sync {
    /// Compile `req` into this pipeline's output state.
    ///
    /// # Errors
    ///
    /// Any stage failure (sources, build assembly, packaging, image
    /// resolution, signing) aborts the target and propagates.
    async fn handle(&self, req: &CompileRequest<'_>) -> Result<CompileOutput>;
}

struct MuxEntry {
    info: TargetInfo,
    handler: Arc<dyn PipelineHandler>,
}

/// Maps target path strings to pipelines for one distro
pub struct TargetMux {
    distro: String,
    entries: Vec<MuxEntry>,
}

impl TargetMux {
    #[must_use]
    pub fn new(distro: impl Into<String>) -> Self {
        Self {
            distro: distro.into(),
            entries: Vec::new(),
        }
    }

    /// Register `handler` under `info.name`.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::DuplicateTarget`] when the name is taken.
    pub fn add(&mut self, handler: Arc<dyn PipelineHandler>, info: TargetInfo) -> Result<()> {
        if self.entries.iter().any(|e| e.info.name == info.name) {
            return Err(TargetError::DuplicateTarget { target: info.name }.into());
        }
        self.entries.push(MuxEntry { info, handler });
        Ok(())
    }

    /// Advertised targets, in registration order.
    #[must_use]
    pub fn targets(&self) -> Vec<&TargetInfo> {
        self.entries.iter().map(|e| &e.info).collect()
    }

    /// The target taken when the caller names none.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::NoDefaultTarget`] for a mux registered
    /// without one.
    pub fn default_target(&self) -> Result<&TargetInfo> {
        self.entries
            .iter()
            .find(|e| e.info.default)
            .map(|e| &e.info)
            .ok_or_else(|| {
                TargetError::NoDefaultTarget {
                    distro: self.distro.clone(),
                }
                .into()
            })
    }

    /// Validate the spec, route `target_path` to its pipeline, and run
    /// it. `None` selects the default target.
    ///
    /// # Errors
    ///
    /// Fails with [`TargetError::UnknownTarget`] for unregistered paths;
    /// spec validation and pipeline failures propagate as-is.
    pub async fn handle(
        &self,
        target_path: Option<&str>,
        req: &CompileRequest<'_>,
    ) -> Result<CompileOutput> {
        validation::validate(req.spec)?;

        let name = match target_path {
            Some(name) => name.to_string(),
            None => self.default_target()?.name.clone(),
        };

        let entry = self
            .entries
            .iter()
            .find(|e| e.info.name == name)
            .ok_or_else(|| TargetError::UnknownTarget {
                target: name.clone(),
                available: self
                    .entries
                    .iter()
                    .map(|e| e.info.name.clone())
                    .collect(),
            })?;

        entry.handler.handle(req).await
    }
}

fn info(name: &str, description: &str, default: bool) -> TargetInfo {
    TargetInfo {
        name: name.to_string(),
        description: description.to_string(),
        default,
    }
}

/// The mux for the mariner2 RPM family.
#[must_use]
pub fn mariner2_mux() -> TargetMux {
    let backend = Arc::new(Mariner2::new());
    TargetMux {
        distro: "mariner2".to_string(),
        entries: vec![
            MuxEntry {
                info: info("rpm", "Builds an rpm and src.rpm.", false),
                handler: Arc::new(pipelines::RpmTarget::new(backend.clone())),
            },
            MuxEntry {
                info: info(
                    "container",
                    "Builds a container image for CBL-Mariner 2.0",
                    true,
                ),
                handler: Arc::new(pipelines::ContainerTarget::new(
                    backend.clone(),
                    Some(Arc::new(pipelines::RpmTarget::new(backend.clone()))),
                )),
            },
            MuxEntry {
                info: info(
                    "container/depsonly",
                    "Builds a container image with only the runtime dependencies installed.",
                    false,
                ),
                handler: Arc::new(pipelines::ContainerTarget::new(backend.clone(), None)),
            },
            MuxEntry {
                info: info(
                    "worker",
                    "Builds the base worker image responsible for building the rpm",
                    false,
                ),
                handler: Arc::new(pipelines::WorkerTarget::new(backend)),
            },
        ],
    }
}

/// The mux for jammy Debian packaging.
#[must_use]
pub fn jammy_mux() -> TargetMux {
    let backend = Arc::new(Jammy::new());
    TargetMux {
        distro: "jammy".to_string(),
        entries: vec![
            MuxEntry {
                info: info("deb", "Builds a deb package for jammy.", true),
                handler: Arc::new(pipelines::DebTarget::new(backend.clone())),
            },
            MuxEntry {
                info: info("dsc", "Builds a Debian source package for jammy.", false),
                handler: Arc::new(pipelines::DscTarget::new(backend.clone())),
            },
            MuxEntry {
                info: info(
                    "testing/container",
                    "Builds a container image for jammy for testing purposes only.",
                    false,
                ),
                handler: Arc::new(pipelines::ContainerTarget::new(
                    backend.clone(),
                    Some(Arc::new(pipelines::DebTarget::new(backend))),
                )),
            },
        ],
    }
}

/// The mux for windows cross-compilation.
#[must_use]
pub fn windows_mux() -> TargetMux {
    let backend = Arc::new(WindowsWorker::new());
    TargetMux {
        distro: "windowscross".to_string(),
        entries: vec![
            MuxEntry {
                info: info("zip", "Builds binaries and packages them as a zip archive.", true),
                handler: Arc::new(pipelines::ZipTarget::new(backend.clone())),
            },
            MuxEntry {
                info: info(
                    "worker",
                    "Builds the base worker image responsible for cross-compiling.",
                    false,
                ),
                handler: Arc::new(pipelines::WorkerTarget::new(backend)),
            },
        ],
    }
}
