#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! The pakket spec-to-build-graph compiler
//!
//! Takes a declarative [`pakket_types::PackageSpec`] plus a chosen target
//! (distro + package format) and deterministically derives a build-graph
//! description: dependency installation, source materialization and
//! patching, a synthesized build script, and output capture. Per-distro
//! package-manager behavior lives behind the [`distro::DistroBackend`]
//! capability set so the assembly logic is shared verbatim across all
//! distros.
//!
//! The compiler itself is pure computation; fetches and process execution
//! happen inside the external execution engine that realizes the emitted
//! graph.

pub mod assemble;
pub mod distro;
pub mod image;
pub mod pipelines;
pub mod script;
pub mod source;
pub mod target;

pub use assemble::{
    artifact_keys, build_binaries, worker_with_build_deps, zip_archive, BUILD_ROOT, OUTPUT_DIR,
    SCRIPTS_ROOT,
};
pub use distro::{DistroBackend, DistroConfig, Jammy, Mariner2, WindowsWorker};
pub use image::resolve_image_config;
pub use pipelines::{
    ContainerTarget, DebTarget, DscTarget, RpmTarget, WorkerTarget, ZipTarget,
};
pub use script::{
    build_script_state, synthesize_build_script, synthesize_invocation_script, BUILD_SCRIPT_NAME,
};
pub use source::{
    apply_patches, materialize_sources, mount_sources, SourceOptions, SourceOrigin, SourceState,
};
pub use target::{
    jammy_mux, mariner2_mux, windows_mux, CompileOutput, CompileRequest, PipelineHandler,
    TargetInfo, TargetMux,
};
