//! Build graph assembly
//!
//! Composes a distro backend, materialized sources, and the synthesized
//! build script into one graph: install build dependencies, mount
//! sources and script, execute with network access disabled, capture the
//! output directory, and forward through the signing hook.

use tracing::debug;

use pakket_errors::Result;
use pakket_graph::{NetworkMode, RunDirective, State};
use pakket_signing::{maybe_sign, Signer};
use pakket_types::PackageSpec;

use crate::distro::DistroBackend;
use crate::script::{build_script_state, synthesize_invocation_script};
use crate::source::{apply_patches, materialize_sources, mount_sources, SourceOptions};

/// Root the sources are mounted at during the build
pub const BUILD_ROOT: &str = "/build";

/// Root the synthesized script is mounted at
pub const SCRIPTS_ROOT: &str = "/tmp/scripts";

/// Directory binary artifacts are moved into and captured from
pub const OUTPUT_DIR: &str = "/tmp/output";

/// The worker state for `backend` with the target's build dependencies
/// installed. Skipped entirely when the dependency list is empty. The
/// list is sorted before joining so the install directive is stable.
#[must_use]
pub fn worker_with_build_deps(
    backend: &dyn DistroBackend,
    spec: &PackageSpec,
    target_key: &str,
) -> State {
    let worker = backend.base();
    let mut deps = spec.build_deps(target_key);
    if deps.is_empty() {
        return worker;
    }
    deps.sort();
    worker.run(backend.install("/", &deps, false)).root()
}

/// Build the spec's binary artifacts on `backend` and capture them.
///
/// The build run itself is hermetic: every source needing network access
/// is fetched during materialization, and the run executes with network
/// access explicitly disabled.
///
/// # Errors
///
/// Source materialization, patch planning, and signing failures are all
/// fatal and carry the offending source or target in the error.
pub async fn build_binaries(
    backend: &dyn DistroBackend,
    spec: &PackageSpec,
    target_key: &str,
    signer: Option<&dyn Signer>,
    opts: &SourceOptions,
) -> Result<State> {
    let worker = worker_with_build_deps(backend, spec, target_key);

    let sources = materialize_sources(spec, &worker, opts)?;
    let patched = apply_patches(&worker, spec, sources)?;

    let binaries = artifact_keys(spec);
    debug!(package = %spec.name, target = target_key, artifacts = binaries.len(), "assembling build graph");

    let mut directive =
        RunDirective::shell(synthesize_invocation_script(&binaries, OUTPUT_DIR))
            .with_dir(BUILD_ROOT)
            .with_mount(SCRIPTS_ROOT, build_script_state(spec))
            .with_network(NetworkMode::None);
    directive.mounts.extend(mount_sources(BUILD_ROOT, &patched));

    let output = worker.run(directive).capture(OUTPUT_DIR);

    maybe_sign(signer, output, spec, target_key).await
}

/// Paths of every declared artifact within the build tree, in sorted
/// order: binaries first, then systemd units and drop-ins. These are the
/// files the invocation script moves into the output directory.
#[must_use]
pub fn artifact_keys(spec: &PackageSpec) -> Vec<String> {
    let mut keys: Vec<String> = spec.artifacts.binaries.keys().cloned().collect();
    if let Some(systemd) = &spec.artifacts.systemd {
        keys.extend(systemd.units.keys().cloned());
        keys.extend(systemd.dropins.keys().cloned());
    }
    keys
}

/// Wrap captured artifacts into a single zip archive named after the
/// package.
#[must_use]
pub fn zip_archive(worker: &State, name: &str, artifacts: State) -> State {
    let out_name = format!("{OUTPUT_DIR}/{name}.zip");
    worker
        .run(
            RunDirective::shell(format!("zip {out_name} *"))
                .with_dir("/tmp/artifacts")
                .with_mount("/tmp/artifacts", artifacts),
        )
        .capture(OUTPUT_DIR)
}
