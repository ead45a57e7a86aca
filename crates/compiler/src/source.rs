//! Source materialization, patching, and mounting
//!
//! Declared sources become graph leaves; the generated go module cache is
//! injected under a reserved name and tagged so downstream stages can
//! pattern-match instead of relying on name conventions. All network
//! access belongs to this stage; the build run itself is hermetic.

use std::collections::BTreeMap;

use tracing::debug;

use pakket_errors::{Result, SourceError};
use pakket_graph::{Mount, RunDirective, State};
use pakket_types::{PackageSpec, PatchSpec, Source, GOMODS_SOURCE_NAME};

/// Root where gomod sources are staged while prefetching the module cache
const GOMOD_STAGE_ROOT: &str = "/build";

/// Directory captured as the generated module cache
const GOMOD_CACHE_DIR: &str = "/gomods";

/// Options for source materialization
#[derive(Debug, Clone)]
pub struct SourceOptions {
    /// Context name used for context sources declared without one
    pub default_context_name: String,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            default_context_name: "context".to_string(),
        }
    }
}

/// A resolved source: its filesystem state plus how it came to be
#[derive(Debug, Clone, PartialEq)]
pub struct SourceState {
    pub state: State,
    pub origin: SourceOrigin,
}

/// Where a source state came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceOrigin {
    /// Declared in the spec; the tag records the declaration's shape
    Declared { is_dir: bool },
    /// Injected by the compiler under a reserved name; never patchable
    Generated,
}

impl SourceState {
    fn declared(state: State, decl: &Source) -> Self {
        Self {
            state,
            origin: SourceOrigin::Declared {
                is_dir: decl.is_dir(),
            },
        }
    }

    /// Whether this source mounts as a directory.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        match self.origin {
            SourceOrigin::Declared { is_dir } => is_dir,
            SourceOrigin::Generated => true,
        }
    }
}

/// Resolve every declared source into a filesystem state, tagging each as
/// file-like or directory-like from its declaration. When the spec
/// declares go module dependencies, a generated module cache is injected
/// under [`GOMODS_SOURCE_NAME`].
///
/// # Errors
///
/// Returns [`SourceError::UnknownSource`] when a gomod declaration names
/// a source that is missing from the spec.
pub fn materialize_sources(
    spec: &PackageSpec,
    worker: &State,
    opts: &SourceOptions,
) -> Result<BTreeMap<String, SourceState>> {
    let mut out = BTreeMap::new();

    for (name, decl) in &spec.sources {
        let state = match decl {
            Source::Git {
                url,
                commit,
                keep_git_dir,
            } => State::git(url, commit, *keep_git_dir),
            Source::Http { url, digest, .. } => State::http(name, url, digest),
            Source::Context { name: context } => {
                let context = if context.is_empty() {
                    opts.default_context_name.as_str()
                } else {
                    context.as_str()
                };
                State::context(context)
            }
            Source::Inline { file } => {
                State::file(name, &file.contents, file.permissions.unwrap_or(0o644))
            }
        };
        out.insert(name.clone(), SourceState::declared(state, decl));
    }

    if let Some(cache) = gomod_cache(spec, worker, &out)? {
        debug!(name = GOMODS_SOURCE_NAME, "injecting generated module cache");
        out.insert(
            GOMODS_SOURCE_NAME.to_string(),
            SourceState {
                state: cache,
                origin: SourceOrigin::Generated,
            },
        );
    }

    Ok(out)
}

/// Prefetch declared go module dependencies into a captured cache
/// directory. Runs on the worker with network access; the build step
/// later consumes the cache offline.
fn gomod_cache(
    spec: &PackageSpec,
    worker: &State,
    states: &BTreeMap<String, SourceState>,
) -> Result<Option<State>> {
    let Some(gomods) = &spec.build.gomods else {
        return Ok(None);
    };
    if gomods.sources.is_empty() {
        return Ok(None);
    }

    let mut commands = Vec::with_capacity(gomods.sources.len());
    let mut mounts = Vec::with_capacity(gomods.sources.len());
    for name in &gomods.sources {
        let source = states.get(name).ok_or_else(|| SourceError::UnknownSource {
            name: name.clone(),
        })?;
        mounts.push((format!("{GOMOD_STAGE_ROOT}/{name}"), source.state.clone()));
        commands.push(format!("(cd {GOMOD_STAGE_ROOT}/{name} && go mod download)"));
    }

    let mut directive = RunDirective::shell(commands.join(" && "))
        .with_dir(GOMOD_STAGE_ROOT)
        .with_env("GOMODCACHE", GOMOD_CACHE_DIR);
    for (target, state) in mounts {
        directive = directive.with_mount(target, state);
    }

    Ok(Some(worker.run(directive).capture(GOMOD_CACHE_DIR)))
}

/// Overlay each source's declared patches onto its materialized state, in
/// declared order. Unpatched sources pass through unchanged; generated
/// sources are never patched.
///
/// # Errors
///
/// Returns [`SourceError::GeneratedNotPatchable`] when patches target a
/// generated source and [`SourceError::UnknownSource`] when a patch names
/// a source that was never materialized.
pub fn apply_patches(
    worker: &State,
    spec: &PackageSpec,
    states: BTreeMap<String, SourceState>,
) -> Result<BTreeMap<String, SourceState>> {
    // Patch files come from the pre-patch materialized states.
    let originals = states.clone();
    let mut out = BTreeMap::new();

    for (name, mut source) in states {
        if let Some(patches) = spec.patches.get(&name) {
            if source.origin == SourceOrigin::Generated {
                return Err(SourceError::GeneratedNotPatchable { name }.into());
            }
            debug!(source = %name, count = patches.len(), "applying patches");
            for patch in patches {
                source.state = apply_one_patch(worker, source.state, patch, &originals)?;
            }
        }
        out.insert(name, source);
    }

    Ok(out)
}

fn apply_one_patch(
    worker: &State,
    state: State,
    patch: &PatchSpec,
    originals: &BTreeMap<String, SourceState>,
) -> Result<State> {
    let patch_source = originals
        .get(&patch.source)
        .ok_or_else(|| SourceError::UnknownSource {
            name: patch.source.clone(),
        })?;

    let file = if patch.path.is_empty() {
        patch.source.clone()
    } else {
        patch.path.clone()
    };

    let directive = RunDirective::shell(format!(
        "patch -p{} -i /tmp/patch/{file}",
        patch.strip
    ))
    .with_dir("/src")
    .with_mount("/src", state)
    .with_readonly_mount("/tmp/patch", patch_source.state.clone());

    Ok(worker.run(directive).capture("/src"))
}

/// Partition sources into a deterministic mount plan rooted at `dst`:
/// file-like sources merge, in sorted name order, into one synthetic root
/// mounted once at `dst`; directory-like sources mount individually at
/// `dst/<name>`.
#[must_use]
pub fn mount_sources(dst: &str, states: &BTreeMap<String, SourceState>) -> Vec<Mount> {
    let mut files = Vec::new();
    let mut dirs = Vec::new();

    // BTreeMap iteration is sorted by name, so the merged-root layering
    // is reproducible regardless of how the map was populated.
    for (name, source) in states {
        if source.is_dir() {
            dirs.push(Mount {
                target: format!("{dst}/{name}"),
                source: source.state.clone(),
                readonly: false,
            });
        } else {
            files.push(source.state.clone());
        }
    }

    let mut plan = Vec::with_capacity(dirs.len() + 1);
    plan.push(Mount {
        target: dst.to_string(),
        source: State::merge(files),
        readonly: false,
    });
    plan.extend(dirs);
    plan
}
