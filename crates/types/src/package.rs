//! Declarative package spec
//!
//! A [`PackageSpec`] describes one package independently of any distro:
//! where its sources come from, how they are patched, the ordered build
//! steps, what artifacts the build produces, and per-target dependency
//! lists and image overrides. The compiler never mutates a spec; build-arg
//! expansion returns a new resolved copy.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::args::expand_args;
use crate::image::ImageOverride;
use crate::systemd::SystemdConfiguration;
use pakket_errors::SpecError;

/// Top-level package specification
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageSpec {
    /// Package name
    pub name: String,

    /// Package version
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,

    /// Package revision
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub revision: String,

    /// One-line package description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Upstream project website
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub website: String,

    /// Package license identifier
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub license: String,

    /// Declared build args with optional defaults. An arg with no default
    /// must be provided at expansion time.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub args: BTreeMap<String, Option<String>>,

    /// Named sources to materialize before building
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sources: BTreeMap<String, Source>,

    /// Patches to overlay onto sources, keyed by the source they apply to
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub patches: BTreeMap<String, Vec<PatchSpec>>,

    /// Build stage
    #[serde(default)]
    pub build: BuildConfig,

    /// Artifacts the build produces
    #[serde(default)]
    pub artifacts: ArtifactsConfig,

    /// Default dependency lists, used when a target declares none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<PackageDependencies>,

    /// Per-target overrides keyed by target key (e.g. "mariner2")
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub targets: BTreeMap<String, TargetConfig>,
}

/// One declared source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Git checkout
    Git {
        url: String,
        commit: String,
        #[serde(default)]
        keep_git_dir: bool,
    },

    /// Single file fetched over HTTP
    Http {
        url: String,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        digest: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        permissions: Option<u32>,
    },

    /// Named build context supplied by the caller
    Context {
        #[serde(default, skip_serializing_if = "String::is_empty")]
        name: String,
    },

    /// File content declared inline in the spec
    Inline { file: InlineFile },
}

impl Source {
    /// Whether this source materializes as a directory. Decided by the
    /// declaration alone, never by inspecting fetched content.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        match self {
            Source::Git { .. } | Source::Context { .. } => true,
            Source::Http { .. } | Source::Inline { .. } => false,
        }
    }
}

/// Inline file content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineFile {
    pub contents: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<u32>,
}

/// One patch to apply to a source. The patch file itself comes from
/// another declared source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchSpec {
    /// Name of the declared source holding the patch file
    pub source: String,

    /// Path to the patch file within that source. Empty when the source
    /// is itself the patch file.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,

    /// Path components to strip when applying (patch -p)
    #[serde(default = "default_strip")]
    pub strip: u32,
}

fn default_strip() -> u32 {
    1
}

/// Build stage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Ordered build steps; order is preserved verbatim in the
    /// synthesized script
    #[serde(default)]
    pub steps: Vec<BuildStep>,

    /// Go module dependencies to pre-fetch into a shared module cache
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gomods: Option<GomodConfig>,
}

/// One build step with its own environment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStep {
    /// Shell command to run
    pub command: String,

    /// Environment exported for this step only. BTreeMap so export order
    /// in the synthesized script is stable.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

/// Go module dependency declaration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GomodConfig {
    /// Names of declared directory sources containing go.mod files
    #[serde(default)]
    pub sources: Vec<String>,
}

/// Artifacts produced by the build
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    /// Binaries to extract from the build tree, keyed by their path
    /// relative to the build root
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub binaries: BTreeMap<String, ArtifactConfig>,

    /// Systemd units and drop-ins to package
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub systemd: Option<SystemdConfiguration>,
}

/// Placement of one artifact inside the package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Subdirectory under the artifact's install root
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sub_path: String,

    /// Name to install the artifact under. Empty means keep the base
    /// name of the artifact key.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

impl ArtifactConfig {
    /// Resolve the installed file name for artifact key `key`.
    #[must_use]
    pub fn resolve_name(&self, key: &str) -> String {
        if self.name.is_empty() {
            key.rsplit('/').next().unwrap_or(key).to_string()
        } else {
            self.name.clone()
        }
    }
}

/// Build-time and runtime dependency lists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDependencies {
    #[serde(default)]
    pub build: Vec<String>,

    #[serde(default)]
    pub runtime: Vec<String>,
}

/// Per-target spec overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Output image configuration for container targets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<TargetImageConfig>,

    /// Dependency lists overriding the spec-level defaults
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<PackageDependencies>,

    /// Signing configuration; presence requests signing for this target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer: Option<SignerConfig>,
}

/// Base image and config overrides for a container target
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetImageConfig {
    /// Base output image reference. Empty means the distro's minimal
    /// platform default.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base: String,

    /// Image config fields overriding the resolved base config
    #[serde(flatten)]
    pub config: ImageOverride,
}

/// Signing collaborator configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerConfig {
    /// Reference to the signing frontend image
    pub reference: String,
}

impl PackageSpec {
    /// Build dependencies for `target_key`, falling back to the
    /// spec-level defaults.
    #[must_use]
    pub fn build_deps(&self, target_key: &str) -> Vec<String> {
        self.target_deps(target_key)
            .map(|d| d.build.clone())
            .unwrap_or_default()
    }

    /// Runtime dependencies for `target_key`, falling back to the
    /// spec-level defaults.
    #[must_use]
    pub fn runtime_deps(&self, target_key: &str) -> Vec<String> {
        self.target_deps(target_key)
            .map(|d| d.runtime.clone())
            .unwrap_or_default()
    }

    fn target_deps(&self, target_key: &str) -> Option<&PackageDependencies> {
        self.targets
            .get(target_key)
            .and_then(|t| t.dependencies.as_ref())
            .or(self.dependencies.as_ref())
    }

    /// Base output image reference declared for `target_key`, if any.
    #[must_use]
    pub fn base_output_image(&self, target_key: &str) -> Option<&str> {
        self.targets
            .get(target_key)
            .and_then(|t| t.image.as_ref())
            .map(|i| i.base.as_str())
            .filter(|base| !base.is_empty())
    }

    /// Image config overrides declared for `target_key`.
    #[must_use]
    pub fn image_override(&self, target_key: &str) -> Option<&ImageOverride> {
        self.targets
            .get(target_key)
            .and_then(|t| t.image.as_ref())
            .map(|i| &i.config)
    }

    /// Signing configuration for `target_key`, if the spec requests it.
    #[must_use]
    pub fn signer(&self, target_key: &str) -> Option<&SignerConfig> {
        self.targets
            .get(target_key)
            .and_then(|t| t.signer.as_ref())
    }

    /// Whether the spec declares go module dependencies.
    #[must_use]
    pub fn has_gomods(&self) -> bool {
        self.build
            .gomods
            .as_ref()
            .is_some_and(|g| !g.sources.is_empty())
    }

    /// Resolve declared args against `provided` values and produce a
    /// fully expanded copy of the spec. The receiver is untouched.
    ///
    /// Expansion covers source URLs and commits, patch paths, build step
    /// commands and environment values, artifact placement, systemd
    /// configuration (keys included), and per-target base image
    /// references.
    ///
    /// # Errors
    ///
    /// Returns an error when a provided arg is not declared, a declared
    /// arg has neither a value nor a default, or any expansion fails.
    pub fn expand_build_args(
        &self,
        provided: &BTreeMap<String, String>,
    ) -> Result<Self, SpecError> {
        for name in provided.keys() {
            if !self.args.contains_key(name) {
                return Err(SpecError::UndeclaredArg { name: name.clone() });
            }
        }

        let mut resolved = BTreeMap::new();
        for (name, default) in &self.args {
            let value = provided
                .get(name)
                .cloned()
                .or_else(|| default.clone())
                .ok_or_else(|| SpecError::UnresolvedArg { name: name.clone() })?;
            resolved.insert(name.clone(), value);
        }

        let mut spec = self.clone();

        for source in spec.sources.values_mut() {
            *source = expand_source(source, &resolved)?;
        }

        for patches in spec.patches.values_mut() {
            for patch in patches.iter_mut() {
                if !patch.path.is_empty() {
                    patch.path = expand_args(&patch.path, &resolved)?;
                }
            }
        }

        for step in &mut spec.build.steps {
            step.command = expand_args(&step.command, &resolved)?;
            let mut env = BTreeMap::new();
            for (key, value) in &step.env {
                env.insert(key.clone(), expand_args(value, &resolved)?);
            }
            step.env = env;
        }

        let mut binaries = BTreeMap::new();
        for (key, config) in &spec.artifacts.binaries {
            let mut config = config.clone();
            if !config.name.is_empty() {
                config.name = expand_args(&config.name, &resolved)?;
            }
            if !config.sub_path.is_empty() {
                config.sub_path = expand_args(&config.sub_path, &resolved)?;
            }
            binaries.insert(expand_args(key, &resolved)?, config);
        }
        spec.artifacts.binaries = binaries;

        if let Some(systemd) = &spec.artifacts.systemd {
            spec.artifacts.systemd = Some(systemd.expand_build_args(&resolved)?);
        }

        for target in spec.targets.values_mut() {
            if let Some(image) = &mut target.image {
                if !image.base.is_empty() {
                    image.base = expand_args(&image.base, &resolved)?;
                }
            }
        }

        Ok(spec)
    }
}

fn expand_source(
    source: &Source,
    args: &BTreeMap<String, String>,
) -> Result<Source, SpecError> {
    Ok(match source {
        Source::Git {
            url,
            commit,
            keep_git_dir,
        } => Source::Git {
            url: expand_args(url, args)?,
            commit: expand_args(commit, args)?,
            keep_git_dir: *keep_git_dir,
        },
        Source::Http {
            url,
            digest,
            permissions,
        } => Source::Http {
            url: expand_args(url, args)?,
            digest: digest.clone(),
            permissions: *permissions,
        },
        Source::Context { name } => Source::Context {
            name: expand_args(name, args)?,
        },
        Source::Inline { file } => Source::Inline { file: file.clone() },
    })
}
