//! End-to-end graph compilation tests
//!
//! Exercise whole pipelines against an in-memory image resolver and
//! inspect the emitted graph structure.

use std::collections::BTreeMap;

use async_trait::async_trait;

use pakket_compiler::{
    build_binaries, mount_sources, resolve_image_config, worker_with_build_deps, DistroBackend,
    Jammy, Mariner2, SourceOptions, SourceOrigin, WindowsWorker, OUTPUT_DIR, SCRIPTS_ROOT,
};
use pakket_errors::{Error, ImageError, Result};
use pakket_graph::{ImageMetaResolver, NetworkMode, Node, State};
use pakket_types::{
    ArtifactConfig, BuildStep, GomodConfig, ImageOverride, PackageDependencies, PackageSpec,
    Platform, Source, TargetConfig, TargetImageConfig, GOMODS_SOURCE_NAME,
};

/// Resolver serving canned config bytes per reference.
struct CannedResolver {
    configs: BTreeMap<String, Vec<u8>>,
}

impl CannedResolver {
    fn new() -> Self {
        Self {
            configs: BTreeMap::new(),
        }
    }

    fn with(mut self, reference: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.configs.insert(reference.to_string(), bytes.into());
        self
    }
}

#[async_trait]
impl ImageMetaResolver for CannedResolver {
    async fn resolve_image_config(
        &self,
        reference: &str,
        _platform: Option<&Platform>,
    ) -> Result<Vec<u8>> {
        self.configs
            .get(reference)
            .cloned()
            .ok_or_else(|| Error::internal(format!("no canned config for {reference}")))
    }
}

fn spec_with_binary() -> PackageSpec {
    let mut spec = PackageSpec {
        name: "demo".to_string(),
        version: "1.0.0".to_string(),
        revision: "1".to_string(),
        description: "demo".to_string(),
        ..PackageSpec::default()
    };
    spec.build.steps.push(BuildStep {
        command: "make".to_string(),
        env: BTreeMap::new(),
    });
    spec.artifacts
        .binaries
        .insert("bin/demo".to_string(), ArtifactConfig::default());
    spec
}

fn exec_directive(state: &State) -> &pakket_graph::RunDirective {
    let Node::Exec { directive, .. } = state.node() else {
        panic!("expected exec node, got {:?}", state.node());
    };
    directive
}

#[tokio::test]
async fn build_run_is_hermetic_and_captures_output() {
    let backend = Mariner2::new();
    let spec = spec_with_binary();
    let state = build_binaries(&backend, &spec, "mariner2", None, &SourceOptions::default())
        .await
        .unwrap();

    let directive = exec_directive(&state);
    assert_eq!(directive.network, NetworkMode::None);
    assert_eq!(directive.dir, "/build");
    let Node::Exec { output, .. } = state.node() else {
        unreachable!();
    };
    assert_eq!(
        *output,
        pakket_graph::ExecOutput::Capture {
            dir: OUTPUT_DIR.to_string()
        }
    );
    assert!(directive
        .mounts
        .iter()
        .any(|m| m.target == SCRIPTS_ROOT));
    assert!(directive.args.last().unwrap().contains("mv 'bin/demo'"));
}

#[tokio::test]
async fn worker_skips_dependency_install_when_none_declared() {
    let backend = Jammy::new();
    let spec = spec_with_binary();
    let worker = worker_with_build_deps(&backend, &spec, "jammy");
    // base() itself ends in the toolchain install exec
    let directive = exec_directive(&worker);
    assert!(directive.args.last().unwrap().contains("build-essential"));
}

#[tokio::test]
async fn worker_installs_sorted_build_deps() {
    let backend = Jammy::new();
    let mut spec = spec_with_binary();
    spec.dependencies = Some(PackageDependencies {
        build: vec!["zlib1g-dev".to_string(), "cmake".to_string()],
        runtime: vec![],
    });
    let worker = worker_with_build_deps(&backend, &spec, "jammy");
    let directive = exec_directive(&worker);
    let command = directive.args.last().unwrap();
    assert!(command.ends_with("cmake zlib1g-dev"));
}

#[tokio::test]
async fn gomod_cache_is_injected_and_exported() {
    let backend = WindowsWorker::new();
    let mut spec = spec_with_binary();
    spec.sources.insert(
        "src".to_string(),
        Source::Git {
            url: "https://example.com/repo.git".to_string(),
            commit: "v1.0.0".to_string(),
            keep_git_dir: false,
        },
    );
    spec.build.gomods = Some(GomodConfig {
        sources: vec!["src".to_string()],
    });

    let worker = worker_with_build_deps(&backend, &spec, "windowscross");
    let sources = pakket_compiler::materialize_sources(&spec, &worker, &SourceOptions::default())
        .unwrap();

    let cache = &sources[GOMODS_SOURCE_NAME];
    assert_eq!(cache.origin, SourceOrigin::Generated);
    let directive = exec_directive(&cache.state);
    assert_eq!(directive.env["GOMODCACHE"], "/gomods");
    assert!(directive.args.last().unwrap().contains("go mod download"));

    // the cache mounts like a directory source under the build root
    let plan = mount_sources("/build", &sources);
    assert!(plan
        .iter()
        .any(|m| m.target == format!("/build/{GOMODS_SOURCE_NAME}")));
}

#[test]
fn mount_plan_is_sorted_and_merges_file_sources() {
    let mut spec = PackageSpec {
        name: "demo".to_string(),
        ..PackageSpec::default()
    };
    for name in ["zeta", "alpha"] {
        spec.sources.insert(
            name.to_string(),
            Source::Git {
                url: format!("https://example.com/{name}.git"),
                commit: "main".to_string(),
                keep_git_dir: false,
            },
        );
    }
    spec.sources.insert(
        "notes".to_string(),
        Source::Http {
            url: "https://example.com/notes.txt".to_string(),
            digest: String::new(),
            permissions: None,
        },
    );

    let worker = State::scratch();
    let sources =
        pakket_compiler::materialize_sources(&spec, &worker, &SourceOptions::default()).unwrap();
    let plan = mount_sources("/build", &sources);

    let targets: Vec<&str> = plan.iter().map(|m| m.target.as_str()).collect();
    // merged file root first, then directories in name order
    assert_eq!(targets, vec!["/build", "/build/alpha", "/build/zeta"]);
}

#[tokio::test]
async fn image_config_prefers_spec_overrides() {
    let base_config = r#"{"os":"linux","architecture":"amd64","config":{"Entrypoint":["/bin/sh"],"WorkingDir":"/base"}}"#;
    let resolver = CannedResolver::new().with("registry.example.com/base:1", base_config);

    let mut spec = spec_with_binary();
    let image = ImageOverride {
        working_dir: Some("/app".to_string()),
        ..ImageOverride::default()
    };
    spec.targets.insert(
        "mariner2".to_string(),
        TargetConfig {
            image: Some(TargetImageConfig {
                base: "registry.example.com/base:1".to_string(),
                config: image,
            }),
            ..TargetConfig::default()
        },
    );

    let config = resolve_image_config(&resolver, &spec, &Platform::host(), "mariner2")
        .await
        .unwrap();
    assert_eq!(config.config.working_dir.as_deref(), Some("/app"));
    // untouched base fields survive the merge
    assert_eq!(
        config.config.entrypoint,
        Some(vec!["/bin/sh".to_string()])
    );
}

#[tokio::test]
async fn undecodable_image_config_is_a_decode_error() {
    let resolver = CannedResolver::new().with("registry.example.com/base:1", "not json");

    let mut spec = spec_with_binary();
    spec.targets.insert(
        "mariner2".to_string(),
        TargetConfig {
            image: Some(TargetImageConfig {
                base: "registry.example.com/base:1".to_string(),
                config: ImageOverride::default(),
            }),
            ..TargetConfig::default()
        },
    );

    let err = resolve_image_config(&resolver, &spec, &Platform::host(), "mariner2")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Image(ImageError::ConfigDecode { .. })
    ));
}

#[tokio::test]
async fn patches_apply_in_declared_order() {
    let backend = Mariner2::new();
    let mut spec = spec_with_binary();
    spec.sources.insert(
        "src".to_string(),
        Source::Git {
            url: "https://example.com/repo.git".to_string(),
            commit: "main".to_string(),
            keep_git_dir: false,
        },
    );
    spec.sources.insert(
        "fixes".to_string(),
        Source::Http {
            url: "https://example.com/fix.patch".to_string(),
            digest: String::new(),
            permissions: None,
        },
    );
    spec.patches.insert(
        "src".to_string(),
        vec![pakket_types::PatchSpec {
            source: "fixes".to_string(),
            path: String::new(),
            strip: 2,
        }],
    );

    let worker = worker_with_build_deps(&backend, &spec, "mariner2");
    let sources =
        pakket_compiler::materialize_sources(&spec, &worker, &SourceOptions::default()).unwrap();
    let patched = pakket_compiler::apply_patches(&worker, &spec, sources).unwrap();

    let directive = exec_directive(&patched["src"].state);
    assert_eq!(directive.args.last().unwrap(), "patch -p2 -i /tmp/patch/fixes");
    let patch_mount = directive
        .mounts
        .iter()
        .find(|m| m.target == "/tmp/patch")
        .unwrap();
    assert!(patch_mount.readonly);
    assert!(matches!(
        patch_mount.source.node(),
        Node::Http { name, .. } if name == "fixes"
    ));
}

#[test]
fn http_sources_keep_their_declared_file_name() {
    let backend = Mariner2::new();
    let mut spec = spec_with_binary();
    spec.sources.insert(
        "fixes".to_string(),
        Source::Http {
            url: "https://example.com/fix.patch".to_string(),
            digest: String::new(),
            permissions: None,
        },
    );

    let worker = worker_with_build_deps(&backend, &spec, "mariner2");
    let sources =
        pakket_compiler::materialize_sources(&spec, &worker, &SourceOptions::default()).unwrap();

    let encoded = serde_json::to_string(sources["fixes"].state.node()).unwrap();
    assert!(encoded.contains("fixes"));
    assert!(encoded.contains("https://example.com/fix.patch"));
}

#[test]
fn distro_backends_disagree_only_on_the_install_primitive() {
    let specs: [&dyn DistroBackend; 3] = [&Mariner2::new(), &Jammy::new(), &WindowsWorker::new()];
    let packages = vec!["curl".to_string()];
    let commands: Vec<String> = specs
        .iter()
        .map(|b| b.install("/", &packages, false).args.last().unwrap().clone())
        .collect();
    assert!(commands[0].contains("tdnf install"));
    assert!(commands[1].contains("apt-get install"));
    assert!(commands[2].contains("apt-get install"));
}

mod mount_plan_props {
    use std::collections::BTreeSet;

    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn mount_targets_are_unique_and_sorted(
            names in proptest::collection::btree_set("[a-z][a-z0-9_]{0,8}", 0..8)
        ) {
            let mut spec = PackageSpec {
                name: "demo".to_string(),
                ..PackageSpec::default()
            };
            for name in &names {
                spec.sources.insert(
                    name.clone(),
                    Source::Git {
                        url: format!("https://example.com/{name}.git"),
                        commit: "main".to_string(),
                        keep_git_dir: false,
                    },
                );
            }

            let worker = State::scratch();
            let sources =
                pakket_compiler::materialize_sources(&spec, &worker, &SourceOptions::default())
                    .unwrap();
            let plan = mount_sources("/build", &sources);

            let targets: Vec<&str> = plan.iter().map(|m| m.target.as_str()).collect();
            let unique: BTreeSet<&str> = targets.iter().copied().collect();
            prop_assert_eq!(unique.len(), targets.len());

            // directory mounts follow the merged root in sorted order
            let mut dirs = targets[1..].to_vec();
            dirs.sort_unstable();
            prop_assert_eq!(dirs, targets[1..].to_vec());
        }
    }
}
