//! Distro backends
//!
//! Every consumer pipeline needs exactly three operations from a distro:
//! a base build root, a package-install primitive, and a default output
//! image config. Each distro family implements [`DistroBackend`] once;
//! graph assembly and script synthesis depend only on the trait.

mod jammy;
mod mariner2;
mod windows;

pub use jammy::Jammy;
pub use mariner2::Mariner2;
pub use windows::WindowsWorker;

use async_trait::async_trait;

use pakket_errors::{ImageError, Result};
use pakket_graph::{ImageMetaResolver, RunDirective, State};
use pakket_types::ImageConfig;

/// Per-distro constant data
#[derive(Debug, Clone, Copy)]
pub struct DistroConfig {
    /// Human-readable distro name
    pub full_name: &'static str,

    /// Target key this distro registers under (e.g. "mariner2")
    pub target_key: &'static str,

    /// Builder base image reference
    pub image_ref: &'static str,

    /// Content mirror reference for source fetches
    pub context_ref: &'static str,

    /// Distro release version string
    pub release_ver: &'static str,

    /// Toolchain installed into the builder base
    pub builder_packages: &'static [&'static str],

    /// Packages preinstalled into output container images
    pub base_packages: &'static [&'static str],

    /// Minimal/distroless image used when the spec names no base output
    /// image
    pub default_output_image: &'static str,

    /// Stable key scoping this distro's package-manager cache
    pub cache_key: &'static str,
}

/// The per-distro capability set
#[async_trait]
pub trait DistroBackend: Send + Sync {
    /// Constant data for this distro.
    fn config(&self) -> &DistroConfig;

    /// Builder base: the distro image with the minimal build toolchain
    /// installed. A pure function of the config, so the engine can cache
    /// it.
    fn base(&self) -> State {
        let config = self.config();
        let packages: Vec<String> = config
            .builder_packages
            .iter()
            .map(ToString::to_string)
            .collect();
        State::image(config.image_ref)
            .run(self.install("/", &packages, false))
            .root()
    }

    /// Build a package-manager invocation installing `packages` into
    /// `root`. An empty `root` targets the filesystem root; an empty
    /// package list is legal. Packages are joined in the order given.
    /// The directive carries the distro's persistent, locked cache
    /// mount rooted under `root`.
    fn install(&self, root: &str, packages: &[String], skip_gpg: bool) -> RunDirective;

    /// Build an invocation installing locally built package files from
    /// `pkg_dir` into `root`. Runtime dependencies are expected to be
    /// installed into `root` already. The Debian-family default unpacks
    /// with dpkg; RPM distros override.
    fn install_local(&self, root: &str, pkg_dir: &str) -> RunDirective {
        let root = if root.is_empty() { "/" } else { root };
        RunDirective::shell(format!("set -x; dpkg --root={root} -i {pkg_dir}/*.deb"))
    }

    /// Resolve the distro's minimal output image reference and decode
    /// its config. Failure is fatal to the container pipeline; there is
    /// no silent fallback.
    async fn default_image_config(
        &self,
        resolver: &dyn ImageMetaResolver,
    ) -> Result<ImageConfig> {
        let reference = self.config().default_output_image;
        let bytes = resolver.resolve_image_config(reference, None).await?;
        let config = serde_json::from_slice(&bytes).map_err(|e| ImageError::ConfigDecode {
            reference: reference.to_string(),
            message: e.to_string(),
        })?;
        Ok(config)
    }
}

/// Join `root` and a path below it without doubling separators.
pub(crate) fn join_root(root: &str, sub: &str) -> String {
    format!("{}/{}", root.trim_end_matches('/'), sub)
}

/// Shared apt invocation used by the Debian-family backends. Caches for
/// `/var/cache/apt` and `/var/lib/apt` are keyed by `cache_prefix` and
/// locked, so concurrent installs against the same distro serialize.
pub(crate) fn apt_install(
    cache_prefix: &str,
    root: &str,
    packages: &[String],
    skip_gpg: bool,
) -> RunDirective {
    let root = if root.is_empty() { "/" } else { root };

    let mut command = String::from("apt-get update && apt-get install -y");
    if skip_gpg {
        command.push_str(" --allow-unauthenticated");
    }
    if root != "/" {
        command.push_str(&format!(" -o RootDir={root}"));
    }
    for package in packages {
        command.push(' ');
        command.push_str(package);
    }

    RunDirective::shell(command)
        .with_cache_mount(
            join_root(root, "var/cache/apt"),
            format!("{cache_prefix}-var-cache-apt"),
            pakket_graph::CacheSharing::Locked,
        )
        .with_cache_mount(
            join_root(root, "var/lib/apt"),
            format!("{cache_prefix}-var-lib-apt"),
            pakket_graph::CacheSharing::Locked,
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pakket_graph::CacheSharing;

    fn pkgs(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn install_defaults_root_and_honors_skip_gpg() {
        let backend = Mariner2::new();
        let directive = backend.install("", &pkgs(&["a", "b"]), true);
        let command = directive.args.last().unwrap();
        assert!(command.contains("--installroot=/"));
        assert!(command.contains("--nogpgcheck"));
        assert!(command.ends_with("a b"));
    }

    #[test]
    fn install_without_skip_gpg_has_no_flag() {
        let backend = Mariner2::new();
        let directive = backend.install("", &[], false);
        let command = directive.args.last().unwrap();
        assert!(!command.contains("--nogpgcheck"));
    }

    #[test]
    fn install_cache_mount_is_locked_and_rooted() {
        let backend = Mariner2::new();
        let directive = backend.install("/target", &pkgs(&["a"]), false);
        let cache = &directive.cache_mounts[0];
        assert_eq!(cache.target, "/target/var/cache/tdnf");
        assert_eq!(cache.key, "mariner2-tdnf-cache");
        assert_eq!(cache.sharing, CacheSharing::Locked);
    }

    #[test]
    fn apt_install_attaches_both_apt_caches() {
        let directive = apt_install("jammy", "", &pkgs(&["curl"]), false);
        let keys: Vec<&str> = directive
            .cache_mounts
            .iter()
            .map(|c| c.key.as_str())
            .collect();
        assert_eq!(keys, vec!["jammy-var-cache-apt", "jammy-var-lib-apt"]);
        assert!(directive.args.last().unwrap().ends_with("curl"));
    }

    #[test]
    fn base_installs_the_builder_toolchain() {
        let backend = Jammy::new();
        let base = backend.base();
        let pakket_graph::Node::Exec { directive, .. } = base.node() else {
            panic!("expected exec node");
        };
        let command = directive.args.last().unwrap();
        for package in backend.config().builder_packages {
            assert!(command.contains(package), "missing {package}");
        }
    }
}
