//! CBL-Mariner 2.0 backend (RPM family, tdnf)

use async_trait::async_trait;

use pakket_graph::{CacheSharing, RunDirective};

use super::{join_root, DistroBackend, DistroConfig};

const CONFIG: DistroConfig = DistroConfig {
    full_name: "CBL-Mariner 2.0",
    target_key: "mariner2",
    image_ref: "mcr.microsoft.com/cbl-mariner/base/core:2.0",
    context_ref: "mcr.microsoft.com/cbl-mariner/base/core:2.0",
    release_ver: "2.0",
    builder_packages: &[
        "rpm-build",
        "mariner-rpm-macros",
        "build-essential",
        "ca-certificates",
    ],
    base_packages: &["distroless-packages-minimal", "prebuilt-ca-certificates"],
    default_output_image: "mcr.microsoft.com/cbl-mariner/distroless/base:2.0",
    cache_key: "mariner2-tdnf-cache",
};

const TDNF_CACHE_DIR: &str = "var/cache/tdnf";

/// The mariner2 distro backend
#[derive(Debug, Clone, Copy, Default)]
pub struct Mariner2;

impl Mariner2 {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DistroBackend for Mariner2 {
    fn config(&self) -> &DistroConfig {
        &CONFIG
    }

    fn install(&self, root: &str, packages: &[String], skip_gpg: bool) -> RunDirective {
        let root = if root.is_empty() { "/" } else { root };
        let gpg_check_flag = if skip_gpg { "--nogpgcheck" } else { "" };

        let command = format!(
            "set -x; tdnf install -y {gpg_check_flag} --setopt=reposdir=/etc/yum.repos.d --installroot={root} --releasever={release} {packages}",
            release = CONFIG.release_ver,
            packages = packages.join(" "),
        );

        RunDirective::shell(command).with_cache_mount(
            join_root(root, TDNF_CACHE_DIR),
            CONFIG.cache_key,
            CacheSharing::Locked,
        )
    }

    fn install_local(&self, root: &str, pkg_dir: &str) -> RunDirective {
        let root = if root.is_empty() { "/" } else { root };
        let command = format!(
            "set -x; tdnf install -y --nogpgcheck --setopt=reposdir=/etc/yum.repos.d --installroot={root} --releasever={release} {pkg_dir}/RPMS/*/*.rpm",
            release = CONFIG.release_ver,
        );
        RunDirective::shell(command).with_cache_mount(
            join_root(root, TDNF_CACHE_DIR),
            CONFIG.cache_key,
            CacheSharing::Locked,
        )
    }
}
