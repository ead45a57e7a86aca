//! Ubuntu 22.04 "jammy" backend (Debian family, apt)

use async_trait::async_trait;

use pakket_graph::RunDirective;

use super::{apt_install, DistroBackend, DistroConfig};

const CONFIG: DistroConfig = DistroConfig {
    full_name: "Ubuntu 22.04 (jammy)",
    target_key: "jammy",
    image_ref: "mcr.microsoft.com/mirror/docker/library/ubuntu:jammy",
    context_ref: "mcr.microsoft.com/mirror/docker/library/ubuntu:jammy",
    release_ver: "22.04",
    builder_packages: &[
        "build-essential",
        "ca-certificates",
        "debhelper",
        "dpkg-dev",
        "quilt",
    ],
    base_packages: &["ca-certificates"],
    default_output_image: "mcr.microsoft.com/mirror/docker/library/ubuntu:jammy",
    cache_key: "jammy",
};

/// The jammy distro backend
#[derive(Debug, Clone, Copy, Default)]
pub struct Jammy;

impl Jammy {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DistroBackend for Jammy {
    fn config(&self) -> &DistroConfig {
        &CONFIG
    }

    fn install(&self, root: &str, packages: &[String], skip_gpg: bool) -> RunDirective {
        apt_install(CONFIG.cache_key, root, packages, skip_gpg)
    }
}
