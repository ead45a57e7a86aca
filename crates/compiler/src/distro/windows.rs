//! Windows cross-compile worker backend
//!
//! Builds run on a jammy worker carrying the mingw-w64 toolchain; output
//! containers are based on nanoserver.

use async_trait::async_trait;

use pakket_graph::RunDirective;

use super::{apt_install, DistroBackend, DistroConfig};

const CONFIG: DistroConfig = DistroConfig {
    full_name: "Windows cross-compile (jammy worker)",
    target_key: "windowscross",
    image_ref: "mcr.microsoft.com/mirror/docker/library/ubuntu:jammy",
    context_ref: "mcr.microsoft.com/mirror/docker/library/ubuntu:jammy",
    release_ver: "22.04",
    builder_packages: &[
        "binutils-mingw-w64",
        "build-essential",
        "g++-mingw-w64-x86-64",
        "gcc",
        "git",
        "make",
        "pkg-config",
        "quilt",
        "zip",
    ],
    base_packages: &[],
    default_output_image: "mcr.microsoft.com/windows/nanoserver:ltsc2022",
    cache_key: "jammy-windowscross",
};

/// The windows cross-compile worker backend
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsWorker;

impl WindowsWorker {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DistroBackend for WindowsWorker {
    fn config(&self) -> &DistroConfig {
        &CONFIG
    }

    fn install(&self, root: &str, packages: &[String], skip_gpg: bool) -> RunDirective {
        apt_install(CONFIG.cache_key, root, packages, skip_gpg)
    }
}
