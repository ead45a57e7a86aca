//! Debian packaging pipeline
//!
//! Synthesizes the debian/ packaging directory from the package
//! declaration, then runs dpkg-buildpackage (binary .deb) or
//! dpkg-source (source package) over the captured build artifacts.

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use pakket_errors::Result;
use pakket_graph::{RunDirective, State};
use pakket_types::PackageSpec;

use crate::assemble::{build_binaries, OUTPUT_DIR};
use crate::distro::DistroBackend;
use crate::target::{CompileOutput, CompileRequest, PipelineHandler};

/// Package tree root inside the packaging run
pub const DEB_BUILD_DIR: &str = "/build/pkg";

/// Fixed changelog timestamp so the source package is reproducible
const CHANGELOG_DATE: &str = "Mon, 01 Jan 2024 00:00:00 +0000";

fn base_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// The package version string: upstream version plus the revision as the
/// Debian revision when one is declared.
#[must_use]
pub fn deb_version(spec: &PackageSpec) -> String {
    if spec.revision.is_empty() {
        spec.version.clone()
    } else {
        format!("{}-{}", spec.version, spec.revision)
    }
}

/// Synthesize debian/control.
#[must_use]
pub fn synthesize_control(spec: &PackageSpec, target_key: &str) -> String {
    let mut buf = String::new();
    let _ = writeln!(buf, "Source: {}", spec.name);
    buf.push_str("Section: utils\n");
    buf.push_str("Priority: optional\n");
    buf.push_str("Standards-Version: 4.6.0\n");
    buf.push_str("Maintainer: pakket <pakket@localhost>\n");
    buf.push_str("Build-Depends: debhelper-compat (= 13)\n");
    if !spec.website.is_empty() {
        let _ = writeln!(buf, "Homepage: {}", spec.website);
    }
    buf.push('\n');
    let _ = writeln!(buf, "Package: {}", spec.name);
    buf.push_str("Architecture: any\n");
    let mut runtime = spec.runtime_deps(target_key);
    runtime.sort();
    if !runtime.is_empty() {
        let _ = writeln!(buf, "Depends: {}", runtime.join(", "));
    }
    let _ = writeln!(buf, "Description: {}", spec.description);
    buf
}

/// Synthesize debian/changelog with a fixed timestamp.
#[must_use]
pub fn synthesize_changelog(spec: &PackageSpec) -> String {
    format!(
        "{name} ({version}) jammy; urgency=medium\n\n  * Build of {name} {version}.\n\n -- pakket <pakket@localhost>  {CHANGELOG_DATE}\n",
        name = spec.name,
        version = deb_version(spec),
    )
}

/// Synthesize debian/rules. The build already happened upstream, so the
/// auto build and test steps are stubbed out and install copies the
/// captured artifacts into place.
#[must_use]
pub fn synthesize_rules(spec: &PackageSpec) -> String {
    let mut buf = String::new();
    buf.push_str("#!/usr/bin/make -f\n\n");
    buf.push_str("%:\n\tdh $@\n\n");
    buf.push_str("override_dh_auto_build:\n\n");
    buf.push_str("override_dh_auto_test:\n\n");
    buf.push_str("override_dh_auto_install:\n");

    let root = format!("debian/{}", spec.name);
    let mut lines: Vec<String> = Vec::new();

    for (key, artifact) in &spec.artifacts.binaries {
        let mut dest = format!("{root}/usr/bin");
        if !artifact.sub_path.is_empty() {
            let _ = write!(dest, "/{}", artifact.sub_path);
        }
        let _ = write!(dest, "/{}", artifact.resolve_name(key));
        lines.push(format!("install -D -m 0755 {} {dest}", base_name(key)));
    }

    if let Some(systemd) = &spec.artifacts.systemd {
        if !systemd.units.is_empty() {
            lines.push(format!("mkdir -p {root}/lib/systemd/system-preset"));
        }
        for (key, unit) in &systemd.units {
            let name = unit.resolve_name(key);
            lines.push(format!(
                "install -D -m 0644 {} {root}/lib/systemd/system/{name}",
                base_name(key),
            ));
            let preset = if unit.enable { "enable" } else { "disable" };
            lines.push(format!(
                "echo '{preset} {name}' >> {root}/lib/systemd/system-preset/50-{}.preset",
                spec.name,
            ));
        }
        for (key, dropin) in &systemd.dropins {
            lines.push(format!(
                "install -D -m 0644 {} {root}/lib/systemd/system/{}.d/{}",
                base_name(key),
                dropin.unit,
                dropin.resolve_name(key),
            ));
        }
    }

    for line in &lines {
        let _ = writeln!(buf, "\t{line}");
    }

    buf
}

/// The debian/ packaging directory as a mountable state.
#[must_use]
pub fn debian_dir_state(spec: &PackageSpec, target_key: &str) -> State {
    State::merge(vec![
        State::file("control", synthesize_control(spec, target_key), 0o644),
        State::file("changelog", synthesize_changelog(spec), 0o644),
        State::file("rules", synthesize_rules(spec), 0o755),
        State::file("source/format", "1.0\n", 0o644),
    ])
}

/// Run Debian packaging over the captured `artifacts`. `source_only`
/// selects dpkg-source (.dsc plus tarball) over dpkg-buildpackage
/// (.deb).
#[must_use]
pub fn build_deb(
    backend: &dyn DistroBackend,
    spec: &PackageSpec,
    artifacts: State,
    source_only: bool,
) -> State {
    let command = if source_only {
        format!("set -ex; dpkg-source --build . && mv ../*.dsc ../*.tar.* {OUTPUT_DIR}")
    } else {
        format!("set -ex; dpkg-buildpackage -b -us -uc && mv ../*.deb {OUTPUT_DIR}")
    };

    backend
        .base()
        .run(
            RunDirective::shell(command)
                .with_dir(DEB_BUILD_DIR)
                .with_mount(DEB_BUILD_DIR, artifacts)
                .with_mount(
                    format!("{DEB_BUILD_DIR}/debian"),
                    debian_dir_state(spec, backend.config().target_key),
                ),
        )
        .capture(OUTPUT_DIR)
}

/// Pipeline producing a binary .deb
pub struct DebTarget {
    backend: Arc<dyn DistroBackend>,
}

impl DebTarget {
    #[must_use]
    pub fn new(backend: Arc<dyn DistroBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl PipelineHandler for DebTarget {
    async fn handle(&self, req: &CompileRequest<'_>) -> Result<CompileOutput> {
        let target_key = self.backend.config().target_key;
        debug!(package = %req.spec.name, target = target_key, "compiling deb target");

        let artifacts = build_binaries(
            self.backend.as_ref(),
            req.spec,
            target_key,
            req.signer,
            &req.source_options,
        )
        .await?;

        Ok(CompileOutput {
            state: build_deb(self.backend.as_ref(), req.spec, artifacts, false),
            image: None,
        })
    }
}

/// Pipeline producing a Debian source package (.dsc)
pub struct DscTarget {
    backend: Arc<dyn DistroBackend>,
}

impl DscTarget {
    #[must_use]
    pub fn new(backend: Arc<dyn DistroBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl PipelineHandler for DscTarget {
    async fn handle(&self, req: &CompileRequest<'_>) -> Result<CompileOutput> {
        let target_key = self.backend.config().target_key;
        debug!(package = %req.spec.name, target = target_key, "compiling dsc target");

        let artifacts = build_binaries(
            self.backend.as_ref(),
            req.spec,
            target_key,
            req.signer,
            &req.source_options,
        )
        .await?;

        Ok(CompileOutput {
            state: build_deb(self.backend.as_ref(), req.spec, artifacts, true),
            image: None,
        })
    }
}
