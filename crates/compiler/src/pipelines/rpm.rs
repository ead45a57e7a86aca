//! RPM packaging pipeline
//!
//! Synthesizes an rpm spec file from the package declaration and runs
//! rpmbuild over the captured build artifacts. Produces both the binary
//! rpm and the src.rpm under RPMS/ and SRPMS/.

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

/// rpmbuild topdir inside the packaging run
pub const RPM_TOPDIR: &str = "/build/rpm";

fn base_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Synthesize the rpm spec file for `spec`.
///
/// Artifacts are installed out of `%{_sourcedir}`, where the captured
/// build output is mounted. Systemd units get preset entries reflecting
/// their declared enable flag plus the standard scriptlets.
#[must_use]
pub fn synthesize_rpm_spec(spec: &PackageSpec, target_key: &str) -> String {
    let mut buf = String::new();

    let _ = writeln!(buf, "Name: {}", spec.name);
    let _ = writeln!(buf, "Version: {}", spec.version);
    let _ = writeln!(buf, "Release: {}%{{?dist}}", spec.revision);
    let _ = writeln!(buf, "Summary: {}", spec.description);
    if !spec.license.is_empty() {
        let _ = writeln!(buf, "License: {}", spec.license);
    }
    if !spec.website.is_empty() {
        let _ = writeln!(buf, "URL: {}", spec.website);
    }
    let mut runtime = spec.runtime_deps(target_key);
    runtime.sort();
    for dep in &runtime {
        let _ = writeln!(buf, "Requires: {dep}");
    }

    let _ = writeln!(buf, "\n%description\n{}", spec.description);

    let mut files: Vec<String> = Vec::new();

    buf.push_str("\n%install\n");
    for (key, artifact) in &spec.artifacts.binaries {
        let mut dest = String::from("%{_bindir}");
        if !artifact.sub_path.is_empty() {
            let _ = write!(dest, "/{}", artifact.sub_path);
        }
        let _ = write!(dest, "/{}", artifact.resolve_name(key));
        let _ = writeln!(
            buf,
            "install -D -m 0755 %{{_sourcedir}}/{} %{{buildroot}}{dest}",
            base_name(key),
        );
        files.push(dest);
    }

    let mut enabled: Vec<String> = Vec::new();
    let mut disabled: Vec<String> = Vec::new();
    if let Some(systemd) = &spec.artifacts.systemd {
        for (key, unit) in &systemd.units {
            let name = unit.resolve_name(key);
            let dest = format!("%{{_unitdir}}/{name}");
            let _ = writeln!(
                buf,
                "install -D -m 0644 %{{_sourcedir}}/{} %{{buildroot}}{dest}",
                base_name(key),
            );
            files.push(dest);
            if unit.enable {
                enabled.push(name);
            } else {
                disabled.push(name);
            }
        }
        for (key, dropin) in &systemd.dropins {
            let dest = format!(
                "%{{_unitdir}}/{}.d/{}",
                dropin.unit,
                dropin.resolve_name(key),
            );
            let _ = writeln!(
                buf,
                "install -D -m 0644 %{{_sourcedir}}/{} %{{buildroot}}{dest}",
                base_name(key),
            );
            files.push(dest);
        }
    }

    if !enabled.is_empty() || !disabled.is_empty() {
        let preset = format!("%{{_presetdir}}/50-{}.preset", spec.name);
        buf.push_str("mkdir -p %{buildroot}%{_presetdir}\n");
        for name in &enabled {
            let _ = writeln!(buf, "echo 'enable {name}' >> %{{buildroot}}{preset}");
        }
        for name in &disabled {
            let _ = writeln!(buf, "echo 'disable {name}' >> %{{buildroot}}{preset}");
        }
        files.push(preset);

        let units: Vec<String> = enabled.iter().chain(&disabled).cloned().collect();
        let joined = units.join(" ");
        let _ = writeln!(buf, "\n%post\n%systemd_post {joined}");
        let _ = writeln!(buf, "\n%preun\n%systemd_preun {joined}");
        let _ = writeln!(buf, "\n%postun\n%systemd_postun_with_restart {joined}");
    }

    buf.push_str("\n%files\n");
    for file in &files {
        let _ = writeln!(buf, "{file}");
    }

    buf
}

/// Run rpmbuild over the captured `artifacts` and capture RPMS/SRPMS.
#[must_use]
pub fn build_rpm(backend: &dyn DistroBackend, spec: &PackageSpec, artifacts: State) -> State {
    let spec_file = State::file(
        format!("{}.spec", spec.name),
        synthesize_rpm_spec(spec, backend.config().target_key),
        0o644,
    );

    let command = format!(
        "set -x; rpmbuild -ba --define '_topdir {RPM_TOPDIR}' {RPM_TOPDIR}/SPECS/{name}.spec && cp -r {RPM_TOPDIR}/RPMS {RPM_TOPDIR}/SRPMS {OUTPUT_DIR}",
        name = spec.name,
    );

    backend
        .base()
        .run(
            RunDirective::shell(command)
                .with_readonly_mount(format!("{RPM_TOPDIR}/SOURCES"), artifacts)
                .with_readonly_mount(format!("{RPM_TOPDIR}/SPECS"), spec_file),
        )
        .capture(OUTPUT_DIR)
}

/// Pipeline producing an rpm and src.rpm
pub struct RpmTarget {
    backend: Arc<dyn DistroBackend>,
}

impl RpmTarget {
    #[must_use]
    pub fn new(backend: Arc<dyn DistroBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl PipelineHandler for RpmTarget {
    async fn handle(&self, req: &CompileRequest<'_>) -> Result<CompileOutput> {
        let target_key = self.backend.config().target_key;
        debug!(package = %req.spec.name, target = target_key, "compiling rpm target");

        let artifacts = build_binaries(
            self.backend.as_ref(),
            req.spec,
            target_key,
            req.signer,
            &req.source_options,
        )
        .await?;

        Ok(CompileOutput {
            state: build_rpm(self.backend.as_ref(), req.spec, artifacts),
            image: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use pakket_types::{
        ArtifactConfig, SystemdConfiguration, SystemdDropinConfig, SystemdUnitConfig,
    };

    fn demo_spec() -> PackageSpec {
        let mut spec = PackageSpec {
            name: "demo".to_string(),
            version: "1.2.3".to_string(),
            revision: "4".to_string(),
            description: "A demo package".to_string(),
            license: "MIT".to_string(),
            ..PackageSpec::default()
        };
        spec.artifacts.binaries.insert(
            "bin/demo".to_string(),
            ArtifactConfig::default(),
        );
        spec
    }

    #[test]
    fn preamble_carries_the_package_identity() {
        let text = synthesize_rpm_spec(&demo_spec(), "mariner2");
        assert!(text.contains("Name: demo\n"));
        assert!(text.contains("Version: 1.2.3\n"));
        assert!(text.contains("Release: 4%{?dist}\n"));
        assert!(text.contains("License: MIT\n"));
    }

    #[test]
    fn binaries_install_from_sourcedir_and_are_listed() {
        let mut spec = demo_spec();
        spec.artifacts.binaries.insert(
            "out/tool".to_string(),
            ArtifactConfig {
                sub_path: "extras".to_string(),
                name: "renamed".to_string(),
            },
        );
        let text = synthesize_rpm_spec(&spec, "mariner2");
        assert!(text
            .contains("install -D -m 0755 %{_sourcedir}/demo %{buildroot}%{_bindir}/demo\n"));
        assert!(text.contains(
            "install -D -m 0755 %{_sourcedir}/tool %{buildroot}%{_bindir}/extras/renamed\n"
        ));
        let files = text.split("%files\n").nth(1).unwrap();
        assert!(files.contains("%{_bindir}/demo\n"));
        assert!(files.contains("%{_bindir}/extras/renamed\n"));
    }

    #[test]
    fn runtime_deps_become_requires_lines_sorted() {
        let mut spec = demo_spec();
        spec.dependencies = Some(pakket_types::PackageDependencies {
            build: vec![],
            runtime: vec!["zlib".to_string(), "bash".to_string()],
        });
        let text = synthesize_rpm_spec(&spec, "mariner2");
        let bash = text.find("Requires: bash\n").unwrap();
        let zlib = text.find("Requires: zlib\n").unwrap();
        assert!(bash < zlib);
    }

    #[test]
    fn units_get_presets_and_scriptlets() {
        let mut spec = demo_spec();
        let mut units = BTreeMap::new();
        units.insert(
            "contrib/demo.service".to_string(),
            SystemdUnitConfig {
                name: String::new(),
                enable: true,
            },
        );
        let mut dropins = BTreeMap::new();
        dropins.insert(
            "contrib/override.conf".to_string(),
            SystemdDropinConfig {
                name: String::new(),
                unit: "demo.service".to_string(),
            },
        );
        spec.artifacts.systemd = Some(SystemdConfiguration { units, dropins });

        let text = synthesize_rpm_spec(&spec, "mariner2");
        assert!(text.contains("echo 'enable demo.service' >> %{buildroot}%{_presetdir}/50-demo.preset\n"));
        assert!(text.contains("%{buildroot}%{_unitdir}/demo.service\n"));
        assert!(text.contains("%{buildroot}%{_unitdir}/demo.service.d/override.conf\n"));
        assert!(text.contains("%post\n%systemd_post demo.service\n"));
        assert!(text.contains("%preun\n%systemd_preun demo.service\n"));
    }

    #[test]
    fn disabled_units_write_disable_presets() {
        let mut spec = demo_spec();
        let mut units = BTreeMap::new();
        units.insert(
            "demo.timer".to_string(),
            SystemdUnitConfig {
                name: String::new(),
                enable: false,
            },
        );
        spec.artifacts.systemd = Some(SystemdConfiguration {
            units,
            dropins: BTreeMap::new(),
        });
        let text = synthesize_rpm_spec(&spec, "mariner2");
        assert!(text.contains("echo 'disable demo.timer'"));
        assert!(!text.contains("echo 'enable"));
    }

    #[test]
    fn build_rpm_mounts_sources_and_spec_readonly() {
        let backend = crate::distro::Mariner2::new();
        let artifacts = State::scratch();
        let state = build_rpm(&backend, &demo_spec(), artifacts);
        let pakket_graph::Node::Exec { directive, .. } = state.node() else {
            panic!("expected exec node");
        };
        let targets: Vec<&str> = directive.mounts.iter().map(|m| m.target.as_str()).collect();
        assert_eq!(targets, vec!["/build/rpm/SOURCES", "/build/rpm/SPECS"]);
        assert!(directive.mounts.iter().all(|m| m.readonly));
        assert!(directive.args.last().unwrap().contains("rpmbuild -ba"));
    }
}
