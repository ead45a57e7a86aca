//! Spec validation
//!
//! Run once before compilation; every later stage may assume a validated
//! spec. Source-name uniqueness is structural (the spec holds sources in
//! a map), so validation covers the constraints the type system cannot.

use pakket_errors::{Error, SpecError};

use crate::package::PackageSpec;

/// Reserved name for the generated go module cache pseudo-source.
/// Declared sources must not collide with it and it is never patchable.
pub const GOMODS_SOURCE_NAME: &str = "__gomods";

/// Validate `spec` against the constraints the data model cannot express.
///
/// # Errors
///
/// Returns the first violation found: missing package name, a source name
/// colliding with a reserved generated name, patches aimed at unknown or
/// reserved sources, gomod declarations naming unknown sources, or
/// malformed systemd unit names.
pub fn validate(spec: &PackageSpec) -> Result<(), Error> {
    if spec.name.is_empty() {
        return Err(SpecError::MissingName.into());
    }

    if spec.sources.contains_key(GOMODS_SOURCE_NAME) {
        return Err(SpecError::ReservedSourceName {
            name: GOMODS_SOURCE_NAME.to_string(),
        }
        .into());
    }

    for (target, patches) in &spec.patches {
        if target == GOMODS_SOURCE_NAME {
            return Err(SpecError::PatchOnGeneratedSource {
                name: target.clone(),
                path: String::new(),
            }
            .into());
        }
        if !spec.sources.contains_key(target) {
            return Err(SpecError::UnknownPatchSource {
                name: target.clone(),
            }
            .into());
        }
        for patch in patches {
            if !spec.sources.contains_key(&patch.source) {
                return Err(SpecError::UnknownPatchSource {
                    name: patch.source.clone(),
                }
                .into());
            }
        }
    }

    if let Some(gomods) = &spec.build.gomods {
        for source in &gomods.sources {
            match spec.sources.get(source) {
                Some(decl) if decl.is_dir() => {}
                Some(_) | None => {
                    return Err(SpecError::UnknownGomodSource {
                        name: source.clone(),
                    }
                    .into());
                }
            }
        }
    }

    if let Some(systemd) = &spec.artifacts.systemd {
        for (key, unit) in &systemd.units {
            // the default name is the key's basename, so only an explicit
            // name can smuggle in a path separator
            if unit.name.contains('/') {
                return Err(SpecError::InvalidUnitName {
                    name: unit.name.clone(),
                    reason: "nested paths are not supported".to_string(),
                }
                .into());
            }
            if unit.resolve_name(key).is_empty() {
                return Err(SpecError::InvalidUnitName {
                    name: key.clone(),
                    reason: "resolved name is empty".to_string(),
                }
                .into());
            }
        }
        for (key, dropin) in &systemd.dropins {
            if dropin.unit.is_empty() {
                return Err(SpecError::DropinMissingUnit { name: key.clone() }.into());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::package::{GomodConfig, PatchSpec, Source};
    use crate::systemd::{SystemdConfiguration, SystemdDropinConfig, SystemdUnitConfig};

    fn minimal_spec() -> PackageSpec {
        PackageSpec {
            name: "demo".to_string(),
            ..PackageSpec::default()
        }
    }

    fn git_source() -> Source {
        Source::Git {
            url: "https://example.com/repo.git".to_string(),
            commit: "main".to_string(),
            keep_git_dir: false,
        }
    }

    #[test]
    fn empty_name_is_rejected() {
        let err = validate(&PackageSpec::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::Spec(SpecError::MissingName)
        ));
    }

    #[test]
    fn reserved_source_name_is_rejected() {
        let mut spec = minimal_spec();
        spec.sources
            .insert(GOMODS_SOURCE_NAME.to_string(), git_source());
        let err = validate(&spec).unwrap_err();
        assert!(matches!(
            err,
            Error::Spec(SpecError::ReservedSourceName { .. })
        ));
    }

    #[test]
    fn patch_must_reference_declared_sources() {
        let mut spec = minimal_spec();
        spec.sources.insert("src".to_string(), git_source());
        spec.patches.insert(
            "src".to_string(),
            vec![PatchSpec {
                source: "missing".to_string(),
                path: String::new(),
                strip: 1,
            }],
        );
        let err = validate(&spec).unwrap_err();
        assert!(matches!(
            err,
            Error::Spec(SpecError::UnknownPatchSource { .. })
        ));
    }

    #[test]
    fn generated_source_is_not_patchable() {
        let mut spec = minimal_spec();
        spec.patches
            .insert(GOMODS_SOURCE_NAME.to_string(), vec![]);
        let err = validate(&spec).unwrap_err();
        assert!(matches!(
            err,
            Error::Spec(SpecError::PatchOnGeneratedSource { .. })
        ));
    }

    #[test]
    fn gomods_require_declared_directory_sources() {
        let mut spec = minimal_spec();
        spec.build.gomods = Some(GomodConfig {
            sources: vec!["src".to_string()],
        });
        let err = validate(&spec).unwrap_err();
        assert!(matches!(
            err,
            Error::Spec(SpecError::UnknownGomodSource { .. })
        ));

        spec.sources.insert("src".to_string(), git_source());
        validate(&spec).unwrap();
    }

    #[test]
    fn unit_name_must_stay_flat() {
        let mut spec = minimal_spec();
        let mut units = BTreeMap::new();
        units.insert(
            "contrib/demo.service".to_string(),
            SystemdUnitConfig {
                name: "sub/dir.service".to_string(),
                enable: false,
            },
        );
        spec.artifacts.systemd = Some(SystemdConfiguration {
            units,
            dropins: BTreeMap::new(),
        });
        let err = validate(&spec).unwrap_err();
        assert!(matches!(
            err,
            Error::Spec(SpecError::InvalidUnitName { .. })
        ));
    }

    #[test]
    fn dropin_needs_owning_unit() {
        let mut spec = minimal_spec();
        let mut dropins = BTreeMap::new();
        dropins.insert(
            "override.conf".to_string(),
            SystemdDropinConfig::default(),
        );
        spec.artifacts.systemd = Some(SystemdConfiguration {
            units: BTreeMap::new(),
            dropins,
        });
        let err = validate(&spec).unwrap_err();
        assert!(matches!(
            err,
            Error::Spec(SpecError::DropinMissingUnit { .. })
        ));
    }
}
