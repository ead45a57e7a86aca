//! Systemd artifact configuration
//!
//! Units are placed flat at the root of the package's unit directory;
//! drop-ins are always nested under `<unit>.d` regardless of the unit's
//! own type suffix.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::args::expand_args;
use crate::package::ArtifactConfig;
use pakket_errors::SpecError;

/// Systemd units and drop-ins shipped by the package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemdConfiguration {
    /// Units to include in the package, keyed by source file name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub units: BTreeMap<String, SystemdUnitConfig>,

    /// Drop-in files, keyed by source file name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dropins: BTreeMap<String, SystemdDropinConfig>,
}

/// One systemd unit to package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemdUnitConfig {
    /// Name the unit should be copied under. Nested paths are not
    /// supported; the name carries its own extension (.service, .timer,
    /// .socket, ...).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Whether to enable the unit on install. Determines what is written
    /// to the systemd preset file.
    #[serde(default)]
    pub enable: bool,
}

/// One systemd drop-in file to package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemdDropinConfig {
    /// File name to use for the artifact. Empty means keep the key's
    /// base name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// The unit the drop-in belongs to. A unit named `foo.service` maps
    /// to the directory `foo.service.d`.
    pub unit: String,
}

impl SystemdConfiguration {
    /// Expand build args over unit and drop-in names, keys included.
    ///
    /// Builds brand-new maps and returns them as a whole; the receiver is
    /// untouched. Key and value expansion are independent.
    ///
    /// # Errors
    ///
    /// Returns the first expansion failure, whether it came from a key or
    /// a config field.
    pub fn expand_build_args(
        &self,
        args: &BTreeMap<String, String>,
    ) -> Result<Self, SpecError> {
        let mut units = BTreeMap::new();
        for (name, unit) in &self.units {
            let unit = unit.expand_build_args(args)?;
            units.insert(expand_args(name, args)?, unit);
        }

        let mut dropins = BTreeMap::new();
        for (name, dropin) in &self.dropins {
            let dropin = dropin.expand_build_args(args)?;
            dropins.insert(expand_args(name, args)?, dropin);
        }

        Ok(Self { units, dropins })
    }
}

impl SystemdUnitConfig {
    pub(crate) fn expand_build_args(
        &self,
        args: &BTreeMap<String, String>,
    ) -> Result<Self, SpecError> {
        let name = if self.name.is_empty() {
            String::new()
        } else {
            expand_args(&self.name, args)?
        };
        Ok(Self {
            name,
            enable: self.enable,
        })
    }

    #[must_use]
    pub fn artifact(&self) -> ArtifactConfig {
        ArtifactConfig {
            sub_path: String::new(),
            name: self.name.clone(),
        }
    }

    /// Resolve the packaged unit file name for map key `key`.
    #[must_use]
    pub fn resolve_name(&self, key: &str) -> String {
        self.artifact().resolve_name(key)
    }

    /// Resolve a unit name and split it into base name and unit type.
    /// For `foo.socket` this is (`foo`, `socket`).
    #[must_use]
    pub fn split_name(&self, key: &str) -> (String, String) {
        let name = self.resolve_name(key);
        match name.split_once('.') {
            Some((base, suffix)) => (base.to_string(), suffix.to_string()),
            None => (name, String::new()),
        }
    }
}

impl SystemdDropinConfig {
    pub(crate) fn expand_build_args(
        &self,
        args: &BTreeMap<String, String>,
    ) -> Result<Self, SpecError> {
        let name = if self.name.is_empty() {
            String::new()
        } else {
            expand_args(&self.name, args)?
        };
        let unit = if self.unit.is_empty() {
            String::new()
        } else {
            expand_args(&self.unit, args)?
        };
        Ok(Self { name, unit })
    }

    #[must_use]
    pub fn artifact(&self) -> ArtifactConfig {
        ArtifactConfig {
            sub_path: format!("{}.d", self.unit),
            name: self.name.clone(),
        }
    }

    #[must_use]
    pub fn resolve_name(&self, key: &str) -> String {
        self.artifact().resolve_name(key)
    }
}
