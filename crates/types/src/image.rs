//! Container image config model
//!
//! [`ImageConfig`] follows the registry wire shape so a resolved base
//! config decodes directly; [`ImageOverride`] carries the spec-declared
//! fields that replace base fields field-by-field.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Target platform for image resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub os: String,
    pub architecture: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub variant: String,
}

impl Platform {
    #[must_use]
    pub fn new(os: impl Into<String>, architecture: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            architecture: architecture.into(),
            variant: String::new(),
        }
    }

    /// Platform of the host running the compiler.
    #[must_use]
    pub fn host() -> Self {
        let architecture = match std::env::consts::ARCH {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            other => other,
        };
        Self::new("linux", architecture)
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::host()
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.variant.is_empty() {
            write!(f, "{}/{}", self.os, self.architecture)
        } else {
            write!(f, "{}/{}/{}", self.os, self.architecture, self.variant)
        }
    }
}

/// Container image config in the registry wire shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub architecture: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub os: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub variant: String,

    /// Runtime configuration attached to the image
    #[serde(default)]
    pub config: RuntimeConfig,
}

/// Runtime configuration fields (the `config` object of an image config)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default, rename = "Env", skip_serializing_if = "Option::is_none")]
    pub env: Option<Vec<String>>,

    #[serde(default, rename = "Entrypoint", skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<Vec<String>>,

    #[serde(default, rename = "Cmd", skip_serializing_if = "Option::is_none")]
    pub cmd: Option<Vec<String>>,

    #[serde(default, rename = "WorkingDir", skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,

    #[serde(default, rename = "User", skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(default, rename = "Labels", skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,

    #[serde(default, rename = "Volumes", skip_serializing_if = "Option::is_none")]
    pub volumes: Option<BTreeMap<String, serde_json::Value>>,

    #[serde(default, rename = "StopSignal", skip_serializing_if = "Option::is_none")]
    pub stop_signal: Option<String>,
}

/// Spec-declared image config overrides for one target
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmd: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volumes: Option<BTreeMap<String, serde_json::Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_signal: Option<String>,
}

impl ImageConfig {
    /// Minimal config for `platform`, used when a target names no base
    /// output image.
    #[must_use]
    pub fn default_for_platform(platform: &Platform) -> Self {
        Self {
            architecture: platform.architecture.clone(),
            os: platform.os.clone(),
            variant: platform.variant.clone(),
            config: RuntimeConfig {
                env: Some(vec![
                    "PATH=/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin"
                        .to_string(),
                ]),
                ..RuntimeConfig::default()
            },
        }
    }

    /// Apply spec-declared overrides field-by-field. Fields the override
    /// leaves unset retain the base value.
    pub fn merge_override(&mut self, over: &ImageOverride) {
        let config = &mut self.config;
        if let Some(env) = &over.env {
            config.env = Some(env.clone());
        }
        if let Some(entrypoint) = &over.entrypoint {
            config.entrypoint = Some(entrypoint.clone());
        }
        if let Some(cmd) = &over.cmd {
            config.cmd = Some(cmd.clone());
        }
        if let Some(working_dir) = &over.working_dir {
            config.working_dir = Some(working_dir.clone());
        }
        if let Some(user) = &over.user {
            config.user = Some(user.clone());
        }
        if let Some(labels) = &over.labels {
            config.labels = Some(labels.clone());
        }
        if let Some(volumes) = &over.volumes {
            config.volumes = Some(volumes.clone());
        }
        if let Some(stop_signal) = &over.stop_signal {
            config.stop_signal = Some(stop_signal.clone());
        }
    }
}
