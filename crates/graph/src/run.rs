//! Run directives: the executable edges of the graph

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::state::{Node, State};

/// Description of a single command execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunDirective {
    /// Argv of the command to run
    pub args: Vec<String>,

    /// Working directory
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dir: String,

    /// Environment for the command
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    /// Input states mounted into the execution
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mounts: Vec<Mount>,

    /// Persistent cache mounts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cache_mounts: Vec<CacheMount>,

    /// Network policy for the execution
    #[serde(default)]
    pub network: NetworkMode,
}

/// One mounted input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mount {
    pub target: String,
    pub source: State,
    #[serde(default)]
    pub readonly: bool,
}

/// A persistent cache mount, keyed by a stable distro-scoped name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMount {
    pub target: String,
    pub key: String,
    pub sharing: CacheSharing,
}

/// Concurrency policy for a cache mount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheSharing {
    /// Concurrent readers and writers
    Shared,
    /// One execution at a time; others wait, never corrupt
    Locked,
    /// Every execution gets its own copy
    Private,
}

/// Network policy for one execution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
    /// Engine default (sandboxed network available)
    #[default]
    Default,
    /// No network access at all
    None,
}

impl RunDirective {
    /// A directive running `command` through the shell.
    #[must_use]
    pub fn shell(command: impl Into<String>) -> Self {
        Self {
            args: vec![
                "/bin/sh".to_string(),
                "-c".to_string(),
                command.into(),
            ],
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_dir(mut self, dir: impl Into<String>) -> Self {
        self.dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_mount(mut self, target: impl Into<String>, source: State) -> Self {
        self.mounts.push(Mount {
            target: target.into(),
            source,
            readonly: false,
        });
        self
    }

    #[must_use]
    pub fn with_readonly_mount(mut self, target: impl Into<String>, source: State) -> Self {
        self.mounts.push(Mount {
            target: target.into(),
            source,
            readonly: true,
        });
        self
    }

    #[must_use]
    pub fn with_cache_mount(
        mut self,
        target: impl Into<String>,
        key: impl Into<String>,
        sharing: CacheSharing,
    ) -> Self {
        self.cache_mounts.push(CacheMount {
            target: target.into(),
            key: key.into(),
            sharing,
        });
        self
    }

    #[must_use]
    pub fn with_network(mut self, network: NetworkMode) -> Self {
        self.network = network;
        self
    }
}

/// What an execution node yields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecOutput {
    /// The root filesystem after the command ran
    Root,
    /// The contents of one designated output directory
    Capture { dir: String },
}

/// A pending execution; finish it with [`ExecState::root`] or
/// [`ExecState::capture`].
#[derive(Debug, Clone)]
pub struct ExecState {
    base: State,
    directive: RunDirective,
}

impl ExecState {
    pub(crate) fn new(base: State, directive: RunDirective) -> Self {
        Self { base, directive }
    }

    /// The root filesystem after the command ran.
    #[must_use]
    pub fn root(self) -> State {
        State::new(Node::Exec {
            base: self.base,
            directive: self.directive,
            output: ExecOutput::Root,
        })
    }

    /// Capture the contents of `dir` after the command ran as this
    /// execution's result state. When one of the directive's mounts
    /// targets `dir`, the captured state is that mount as modified by
    /// the command; otherwise `dir` starts empty.
    #[must_use]
    pub fn capture(self, dir: impl Into<String>) -> State {
        State::new(Node::Exec {
            base: self.base,
            directive: self.directive,
            output: ExecOutput::Capture { dir: dir.into() },
        })
    }
}
