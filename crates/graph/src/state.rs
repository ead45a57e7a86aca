//! Filesystem state nodes

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use pakket_types::Platform;

use crate::run::{ExecOutput, ExecState, RunDirective};

/// An immutable reference to one filesystem state in the build graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct State(Arc<Node>);

/// The node vocabulary the execution engine understands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    /// Empty filesystem
    Scratch,

    /// Base image pulled by reference
    Image {
        reference: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        platform: Option<Platform>,
    },

    /// Git checkout at a fixed commit
    Git {
        url: String,
        commit: String,
        #[serde(default)]
        keep_git_dir: bool,
    },

    /// Single file fetched over HTTP, stored under `name`
    Http {
        name: String,
        url: String,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        digest: String,
    },

    /// Named build context supplied by the caller
    Context { name: String },

    /// A single file with literal contents
    File {
        name: String,
        contents: String,
        permissions: u32,
    },

    /// Ordered layering of states; later layers win on conflict
    Merge { layers: Vec<State> },

    /// A command execution over a base state
    Exec {
        base: State,
        directive: RunDirective,
        output: ExecOutput,
    },
}

impl State {
    pub(crate) fn new(node: Node) -> Self {
        Self(Arc::new(node))
    }

    #[must_use]
    pub fn scratch() -> Self {
        Self::new(Node::Scratch)
    }

    #[must_use]
    pub fn image(reference: impl Into<String>) -> Self {
        Self::new(Node::Image {
            reference: reference.into(),
            platform: None,
        })
    }

    #[must_use]
    pub fn image_for_platform(reference: impl Into<String>, platform: Platform) -> Self {
        Self::new(Node::Image {
            reference: reference.into(),
            platform: Some(platform),
        })
    }

    #[must_use]
    pub fn git(url: impl Into<String>, commit: impl Into<String>, keep_git_dir: bool) -> Self {
        Self::new(Node::Git {
            url: url.into(),
            commit: commit.into(),
            keep_git_dir,
        })
    }

    /// A state holding one file named `name`, fetched from `url`.
    #[must_use]
    pub fn http(
        name: impl Into<String>,
        url: impl Into<String>,
        digest: impl Into<String>,
    ) -> Self {
        Self::new(Node::Http {
            name: name.into(),
            url: url.into(),
            digest: digest.into(),
        })
    }

    #[must_use]
    pub fn context(name: impl Into<String>) -> Self {
        Self::new(Node::Context { name: name.into() })
    }

    /// A state holding exactly one file.
    #[must_use]
    pub fn file(
        name: impl Into<String>,
        contents: impl Into<String>,
        permissions: u32,
    ) -> Self {
        Self::new(Node::File {
            name: name.into(),
            contents: contents.into(),
            permissions,
        })
    }

    /// Layer `layers` in order onto an empty root; later layers win.
    #[must_use]
    pub fn merge(layers: Vec<State>) -> Self {
        Self::new(Node::Merge { layers })
    }

    /// Begin a command execution over this state.
    #[must_use]
    pub fn run(&self, directive: RunDirective) -> ExecState {
        ExecState::new(self.clone(), directive)
    }

    #[must_use]
    pub fn node(&self) -> &Node {
        &self.0
    }

    /// Stable content digest of this description. Equal descriptions
    /// yield equal digests regardless of how they were assembled.
    ///
    /// # Panics
    ///
    /// Never panics; the node vocabulary always serializes.
    #[must_use]
    pub fn digest(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&bytes).to_hex().to_string()
    }
}
