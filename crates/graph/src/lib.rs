#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Build-graph description IR
//!
//! The compiler emits *descriptions* of build-graph nodes: base states,
//! run directives with mounts and cache mounts, and capture requests for
//! output directories. An external execution engine realizes these into
//! actual execution; nothing in this crate runs anything.
//!
//! States are immutable, content-derived values. Cloning shares the
//! underlying node, and equal descriptions digest identically however
//! they were assembled.

mod resolver;
mod run;
mod state;

pub use resolver::ImageMetaResolver;
pub use run::{CacheMount, CacheSharing, ExecOutput, ExecState, Mount, NetworkMode, RunDirective};
pub use state::{Node, State};
