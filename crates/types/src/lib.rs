#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core types for the pakket build-graph compiler
//!
//! This crate defines the declarative package spec (sources, build steps,
//! dependencies, artifacts, systemd units) and the container image config
//! model. The spec is immutable input to the compiler; build-arg expansion
//! produces a new resolved copy and never mutates the original.

mod args;
mod image;
mod package;
mod systemd;
pub mod validation;

pub use args::expand_args;
pub use image::{ImageConfig, ImageOverride, Platform, RuntimeConfig};
pub use package::{
    ArtifactConfig, ArtifactsConfig, BuildConfig, BuildStep, GomodConfig, InlineFile,
    PackageDependencies, PackageSpec, PatchSpec, SignerConfig, Source, TargetConfig,
    TargetImageConfig,
};
pub use systemd::{SystemdConfiguration, SystemdDropinConfig, SystemdUnitConfig};
pub use validation::GOMODS_SOURCE_NAME;
