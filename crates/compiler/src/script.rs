//! Build script synthesis
//!
//! Pure text generation: an ordered list of build steps becomes a single
//! deterministic shell script. Each step runs in its own subshell with
//! its own exports; steps chain with an explicit and-then operator so a
//! failing step aborts the remainder.

use std::fmt::Write as _;

use pakket_graph::State;
use pakket_types::{PackageSpec, GOMODS_SOURCE_NAME};

/// File name the build script is mounted under
pub const BUILD_SCRIPT_NAME: &str = "_build.sh";

/// Synthesize the build script for `spec`.
///
/// Environment values are emitted as literal `KEY="VALUE"` assignments;
/// no escaping beyond the quoting is performed, so specs must supply
/// shell-safe values.
#[must_use]
pub fn synthesize_build_script(spec: &PackageSpec) -> String {
    let mut buf = String::new();
    buf.push_str("#!/usr/bin/env sh\n");
    buf.push_str("set -x\n");

    if spec.has_gomods() {
        let _ = writeln!(buf, "export GOMODCACHE=\"$(pwd)/{GOMODS_SOURCE_NAME}\"");
    }

    let steps = &spec.build.steps;
    for (i, step) in steps.iter().enumerate() {
        buf.push_str("(\n");
        for (key, value) in &step.env {
            let _ = writeln!(buf, "export {key}=\"{value}\"");
        }
        let _ = writeln!(buf, "{}", step.command);
        buf.push(')');

        if i < steps.len() - 1 {
            buf.push_str(" && \\\n");
        } else {
            buf.push('\n');
        }
    }

    buf
}

/// The build script as a mountable single-file state.
#[must_use]
pub fn build_script_state(spec: &PackageSpec) -> State {
    State::file(BUILD_SCRIPT_NAME, synthesize_build_script(spec), 0o770)
}

/// Synthesize the invocation script: run the build script, then move
/// every declared binary artifact into `output_dir`.
#[must_use]
pub fn synthesize_invocation_script(binaries: &[String], output_dir: &str) -> String {
    let mut buf = String::new();
    buf.push_str("#!/usr/bin/env sh\n");
    buf.push_str("set -ex\n");
    let _ = writeln!(buf, "/tmp/scripts/{BUILD_SCRIPT_NAME}");
    for binary in binaries {
        let _ = writeln!(buf, "mv '{binary}' '{output_dir}'");
    }
    buf
}
