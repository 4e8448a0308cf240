//! # Statbot CLI Integration Test Common Helpers
//!
//! File: cli/tests/common.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Shared helpers for the integration tests in `cli/tests/`. Each command is
//! run inside a scratch directory with `HOME` and `XDG_CONFIG_HOME` pointed at
//! it, so neither a real user configuration, a `statbot.toml` nor a real API
//! key leaks into the tests.
//!

// Different test files use different helpers.
#![allow(dead_code)]

pub use assert_cmd::Command;
use std::path::Path;

/// # Get Statbot Command (`statbot_cmd`)
///
/// `assert_cmd::Command` pointing at the compiled `statbot` binary.
///
/// ## Panics
/// Panics if the `statbot` binary cannot be found via `Command::cargo_bin`.
pub fn statbot_cmd() -> Command {
    Command::cargo_bin("statbot").expect("Failed to find statbot binary for testing")
}

/// `statbot_cmd` isolated in `dir`, without `GEMINI_API_KEY`.
pub fn isolated_cmd(dir: &Path) -> Command {
    let mut cmd = statbot_cmd();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env_remove("GEMINI_API_KEY")
        .env_remove("RUST_LOG");
    cmd
}
