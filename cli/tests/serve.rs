//! # Statbot CLI Serve Integration Tests
//!
//! File: cli/tests/serve.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Startup failures of `statbot serve`. Request handling is covered by the
//! router tests inside the crate, which do not need a running process.
//!

mod common;
use common::*;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_serve_requires_api_key() {
    let dir = tempdir().expect("Failed to create temp dir");

    isolated_cmd(dir.path())
        .args(["serve", "--port", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GEMINI_API_KEY"));
}

#[test]
fn test_serve_rejects_bad_api_base() {
    let dir = tempdir().expect("Failed to create temp dir");
    fs::write(
        dir.path().join("statbot.toml"),
        "[generation]\napi_base = \"ftp://example.invalid\"\n",
    )
    .expect("Failed to write config");

    isolated_cmd(dir.path())
        .env("GEMINI_API_KEY", "test-key")
        .arg("serve")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration validation failed"));
}

#[test]
fn test_serve_rejects_invalid_host() {
    statbot_cmd()
        .args(["serve", "--host", "not-an-ip"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}
