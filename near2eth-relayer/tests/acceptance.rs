//! Acceptance test: runs the application as a subprocess and asserts its
//! output for given argument combinations matches what is expected.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    unused_lifetimes,
    unused_qualifications
)]

use abscissa_core::testing::prelude::*;
use once_cell::sync::Lazy;
use std::path::PathBuf;

/// Executes your application binary via `cargo run`.
///
/// Storing this value as a [`Lazy`] static ensures that all instances of
/// the runner acquire a mutex when executing commands and inspecting
/// exit statuses, serializing what would otherwise be multithreaded
/// invocations as `cargo test` executes tests in parallel by default.
pub static RUNNER: Lazy<CmdRunner> = Lazy::new(CmdRunner::default);

/// Example of a test which matches a regular expression
#[test]
fn version_no_args() {
    let mut runner = RUNNER.clone();
    let mut cmd = runner.arg("--version").capture_stdout().run();
    cmd.stdout().expect_regex(r"\A\w+ [\d\.\-]+\z");
}

/// A config without a signing key fails validation before any chain is
/// contacted, and the process exits with status 1.
#[test]
fn start_without_signing_key_fails() {
    let config = write_config(
        "near2eth_relayer_no_key.toml",
        "[near_rpc]\nrpc_endpoint = \"http://127.0.0.1:1\"\nnetwork_id = \"testnet\"\n",
    );
    let mut runner = RUNNER.clone();
    let cmd = runner
        .args(["-c", config.to_str().unwrap(), "start"])
        .capture_stdout()
        .run();
    cmd.wait().unwrap().expect_code(1);
}

/// Unknown config keys are rejected when the config is loaded.
#[test]
fn unknown_config_key_fails() {
    let config = write_config("near2eth_relayer_unknown_key.toml", "[relay]\npoll_ms = 5\n");
    let mut runner = RUNNER.clone();
    let cmd = runner
        .args(["-c", config.to_str().unwrap(), "view-head"])
        .capture_stdout()
        .run();
    let status = cmd.wait().unwrap();
    assert!(!status.success());
}

fn write_config(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}
