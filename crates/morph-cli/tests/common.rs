#![allow(dead_code)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// A `morph` command isolated in its own storage root, offline by default.
pub fn morph_cmd(home: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("morph");
    cmd.env("MORPH_HOME", home.path())
        .env("MORPH_ONLINE", "0")
        .env("NO_COLOR", "1")
        .env_remove("MORPH_ADDRESS")
        .env_remove("MORPH_GIST_TOKEN");
    cmd
}

pub fn storage_home() -> TempDir {
    tempfile::Builder::new()
        .prefix("morph-cli")
        .tempdir()
        .expect("tempdir")
}

/// Runs `morph --json <args>` and returns the exit code with the envelope.
pub fn run_json(home: &TempDir, args: &[&str]) -> (i32, Value) {
    let output = morph_cmd(home)
        .arg("--json")
        .args(args)
        .output()
        .expect("run morph");
    let payload: Value = serde_json::from_slice(&output.stdout).unwrap_or_else(|err| {
        panic!(
            "invalid json ({err}): {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        )
    });
    (output.status.code().unwrap_or(-1), payload)
}
