//! Integration tests for basic CLI behavior.
//!
//! Tests that the binary exists, accepts standard flags, each subcommand
//! responds to `--help`, and the offline commands behave.

#![allow(deprecated)] // cargo_bin deprecation, replacement not yet stable

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

/// Helper: get a Command for the `streamhunt` binary with an isolated config dir.
fn streamhunt() -> Command {
    let mut cmd = Command::cargo_bin("streamhunt").expect("binary 'streamhunt' should be built");
    cmd.env("XDG_CONFIG_HOME", scratch_dir("xdg"));
    cmd.env_remove("RUST_LOG");
    cmd
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("streamhunt-cli-{}-{name}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn config_file(name: &str, body: &str) -> PathBuf {
    let path = scratch_dir(name).join("config.toml");
    std::fs::write(&path, body).unwrap();
    path
}

// ─── Top-level flags ─────────────────────────────────────────────────────────

#[test]
fn help_flag_shows_usage() {
    streamhunt()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: streamhunt"))
        .stdout(predicate::str::contains("movie"))
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("embed"))
        .stdout(predicate::str::contains("providers"));
}

#[test]
fn version_flag_shows_semver() {
    streamhunt()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^streamhunt \d+\.\d+\.\d+\n$").unwrap());
}

#[test]
fn no_args_shows_error_and_usage() {
    streamhunt()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage: streamhunt"));
}

#[test]
fn invalid_subcommand_fails() {
    streamhunt()
        .arg("this-is-not-a-real-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn invalid_environment_is_rejected() {
    streamhunt()
        .args(["--env", "toaster", "providers"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("toaster"));
}

// ─── Subcommand help ─────────────────────────────────────────────────────────

#[test]
fn movie_help() {
    streamhunt()
        .args(["movie", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--year"))
        .stdout(predicate::str::contains("--tmdb-id"))
        .stdout(predicate::str::contains("--imdb-id"));
}

#[test]
fn show_help() {
    streamhunt()
        .args(["show", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--season"))
        .stdout(predicate::str::contains("--episode"));
}

#[test]
fn embed_help() {
    streamhunt()
        .args(["embed", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<EMBED_ID>"))
        .stdout(predicate::str::contains("<URL>"));
}

#[test]
fn movie_requires_year_and_tmdb_id() {
    streamhunt()
        .args(["movie", "Heat"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--year"));
}

// ─── providers ───────────────────────────────────────────────────────────────

#[test]
fn providers_lists_bundled_adapters() {
    streamhunt()
        .arg("providers")
        .assert()
        .success()
        .stdout(predicate::str::contains("wecima"))
        .stdout(predicate::str::contains("insertunit"))
        .stdout(predicate::str::contains("filemoon"))
        .stdout(predicate::str::contains("vidplay"))
        .stdout(predicate::str::contains("(native environment)"))
        .stdout(predicate::str::contains("ineligible").not());
}

#[test]
fn providers_json_output() {
    streamhunt()
        .args(["--json", "providers"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("["))
        .stdout(predicate::str::contains(r#""id": "vidplay""#))
        .stdout(predicate::str::contains(r#""kind": "embed""#));
}

#[test]
fn browser_environment_marks_wecima_ineligible() {
    streamhunt()
        .args(["--env", "browser", "providers"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"wecima\s+source\s+210\s+.*ineligible").unwrap())
        .stdout(predicate::str::contains("(browser environment)"));
}

#[test]
fn config_file_disables_providers() {
    let config = config_file("disable", "disabled = [\"vidplay\"]\n");
    streamhunt()
        .arg("--config")
        .arg(&config)
        .arg("providers")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"vidplay\s+embed\s+401\s+.*disabled").unwrap());
}

#[test]
fn config_disabling_unknown_provider_warns_and_keeps_the_rest() {
    let config = config_file("unknown-id", "disabled = [\"nosuch\", \"filemoon\"]\n");
    streamhunt()
        .arg("--config")
        .arg(&config)
        .arg("providers")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"filemoon\s+embed\s+301\s+.*disabled").unwrap())
        .stdout(predicate::str::is_match(r"vidplay\s+embed\s+401\s+.*disabled").unwrap().not())
        .stderr(predicate::str::contains("unknown provider 'nosuch'"));
}

#[test]
fn bad_config_file_is_reported() {
    let config = config_file("bad", "not_a_key = 1\n");
    streamhunt()
        .arg("--config")
        .arg(&config)
        .arg("providers")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid TOML"));
}

#[test]
fn missing_explicit_config_fails() {
    streamhunt()
        .args(["--config", "/nonexistent/streamhunt.toml", "providers"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}

// ─── Offline failures ────────────────────────────────────────────────────────

#[test]
fn unknown_embed_lists_known_ones() {
    streamhunt()
        .args(["embed", "nosuch", "https://example.invalid/e/1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown embed: nosuch"))
        .stderr(predicate::str::contains("filemoon"));
}

#[test]
fn blank_title_is_rejected() {
    streamhunt()
        .args(["movie", "  ", "--year", "1995", "--tmdb-id", "949"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("title is empty"));
}

#[test]
fn season_zero_is_rejected() {
    streamhunt()
        .args(["show", "Dark", "-s", "0", "-e", "1", "-y", "2017", "--tmdb-id", "70523"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("season numbers start at 1"));
}
