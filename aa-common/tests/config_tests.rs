//! Unit tests for bootstrap path resolution
//!
//! Tests the priority order CLI > environment > TOML > compiled default.
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate AA_* variables are marked with #[serial].

use aa_common::config::{
    find_bootstrap_file, resolve_path, BOOTSTRAP_ENV_VAR, DEFAULT_MEDIA_ROOT,
};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};

const TEST_VAR: &str = "AA_TEST_MEDIA_ROOT";

#[test]
#[serial]
fn test_default_used_when_nothing_set() {
    env::remove_var(TEST_VAR);
    let path = resolve_path(None, TEST_VAR, None, DEFAULT_MEDIA_ROOT);
    assert_eq!(path, PathBuf::from("/home/fpp/media/music"));
}

#[test]
#[serial]
fn test_toml_value_beats_default() {
    env::remove_var(TEST_VAR);
    let path = resolve_path(None, TEST_VAR, Some(Path::new("/srv/clips")), DEFAULT_MEDIA_ROOT);
    assert_eq!(path, PathBuf::from("/srv/clips"));
}

#[test]
#[serial]
fn test_env_beats_toml() {
    env::set_var(TEST_VAR, "/tmp/aa-env-clips");
    let path = resolve_path(None, TEST_VAR, Some(Path::new("/srv/clips")), DEFAULT_MEDIA_ROOT);
    assert_eq!(path, PathBuf::from("/tmp/aa-env-clips"));
    env::remove_var(TEST_VAR);
}

#[test]
#[serial]
fn test_cli_beats_env() {
    env::set_var(TEST_VAR, "/tmp/aa-env-clips");
    let path = resolve_path(
        Some(Path::new("/mnt/cli-clips")),
        TEST_VAR,
        Some(Path::new("/srv/clips")),
        DEFAULT_MEDIA_ROOT,
    );
    assert_eq!(path, PathBuf::from("/mnt/cli-clips"));
    env::remove_var(TEST_VAR);
}

#[test]
#[serial]
fn test_blank_env_is_ignored() {
    env::set_var(TEST_VAR, "   ");
    let path = resolve_path(None, TEST_VAR, Some(Path::new("/srv/clips")), DEFAULT_MEDIA_ROOT);
    assert_eq!(path, PathBuf::from("/srv/clips"));
    env::remove_var(TEST_VAR);
}

#[test]
#[serial]
fn test_bootstrap_file_explicit_and_env() {
    env::remove_var(BOOTSTRAP_ENV_VAR);
    assert_eq!(
        find_bootstrap_file(Some(Path::new("/opt/aa.toml"))),
        Some(PathBuf::from("/opt/aa.toml"))
    );

    env::set_var(BOOTSTRAP_ENV_VAR, "/tmp/aa-bootstrap.toml");
    assert_eq!(
        find_bootstrap_file(None),
        Some(PathBuf::from("/tmp/aa-bootstrap.toml"))
    );
    env::remove_var(BOOTSTRAP_ENV_VAR);
}
