//! Configuration loading, defaults, and override precedence.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use confine_context::config::{ContextConfig, CONFIG_PATH_ENV};
use confine_context::context::{DEFAULT_MAX_CONTEXT_BYTES, DEFAULT_SOCKET_PATH, DEFAULT_TIMEOUT};

fn resolver(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |key| map.get(key).cloned()
}

fn write_config(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("confine-context.toml");
    std::fs::write(&path, contents).expect("should write config");
    path
}

#[test]
fn defaults_match_constants() {
    let config = ContextConfig::default();
    assert_eq!(config.socket_path, PathBuf::from(DEFAULT_SOCKET_PATH));
    assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
    assert_eq!(config.max_context_bytes, DEFAULT_MAX_CONTEXT_BYTES);
    assert!(!config.legacy_alias);
}

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = dir.path().join("absent.toml");
    let config = ContextConfig::load_with(Some(&path), resolver(&[])).expect("load");
    assert_eq!(config, ContextConfig::default());
}

#[test]
fn parses_complete_file() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = write_config(
        dir.path(),
        r#"
socket_path = "/run/test/context.socket"
timeout_ms = 1500
max_context_bytes = 512
legacy_alias = true
"#,
    );

    let config = ContextConfig::load_with(Some(&path), resolver(&[])).expect("load");
    assert_eq!(config.socket_path, PathBuf::from("/run/test/context.socket"));
    assert_eq!(config.timeout(), Duration::from_millis(1500));
    assert_eq!(config.max_context_bytes, 512);
    assert!(config.legacy_alias);
}

#[test]
fn partial_file_keeps_other_defaults() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = write_config(dir.path(), "timeout_ms = 100\n");

    let config = ContextConfig::load_with(Some(&path), resolver(&[])).expect("load");
    assert_eq!(config.timeout_ms, 100);
    assert_eq!(config.max_context_bytes, DEFAULT_MAX_CONTEXT_BYTES);
    assert_eq!(config.socket_path, PathBuf::from(DEFAULT_SOCKET_PATH));
}

#[test]
fn unknown_keys_are_rejected() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = write_config(dir.path(), "retries = 3\n");
    assert!(ContextConfig::load_with(Some(&path), resolver(&[])).is_err());
}

#[test]
fn invalid_toml_reports_path() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = write_config(dir.path(), "timeout_ms = \"soon\"\n");
    let err = ContextConfig::load_with(Some(&path), resolver(&[])).expect_err("bad type");
    assert!(format!("{err}").contains("confine-context.toml"));
}

#[test]
fn env_overrides_file() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = write_config(dir.path(), "timeout_ms = 100\nmax_context_bytes = 64\n");
    let env = resolver(&[
        ("CONFINE_CONTEXT_SOCKET", "/tmp/other.socket"),
        ("CONFINE_CONTEXT_TIMEOUT_MS", "250"),
        ("CONFINE_CONTEXT_LEGACY_ALIAS", "true"),
    ]);

    let config = ContextConfig::load_with(Some(&path), env).expect("load");
    assert_eq!(config.socket_path, PathBuf::from("/tmp/other.socket"));
    assert_eq!(config.timeout_ms, 250);
    assert_eq!(config.max_context_bytes, 64);
    assert!(config.legacy_alias);
}

#[test]
fn invalid_env_values_are_ignored() {
    let mut config = ContextConfig::default();
    config.apply_overrides(resolver(&[
        ("CONFINE_CONTEXT_TIMEOUT_MS", "three seconds"),
        ("CONFINE_CONTEXT_MAX_BYTES", "-1"),
        ("CONFINE_CONTEXT_LEGACY_ALIAS", "perhaps"),
    ]));
    assert_eq!(config, ContextConfig::default());
}

#[test]
fn config_path_comes_from_env() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = write_config(dir.path(), "max_context_bytes = 32\n");
    let path_str = path.to_string_lossy().into_owned();

    let env = resolver(&[(CONFIG_PATH_ENV, path_str.as_str())]);
    let config = ContextConfig::load_with(None, env).expect("load");
    assert_eq!(config.max_context_bytes, 32);
}

#[test]
fn zero_limits_are_invalid() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = write_config(dir.path(), "timeout_ms = 0\n");
    assert!(ContextConfig::load_with(Some(&path), resolver(&[])).is_err());

    let path = write_config(dir.path(), "max_context_bytes = 0\n");
    assert!(ContextConfig::load_with(Some(&path), resolver(&[])).is_err());
}
