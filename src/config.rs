//! Configuration loading for the launcher.
//!
//! Loads `confine-context.toml` with per-field defaults, so a missing or empty
//! file is valid. Environment variables override file values; command-line
//! flags are applied by the binary on top of both.
//!
//! Precedence: CLI flags > env vars > config file > defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::context::{DEFAULT_MAX_CONTEXT_BYTES, DEFAULT_SOCKET_PATH, DEFAULT_TIMEOUT};

/// Config file used when neither `--config` nor `$CONFINE_CONTEXT_CONFIG` is set.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/confine-context.toml";

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "CONFINE_CONTEXT_CONFIG";

/// Launcher configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContextConfig {
    /// Daemon socket path.
    pub socket_path: PathBuf,
    /// Deadline for one complete fetch, in milliseconds.
    pub timeout_ms: u64,
    /// Largest context accepted from the daemon, in bytes.
    pub max_context_bytes: usize,
    /// Also export the context under the legacy variable name.
    pub legacy_alias: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            timeout_ms: u64::try_from(DEFAULT_TIMEOUT.as_millis()).unwrap_or(u64::MAX),
            max_context_bytes: DEFAULT_MAX_CONTEXT_BYTES,
            legacy_alias: false,
        }
    }
}

impl ContextConfig {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    ///
    /// `explicit_path` (from `--config`) wins over `$CONFINE_CONTEXT_CONFIG`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or if
    /// the resulting configuration is invalid.
    pub fn load(explicit_path: Option<&Path>) -> anyhow::Result<Self> {
        Self::load_with(explicit_path, |key| std::env::var(key).ok())
    }

    /// Load using a custom env resolver (for testing).
    ///
    /// # Errors
    ///
    /// Same as [`ContextConfig::load`].
    pub fn load_with(
        explicit_path: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let path = match explicit_path {
            Some(path) => path.to_path_buf(),
            None => config_path_with(&env),
        };
        let mut config = load_from_file(&path)?;
        config.apply_overrides(&env);
        config.validate()?;
        Ok(config)
    }

    /// Fetch deadline as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Apply environment variable overrides.
    ///
    /// Takes a resolver function so tests never mutate the real environment.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("CONFINE_CONTEXT_SOCKET") {
            self.socket_path = PathBuf::from(v);
        }

        if let Some(v) = env("CONFINE_CONTEXT_TIMEOUT_MS") {
            match v.parse() {
                Ok(n) => self.timeout_ms = n,
                Err(_) => tracing::warn!(
                    var = "CONFINE_CONTEXT_TIMEOUT_MS",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }

        if let Some(v) = env("CONFINE_CONTEXT_MAX_BYTES") {
            match v.parse() {
                Ok(n) => self.max_context_bytes = n,
                Err(_) => tracing::warn!(
                    var = "CONFINE_CONTEXT_MAX_BYTES",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }

        if let Some(v) = env("CONFINE_CONTEXT_LEGACY_ALIAS") {
            match v.as_str() {
                "1" | "true" | "yes" => self.legacy_alias = true,
                "0" | "false" | "no" => self.legacy_alias = false,
                _ => tracing::warn!(
                    var = "CONFINE_CONTEXT_LEGACY_ALIAS",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
    }

    /// Reject settings that would make every fetch fail.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero timeout or a zero size limit.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.timeout_ms == 0 {
            anyhow::bail!("timeout_ms must be greater than zero");
        }
        if self.max_context_bytes == 0 {
            anyhow::bail!("max_context_bytes must be greater than zero");
        }
        if self.socket_path.as_os_str().is_empty() {
            anyhow::bail!("socket_path must not be empty");
        }
        Ok(())
    }
}

/// Resolve the config file path from the environment.
fn config_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
    env(CONFIG_PATH_ENV).map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Parse the TOML file at `path`; a missing file yields defaults.
fn load_from_file(path: &Path) -> anyhow::Result<ContextConfig> {
    match std::fs::read_to_string(path) {
        Ok(contents) => toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ContextConfig::default()),
        Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
    }
}
