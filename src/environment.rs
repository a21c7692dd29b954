//! Installing a fetched context into the process environment.
//!
//! The process environment is shared by every thread. These functions must be
//! called by a single writer, once per launch, before any other thread is
//! started and before the confined command is executed. Children spawned or
//! exec'd afterwards inherit the value unchanged.

use std::ffi::OsStr;

use crate::context::Context;

/// Variable carrying the context into the confined process.
pub const COOKIE_VAR: &str = "SNAP_COOKIE";

/// Older name for [`COOKIE_VAR`], still read by some confined applications.
pub const LEGACY_COOKIE_VAR: &str = "SNAP_CONTEXT";

/// Fatal failures while installing a context.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvironmentError {
    /// The value cannot be stored in an environment block.
    #[error("cannot set {variable}: value contains a NUL byte")]
    InvalidValue {
        /// Variable that was being set.
        variable: &'static str,
    },
    /// The variable does not hold the value after writing it.
    #[error("{variable} does not hold the context after setting it")]
    NotApplied {
        /// Variable that was being set.
        variable: &'static str,
    },
}

/// Set [`COOKIE_VAR`] to exactly `context`, replacing any previous value.
///
/// # Errors
///
/// Returns [`EnvironmentError`] if the value cannot be installed. The caller
/// must abort the launch.
pub fn apply(context: &Context) -> Result<(), EnvironmentError> {
    install(COOKIE_VAR, context.as_str())
}

/// Like [`apply`], also setting [`LEGACY_COOKIE_VAR`].
///
/// # Errors
///
/// Returns the first [`EnvironmentError`] encountered; the caller must abort
/// the launch even if the primary variable was already written.
pub fn apply_with_legacy_alias(context: &Context) -> Result<(), EnvironmentError> {
    install(COOKIE_VAR, context.as_str())?;
    install(LEGACY_COOKIE_VAR, context.as_str())
}

fn install(variable: &'static str, value: &str) -> Result<(), EnvironmentError> {
    // `set_var` panics on NUL, so reject it before touching the environment.
    if value.contains('\0') {
        return Err(EnvironmentError::InvalidValue { variable });
    }

    std::env::set_var(variable, value);

    match std::env::var_os(variable) {
        Some(stored) if stored.as_os_str() == OsStr::new(value) => Ok(()),
        _ => Err(EnvironmentError::NotApplied { variable }),
    }
}
