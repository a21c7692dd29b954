//! Fetch-and-apply pass run by the launcher before exec.
//!
//! This is the only place that calls into [`crate::environment`], and the
//! only place that logs fetch results. The core modules return values and
//! leave messaging to this layer.

use tracing::{debug, info};

use crate::context::{Absence, ContextError, ContextSource, FetchOutcome};
use crate::environment::{self, EnvironmentError};
use crate::instance::InstanceName;

/// What the pass did to the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prepared {
    /// A context was fetched and exported.
    Applied {
        /// Length of the exported value in bytes.
        len: usize,
    },
    /// No context was available; the environment was left untouched.
    Skipped(Absence),
}

/// Failures that must stop the launch.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    /// The daemon is present but the fetch failed.
    #[error(transparent)]
    Context(#[from] ContextError),
    /// The fetched context could not be exported.
    #[error(transparent)]
    Environment(#[from] EnvironmentError),
}

/// Options for [`prepare_environment`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrepareOptions {
    /// Also export the context under the legacy variable name.
    pub legacy_alias: bool,
}

/// Fetch the context for `instance` and export it.
///
/// Absence of a context is not an error. Must run once, before any other
/// thread is started.
///
/// # Errors
///
/// Returns [`LaunchError`] when the fetch fails hard or the export fails.
pub fn prepare_environment(
    source: &dyn ContextSource,
    instance: &InstanceName,
    options: PrepareOptions,
) -> Result<Prepared, LaunchError> {
    let context = match source.fetch(instance) {
        FetchOutcome::Context(context) => context,
        FetchOutcome::NotAvailable(reason) => {
            info!(instance = %instance, %reason, "no context available, continuing without it");
            return Ok(Prepared::Skipped(reason));
        }
        FetchOutcome::Error(err) => return Err(err.into()),
    };

    if options.legacy_alias {
        environment::apply_with_legacy_alias(&context)?;
    } else {
        environment::apply(&context)?;
    }

    debug!(instance = %instance, len = context.len(), "context exported");
    Ok(Prepared::Applied { len: context.len() })
}
