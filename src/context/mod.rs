//! Fetching an application context from the local daemon.
//!
//! A fetch has three possible results, modelled by [`FetchOutcome`]:
//! a context, a benign absence, or an error. Absence covers the daemon not
//! running yet and the daemon having no record for the instance; launchers
//! continue without a context in that case. Anything else means the daemon
//! is present and misbehaving, which must stop the launch.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::instance::InstanceName;

pub mod client;
pub mod protocol;

/// Error domain reported by every [`ContextError`].
pub const CONTEXT_DOMAIN: &str = "context";

/// Default daemon socket.
pub const DEFAULT_SOCKET_PATH: &str = "/run/snapd/context.socket";

/// Default bound on one complete fetch, connection to last byte.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Default maximum accepted context length in bytes.
pub const DEFAULT_MAX_CONTEXT_BYTES: usize = 254;

/// Opaque context string handed out by the daemon.
///
/// The value is credential-like, so `Debug` shows only its length.
#[derive(Clone, PartialEq, Eq)]
pub struct Context(String);

impl Context {
    /// Wrap a raw context value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the raw value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length of the value in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the daemon returned an empty context.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Take ownership of the raw value.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Context(<{} bytes>)", self.0.len())
    }
}

/// Why a fetch produced no context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Absence {
    /// Nothing listens at the socket path.
    SocketMissing,
    /// The socket exists but nobody accepts connections on it.
    ConnectionRefused,
    /// The daemon answered that it has no context for the instance.
    NoRecord,
}

impl fmt::Display for Absence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::SocketMissing => "daemon socket does not exist",
            Self::ConnectionRefused => "daemon refused the connection",
            Self::NoRecord => "daemon has no context for this instance",
        };
        f.write_str(reason)
    }
}

/// Hard failures: the daemon is there but the exchange went wrong.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    /// Connecting failed for a reason other than absence.
    #[error("cannot connect to context daemon at {}: {source}", .path.display())]
    Connect {
        /// Socket path that was dialled.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The connection broke after it was established.
    #[error("context daemon transport failed: {0}")]
    Transport(#[from] std::io::Error),
    /// The daemon did not answer within the deadline.
    #[error("context daemon did not respond within {timeout:?}")]
    Timeout {
        /// Deadline that elapsed.
        timeout: Duration,
    },
    /// The connection closed before a complete response arrived.
    #[error("context daemon response truncated after {received} bytes")]
    Truncated {
        /// Bytes received before end of stream.
        received: usize,
    },
    /// Response or context larger than accepted.
    #[error("context daemon response exceeds {limit} bytes")]
    Oversized {
        /// Limit that was exceeded.
        limit: usize,
    },
    /// Response could not be decoded.
    #[error("malformed context daemon response: {0}")]
    Malformed(String),
    /// The request could not be encoded.
    #[error("cannot encode context request: {0}")]
    Encode(#[source] serde_json::Error),
    /// The daemon reported an internal error.
    #[error("context daemon reported an error: {0}")]
    Daemon(String),
}

impl ContextError {
    /// Error domain, always [`CONTEXT_DOMAIN`].
    pub fn domain(&self) -> &'static str {
        CONTEXT_DOMAIN
    }
}

/// Result of one fetch attempt.
#[derive(Debug)]
#[must_use]
pub enum FetchOutcome {
    /// The daemon returned a context.
    Context(Context),
    /// No context exists, or the daemon is not running. Not an error.
    NotAvailable(Absence),
    /// The daemon is present but the exchange failed.
    Error(ContextError),
}

impl FetchOutcome {
    /// Fold the outcome into a `Result`, mapping absence to `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns the [`ContextError`] carried by [`FetchOutcome::Error`].
    pub fn into_result(self) -> Result<Option<Context>, ContextError> {
        match self {
            Self::Context(context) => Ok(Some(context)),
            Self::NotAvailable(_) => Ok(None),
            Self::Error(err) => Err(err),
        }
    }

    /// Returns `true` for [`FetchOutcome::NotAvailable`].
    pub fn is_not_available(&self) -> bool {
        matches!(self, Self::NotAvailable(_))
    }
}

/// Anything able to look up the context of an instance.
pub trait ContextSource {
    /// Make a single attempt to obtain the context for `instance`.
    fn fetch(&self, instance: &InstanceName) -> FetchOutcome;
}
