//! confine-context: hands a daemon-issued context to a confined application.
//!
//! A confining launcher asks the local daemon for the context of the
//! application instance it is about to start and exports it through the
//! environment of the process it will exec. A missing daemon or a missing
//! record is tolerated; a misbehaving daemon or a failed export is not.
//!
//! See `DESIGN.md` for the module map.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod context;
pub mod environment;
pub mod instance;
pub mod launcher;
pub mod logging;
