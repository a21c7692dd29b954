//! confine-context CLI entry point.
//!
//! Provides `fetch` for printing the context of an instance and `run` for
//! exporting it and exec'ing the confined command.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::ffi::OsString;
use std::io::Write;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use confine_context::config::ContextConfig;
use confine_context::context::client::DaemonClient;
use confine_context::context::{ContextSource, FetchOutcome};
use confine_context::instance::InstanceName;
use confine_context::launcher::{self, PrepareOptions};

/// Export a daemon-issued context into a confined launch.
#[derive(Parser)]
#[command(name = "confine-context", version, about)]
struct Cli {
    /// Config file (default: `$CONFINE_CONTEXT_CONFIG` or `/etc/confine-context.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Daemon socket, overriding config and environment.
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    json_logs: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Print the context of an instance to stdout, if the daemon has one.
    Fetch {
        /// Instance name, e.g. `myapp` or `myapp_default`.
        instance: InstanceName,
    },
    /// Export the context of an instance and exec a command.
    Run {
        /// Instance name, e.g. `myapp` or `myapp_default`.
        instance: InstanceName,
        /// Command and arguments to exec, after `--`.
        #[arg(last = true, required = true)]
        command: Vec<OsString>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    confine_context::logging::init(cli.json_logs)?;

    let mut config = ContextConfig::load(cli.config.as_deref())?;
    if let Some(socket) = cli.socket {
        config.socket_path = socket;
    }
    let client = DaemonClient::from_config(&config);
    debug!(
        socket = %client.socket_path().display(),
        timeout = ?client.timeout(),
        max_context_bytes = client.max_context_bytes(),
        "configuration loaded"
    );

    match cli.command {
        Command::Fetch { instance } => handle_fetch(&client, &instance),
        Command::Run { instance, command } => {
            handle_run(&client, &instance, &command, config.legacy_alias)
        }
    }
}

/// Print the context, or log why there is none.
fn handle_fetch(client: &DaemonClient, instance: &InstanceName) -> anyhow::Result<()> {
    match client.fetch(instance) {
        FetchOutcome::Context(context) => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(context.as_str().as_bytes())
                .and_then(|()| stdout.flush())
                .context("failed to write context to stdout")
        }
        FetchOutcome::NotAvailable(reason) => {
            info!(instance = %instance, %reason, "no context available");
            Ok(())
        }
        FetchOutcome::Error(err) => {
            Err(err).with_context(|| format!("cannot fetch context for {instance}"))
        }
    }
}

/// Export the context, then replace this process with `command`.
fn handle_run(
    client: &DaemonClient,
    instance: &InstanceName,
    command: &[OsString],
    legacy_alias: bool,
) -> anyhow::Result<()> {
    let prepared =
        launcher::prepare_environment(client, instance, PrepareOptions { legacy_alias })
            .with_context(|| format!("cannot prepare environment for {instance}"))?;
    debug!(instance = %instance, ?prepared, "environment prepared");

    let (program, args) = command.split_first().context("no command given")?;
    let err = std::process::Command::new(program).args(args).exec();
    Err(err).with_context(|| format!("failed to exec {}", program.to_string_lossy()))
}
