// SPDX-License-Identifier: MIT

//! `suqd` — the per-user job-queuing daemon (spec.md §4). Wires the
//! library crate's modules together: resolve paths, load config, bind
//! the socket, install signal handlers, and hand everything to the event
//! loop. `main` itself never panics or unwraps; any startup failure is
//! logged through [`suq_daemon::error::DaemonError`] and exits non-zero,
//! mirroring the original's single `fatal_server_system_error` exit path.

use std::path::PathBuf;

use clap::Parser;
use suq_core::{Settings, SystemClock};
use suq_daemon::connection::{ConnTable, Connection};
use suq_daemon::eventloop::{self, IdlePolicy};
use suq_daemon::logging::{self, DebugLevel};
use suq_daemon::paths::Paths;
use suq_daemon::spawn::ProcessStarter;
use suq_daemon::state::DaemonState;
use suq_daemon::{listener, signal, DaemonError};
use tokio::sync::mpsc;
use tracing::error;

#[derive(Parser)]
#[command(name = "suqd", about = "per-user job queuing daemon")]
struct Cli {
    /// Run as the bootstrap instance spawned by a client: the process's
    /// own stdin/stdout are wired in as the first connection (spec.md
    /// §4.I) instead of waiting for an `accept()`.
    #[arg(long)]
    bootstrap: bool,

    /// Stay up even once idle, and send log output to stderr instead of
    /// the server log file (spec.md's non-detached "keep-alive" mode).
    #[arg(long)]
    foreground: bool,

    /// Debug verbosity (0, 1, or 2). The client's `-d`/`-c` flags both
    /// request level 2.
    #[arg(long, default_value_t = 0)]
    debug: u8,

    /// Overrides the default config file location (also settable via
    /// `SUQ_CONFIG_FILE`).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        // The logging subscriber may not have installed successfully (or
        // may be writing to a file nobody will see before exit), so this
        // is deliberately also printed to stderr.
        error!(error = %e, "suqd failed to start");
        eprintln!("suqd: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), DaemonError> {
    let mut paths = Paths::resolve(cli.config.as_deref());
    let settings = load_settings(&paths.config_file)?;
    paths.apply_settings(&settings);
    paths.create_dirs().map_err(DaemonError::Directories)?;

    let level = DebugLevel(cli.debug);
    let _log_guard = if cli.foreground {
        logging::init_foreground(level);
        None
    } else {
        Some(logging::init_file(&paths.server_log_file(), level).map_err(|source| {
            DaemonError::Logging {
                path: paths.server_log_file(),
                source,
            }
        })?)
    };

    let (_lock, listener) = listener::bind(&paths.socket)?;

    let (reaped_tx, reaped_rx) = mpsc::unbounded_channel();
    let starter = ProcessStarter::new(reaped_tx);
    let state = DaemonState::new(settings, paths);
    let mut conns = ConnTable::new();

    if cli.bootstrap {
        conns.insert(Connection::from_stdio(tokio::io::stdin(), tokio::io::stdout()));
    }

    let signals = signal::Signals::install()?;
    let idle_policy = if cli.foreground {
        IdlePolicy::KeepAlive
    } else {
        IdlePolicy::ExitWhenIdle
    };
    let clock = SystemClock;

    eventloop::run(state, conns, listener, starter, reaped_rx, &clock, signals, idle_policy)
        .await
        .map_err(DaemonError::EventLoop)?;

    Ok(())
}

fn load_settings(config_file: &std::path::Path) -> Result<Settings, DaemonError> {
    match std::fs::read_to_string(config_file) {
        Ok(contents) => Settings::parse(&contents).map_err(|source| DaemonError::Config {
            path: config_file.to_path_buf(),
            source,
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Settings::default()),
        Err(source) => Err(DaemonError::ConfigIo {
            path: config_file.to_path_buf(),
            source,
        }),
    }
}
