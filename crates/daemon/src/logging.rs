// SPDX-License-Identifier: MIT

//! Structured logging setup (spec.md §4.A's timestamped log records, ported
//! to `tracing`). Debug gating has three levels (0/1/2, spec.md §4.A): 0 is
//! plain `info`, 1 adds this crate's `debug` spans, 2 additionally lowers
//! the default filter to `trace`.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Debug verbosity requested on the command line (`-d`/`-c` set level 2;
/// absent, level 0).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugLevel(pub u8);

fn filter_for(level: DebugLevel) -> EnvFilter {
    let directive = match level.0 {
        0 => "suqd=info,suq_daemon=info,suq_core=info,suq_wire=info",
        1 => "suqd=debug,suq_daemon=debug,suq_core=info,suq_wire=info",
        _ => "suqd=trace,suq_daemon=trace,suq_core=debug,suq_wire=debug",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive))
}

/// Installs the global subscriber writing to the server log file in
/// non-blocking append mode. Returns the worker guard: dropping it flushes
/// and stops the background writer thread, so callers must keep it alive
/// for the daemon's lifetime.
pub fn init_file(log_file: &Path, level: DebugLevel) -> std::io::Result<WorkerGuard> {
    let file = std::fs::OpenOptions::new().create(true).append(true).open(log_file)?;
    let (writer, guard) = tracing_appender::non_blocking(file);
    tracing_subscriber::fmt()
        .with_env_filter(filter_for(level))
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .init();
    Ok(guard)
}

/// Installs the global subscriber writing to stderr, used in foreground
/// (`-d`/`--debug`) mode where the daemon is meant to be watched
/// interactively rather than detached. Stderr, not stdout: stdout is the
/// bootstrap connection's reply channel (spec.md §4.I), and a log line
/// landing there would corrupt the wire protocol.
pub fn init_foreground(level: DebugLevel) {
    tracing_subscriber::fmt()
        .with_env_filter(filter_for(level))
        .with_writer(std::io::stderr)
        .init();
}
