// SPDX-License-Identifier: MIT

//! Fatal daemon-side error taxonomy (spec.md §7: "system" errors on the
//! daemon side log and terminate the process; they are never recovered
//! from in-process, unlike client-input/lookup/resource/run errors, which
//! are just text replies produced by the dispatcher).

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("failed to create required directory: {0}")]
    Directories(#[source] std::io::Error),

    #[error("config file {path:?} is malformed: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: suq_core::ConfigError,
    },

    #[error("failed to read config file {path:?}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("another suqd instance already holds the lock at {0:?}")]
    AlreadyRunning(PathBuf),

    #[error("failed to bind listening socket at {path:?}: {source}")]
    Bind {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to install signal handler: {0}")]
    Signal(#[source] std::io::Error),

    #[error("event loop exited with an error: {0}")]
    EventLoop(#[source] std::io::Error),

    #[error("failed to open log file {path:?}: {source}")]
    Logging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
