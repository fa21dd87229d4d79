// SPDX-License-Identifier: MIT

//! Default filesystem locations the daemon and client agree on without a
//! request ever naming them explicitly: the listening socket, the log
//! directory, the per-job output directory, and the config file itself.
//!
//! None of this is persisted the way [`suq_core::Settings`] is — these are
//! derived once at startup from environment variables and the process uid,
//! matching `suq_config_init`'s defaulting order (spec.md §4.B, §6).

use std::env;
use std::path::{Path, PathBuf};

use nix::unistd::Uid;
use suq_core::Settings;

/// Resolved locations for one daemon/client pair sharing a user account.
#[derive(Debug, Clone)]
pub struct Paths {
    pub socket: PathBuf,
    pub log_dir: PathBuf,
    pub output_dir: PathBuf,
    pub config_file: PathBuf,
}

fn hostname() -> String {
    std::fs::read_to_string("/proc/sys/kernel/hostname")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|_| "localhost".to_string())
}

fn xdg_state_home() -> Option<PathBuf> {
    env::var_os("XDG_STATE_HOME")
        .map(PathBuf::from)
        .filter(|p| p.is_absolute())
}

fn xdg_config_home() -> Option<PathBuf> {
    env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .filter(|p| p.is_absolute())
}

fn home_dir() -> PathBuf {
    env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("/"))
}

impl Paths {
    /// Computes every default path for the current user, honoring
    /// `SUQ_CONFIG_FILE`/`--config` overrides for the config file location.
    /// The socket, log directory, and output directory are uid/env-derived
    /// defaults here; a daemon can't know about the `socket_filename`/
    /// `log_dir`/`output_dir` config keys before it knows where the config
    /// file itself lives, so those three are applied afterward, once the
    /// config file has actually been read, via [`Self::apply_settings`].
    pub fn resolve(config_override: Option<&Path>) -> Self {
        let uid = Uid::current().as_raw();
        let run_dir = PathBuf::from(format!("/tmp/suq-{uid}"));

        let socket = run_dir.join(format!("{}.socket", hostname()));
        let output_dir = run_dir;

        let log_dir = xdg_state_home()
            .unwrap_or_else(|| home_dir().join(".local/state"))
            .join("suq");

        let config_file = config_override.map(Path::to_path_buf).unwrap_or_else(|| {
            env::var_os("SUQ_CONFIG_FILE").map(PathBuf::from).unwrap_or_else(|| {
                xdg_config_home()
                    .unwrap_or_else(|| home_dir().join(".config"))
                    .join("suq")
                    .join("config")
            })
        });

        Self {
            socket,
            log_dir,
            output_dir,
            config_file,
        }
    }

    /// Overrides the socket, log directory, and/or output directory with
    /// whichever of `socket_filename`/`log_dir`/`output_dir` the just-loaded
    /// config file actually set, matching `suq_config_init`'s "fill any
    /// missing path vars" order (config file wins, uid/env defaults are the
    /// fallback). Call before [`Self::create_dirs`] so the directories that
    /// actually get created are the ones the rest of the daemon will use.
    pub fn apply_settings(&mut self, settings: &Settings) {
        if let Some(socket) = settings.socket_filename() {
            self.socket = PathBuf::from(socket);
        }
        if let Some(log_dir) = settings.log_dir() {
            self.log_dir = PathBuf::from(log_dir);
        }
        if let Some(output_dir) = settings.output_dir() {
            self.output_dir = PathBuf::from(output_dir);
        }
    }

    /// Path to the server log file inside [`Self::log_dir`].
    pub fn server_log_file(&self) -> PathBuf {
        self.log_dir.join("suqd.log")
    }

    /// Path to the job log file inside [`Self::log_dir`].
    pub fn job_log_file(&self) -> PathBuf {
        self.log_dir.join("jobs.log")
    }

    /// Creates every directory a daemon needs before it can bind its
    /// socket or open its first log file. Failure here is always fatal at
    /// init (spec.md §4.B).
    pub fn create_dirs(&self) -> std::io::Result<()> {
        if let Some(parent) = self.socket.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::create_dir_all(&self.log_dir)?;
        std::fs::create_dir_all(&self.output_dir)?;
        if let Some(parent) = self.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
