// SPDX-License-Identifier: MIT

//! Turns a waiting [`suq_core::Job`] into a running child process
//! (spec.md §4.E "Start"). Implements [`suq_core::Starter`] so the
//! scheduling algorithm in `suq-core` stays free of any actual fork/exec.

use std::fs::OpenOptions;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use suq_core::{Job, StartOutcome, Starter};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Reported back to the event loop once a spawned child exits, so the
/// reaper can match it to a job without literally calling `waitpid` on a
/// background OS thread (tokio's process reaping does that for us; see
/// SPEC_FULL.md §4.G on this substitution).
#[derive(Debug)]
pub struct Reaped {
    pub pid: u32,
    pub exit_status: i32,
}

/// Resolves `cmd` to an executable path the way `execvp` would: verbatim
/// if it contains a `/`, otherwise searched across `PATH` from `envp` (or
/// the system default path if `envp` has none), first match wins
/// (spec.md §4.E "Start", "Path search").
fn resolve_executable(cmd: &str, envp: &[String]) -> Option<PathBuf> {
    if cmd.contains('/') {
        return Some(PathBuf::from(cmd));
    }
    let path_var = envp
        .iter()
        .find_map(|kv| kv.strip_prefix("PATH="))
        .unwrap_or("/usr/local/bin:/usr/bin:/bin:/usr/local/sbin:/usr/sbin:/sbin");

    for dir in path_var.split(':') {
        let dir = if dir.is_empty() { "." } else { dir };
        let candidate = Path::new(dir).join(cmd);
        if is_executable(&candidate) {
            return Some(candidate);
        }
    }
    None
}

fn is_executable(path: &Path) -> bool {
    std::fs::metadata(path).is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

/// The daemon's [`Starter`]: opens the job's output file, resolves its
/// executable, and spawns it detached from the daemon's own process
/// group. Every successfully spawned child is handed to a small reaper
/// task that awaits its exit and reports back over `reaped_tx` — the
/// async-native stand-in for the self-pipe-plus-`waitpid(WNOHANG)` loop of
/// spec.md §4.G/§4.H.
pub struct ProcessStarter {
    reaped_tx: mpsc::UnboundedSender<Reaped>,
}

impl ProcessStarter {
    pub fn new(reaped_tx: mpsc::UnboundedSender<Reaped>) -> Self {
        Self { reaped_tx }
    }
}

impl Starter for ProcessStarter {
    fn start(&mut self, job: &Job) -> StartOutcome {
        let Some(exe) = resolve_executable(&job.argv()[0], job.envp()) else {
            return StartOutcome::Failed(format!("{}: command not found", job.argv()[0]));
        };

        let output = match OpenOptions::new().create(true).write(true).truncate(true).open(job.output_path()) {
            Ok(f) => f,
            Err(e) => return StartOutcome::Failed(format!("failed to open output file: {e}")),
        };
        let output_err = match output.try_clone() {
            Ok(f) => f,
            Err(e) => return StartOutcome::Failed(format!("failed to duplicate output file: {e}")),
        };

        let mut command = Command::new(&exe);
        command
            .args(&job.argv()[1..])
            .current_dir(job.cwd())
            .env_clear()
            .envs(job.envp().iter().filter_map(|kv| kv.split_once('=')))
            .stdin(std::process::Stdio::null())
            .stdout(output)
            .stderr(output_err)
            .process_group(0)
            .kill_on_drop(false);

        match command.spawn() {
            Ok(mut child) => {
                let Some(pid) = child.id() else {
                    return StartOutcome::Failed("child exited before reporting a pid".to_string());
                };
                let tx = self.reaped_tx.clone();
                tokio::spawn(async move {
                    let status = child.wait().await;
                    let exit_status = status.map(exit_code).unwrap_or(-1);
                    let _ = tx.send(Reaped { pid, exit_status });
                });
                info!(pid, name = job.name(), "job started");
                StartOutcome::Started { pid }
            }
            Err(e) if e.raw_os_error() == Some(nix::errno::Errno::EAGAIN as i32) => {
                StartOutcome::WouldBlock
            }
            Err(e) => {
                warn!(name = job.name(), error = %e, "failed to spawn job");
                StartOutcome::Failed(format!("exec failed: {e}"))
            }
        }
    }
}

/// `ExitStatus` -> a shell-style status code: the exit code if the process
/// exited normally, or `128 + signal` if it was killed by one, matching
/// common shell/`waitpid` reporting conventions.
fn exit_code(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status.code().unwrap_or_else(|| 128 + status.signal().unwrap_or(0))
}

#[cfg(test)]
#[path = "spawn_tests.rs"]
mod tests;
