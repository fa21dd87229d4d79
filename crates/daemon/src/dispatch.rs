// SPDX-License-Identifier: MIT

//! Decodes a [`Command`] against the current [`DaemonState`] and produces
//! exactly one reply (spec.md §4.D). Every verb here is a plain function
//! over owned state — no panics, no process-global anything — so this
//! module is unit-testable without a socket in sight.

use std::path::{Path, PathBuf};

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use suq_core::{Clock, Job, JobId, JobState, Starter, TaskCount, Wait};
use suq_wire::{self as wire, Command, JobTarget, RequestFrame};
use tracing::warn;

use crate::connection::ConnId;
use crate::state::DaemonState;

/// Outcome of dispatching one request: the text to send back, and whether
/// the connection should be kept alive afterward (only `wait`, when it
/// parks, sets this).
pub struct Dispatched {
    pub reply: String,
    pub keep_alive: bool,
}

fn reply(text: impl Into<String>) -> Dispatched {
    Dispatched {
        reply: text.into(),
        keep_alive: false,
    }
}

/// Sends `SIGTERM` to a job's process group. The job was started with
/// `setpgid(0, 0)` (spec.md §4.E), so its pid doubles as its pgid; negating
/// it is the same `killpg` idiom the original uses.
fn terminate_process_group(pid: u32) {
    let pgid = Pid::from_raw(-(pid as i32));
    if let Err(e) = kill(pgid, Signal::SIGTERM) {
        warn!(pid, error = %e, "failed to signal job's process group");
    }
}

fn job_name_from_command(cmd: &str) -> String {
    Path::new(cmd).file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| cmd.to_string())
}

/// Decodes one raw request frame and dispatches it, folding a parse failure
/// into the same `ERROR: ...` reply convention a rejected command uses
/// (spec.md §4.D) rather than tearing the connection down.
pub fn handle_request(
    state: &mut DaemonState,
    starter: &mut impl Starter,
    clock: &dyn Clock,
    conn: ConnId,
    frame: &RequestFrame,
) -> Dispatched {
    match Command::parse(frame) {
        Ok(cmd) => dispatch(state, starter, clock, conn, cmd),
        Err(e) => reply(wire::error_reply(e)),
    }
}

pub fn dispatch(
    state: &mut DaemonState,
    starter: &mut impl Starter,
    clock: &dyn Clock,
    conn: ConnId,
    cmd: Command,
) -> Dispatched {
    match cmd {
        Command::Run {
            cwd,
            argv,
            envp,
            ntask,
            blocking,
            priority,
        } => dispatch_run(state, starter, clock, cwd, argv, envp, ntask, blocking, priority),
        Command::Del(target) => dispatch_del(state, target),
        Command::Pri(target, priority) => dispatch_pri(state, target, priority),
        Command::Info(target) => dispatch_info(state, target),
        Command::List => reply(wire::list_reply(
            state.jobs.iter(),
            state.jobs.committed_weight(state.settings.ntask()),
            state.settings.ntask(),
        )),
        Command::Ntask(n) => dispatch_ntask(state, starter, clock, n),
        Command::Wait(target) => dispatch_wait(state, conn, clock, target),
        Command::Help => reply(wire::USAGE),
        Command::Echo(tokens) => reply(wire::echo_reply(&tokens)),
    }
}

#[allow(clippy::too_many_arguments)]
fn dispatch_run(
    state: &mut DaemonState,
    starter: &mut impl Starter,
    clock: &dyn Clock,
    cwd: String,
    argv: Vec<String>,
    envp: Vec<String>,
    ntask: Option<u32>,
    blocking: bool,
    priority: i32,
) -> Dispatched {
    let ntask_count = if blocking {
        TaskCount::Blocking
    } else {
        TaskCount::Slots(ntask.unwrap_or(1))
    };
    let now = clock.now();
    let id = state.settings.alloc_id();
    let name = job_name_from_command(&argv[0]);
    let output_path = PathBuf::from(&cwd).join(format!("{name}.{}.out", id.get()));
    let job = Job::new(id, name, PathBuf::from(cwd), argv, envp, ntask_count, priority, now, output_path);
    state.jobs.insert(job);
    state.persist_settings();
    state.jobs.scheduler_pass(state.settings.ntask(), now, starter);

    let Some(job) = state.jobs.get(id) else {
        return reply(wire::job_not_found_reply());
    };
    reply(wire::submit_reply(job))
}

fn dispatch_del(state: &mut DaemonState, target: JobTarget) -> Dispatched {
    let ids: Vec<JobId> = match target {
        JobTarget::All => state.jobs.iter().map(|j| j.id()).collect(),
        JobTarget::Id(n) => state
            .jobs
            .get(JobId::new(n))
            .map(|j| vec![j.id()])
            .unwrap_or_default(),
    };
    if ids.is_empty() {
        return reply(wire::job_not_found_reply());
    }

    let mut out = String::new();
    for id in ids {
        let Some(job) = state.jobs.get(id) else { continue };
        if job.state() == JobState::Running {
            if let Some(pid) = job.pid() {
                terminate_process_group(pid);
            }
            let Some(job) = state.jobs.get_mut(id) else { continue };
            job.mark_canceled();
            out.push_str(&wire::del_killed_reply(job));
        } else {
            let Some(removed) = state.jobs.remove(id) else { continue };
            out.push_str(&wire::del_removed_reply(&removed));
        }
    }
    reply(out)
}

fn dispatch_pri(state: &mut DaemonState, target: JobTarget, priority: i32) -> Dispatched {
    let ids: Vec<JobId> = match target {
        JobTarget::All => state.jobs.iter().map(|j| j.id()).collect(),
        JobTarget::Id(n) => state
            .jobs
            .get(JobId::new(n))
            .map(|j| vec![j.id()])
            .unwrap_or_default(),
    };
    if ids.is_empty() {
        return reply(wire::job_not_found_reply());
    }

    let mut out = String::new();
    for id in ids {
        let Some(job) = state.jobs.get(id) else { continue };
        let old = job.priority();
        if old == priority {
            continue;
        }
        if let Some(job) = state.jobs.get_mut(id) {
            job.set_priority(priority);
        }
        state.jobs.reposition(id);
        out.push_str(&wire::pri_changed_reply(id, old, priority));
    }
    if out.is_empty() {
        out = wire::pri_unchanged_reply();
    }
    reply(out)
}

fn dispatch_info(state: &DaemonState, target: JobTarget) -> Dispatched {
    let jobs: Vec<&Job> = match target {
        JobTarget::All => state.jobs.iter().collect(),
        JobTarget::Id(n) => state.jobs.get(JobId::new(n)).into_iter().collect(),
    };
    if jobs.is_empty() {
        return reply(wire::job_not_found_reply());
    }
    let mut out = String::new();
    for job in jobs {
        out.push_str(&wire::info_reply(job));
    }
    reply(out)
}

fn dispatch_ntask(
    state: &mut DaemonState,
    starter: &mut impl Starter,
    clock: &dyn Clock,
    n: i64,
) -> Dispatched {
    if n < 1 {
        return reply(wire::error_reply("ntask must be at least 1"));
    }
    let n = n as u32;
    state.settings.set_ntask(n);
    state.persist_settings();
    state.jobs.reconsider_resource_errors(n);
    state.jobs.scheduler_pass(n, clock.now(), starter);
    reply(wire::ntask_reply(n))
}

fn dispatch_wait(
    state: &mut DaemonState,
    conn: ConnId,
    clock: &dyn Clock,
    target: Option<JobTarget>,
) -> Dispatched {
    use suq_core::WaitKind;

    let kind = match target {
        None => WaitKind::SubmittedBefore(clock.now()),
        Some(JobTarget::All) => WaitKind::All,
        Some(JobTarget::Id(n)) => WaitKind::ById(JobId::new(n)),
    };

    let probe = Wait { kind, conn };
    if probe.is_satisfied(&state.jobs) {
        return reply(wire::wait_already_satisfied_reply());
    }

    state.waits.register(kind, conn);
    Dispatched {
        reply: wire::wait_registered_reply(),
        keep_alive: true,
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
