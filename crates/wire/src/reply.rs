// SPDX-License-Identifier: MIT

use std::fmt::Write as _;

use suq_core::{Job, JobState, TaskCount};

/// Full help text, sent back verbatim for `suq help` and appended to every
/// command-parse-error reply so a mistyped command always shows the caller
/// what they could have typed instead.
pub const USAGE: &str = "\
usage: suq <command> [args]

commands:
  run [-d workdir] [-n ntasks] [-p priority] [-b] cmd [args...]
      queue cmd for execution (alias: sub)
  del (all|id)
      cancel a queued or running job
  pri id priority
      change a queued job's priority
  info (all|id)
      show one job's detail
  ls
      list all jobs (alias: list)
  wait [all|id]
      block until the given job, or all jobs, finish
  ntask n
      get or set the number of task slots available (alias: nproc)
  echo [args...]
      print back the tokens received, for plumbing smoke tests
  help
      show this message
";

/// An error reply always starts with this token; the client uses it to
/// decide whether the reply goes to stderr with a nonzero exit code.
const ERROR_PREFIX: &str = "ERROR";

/// True if `reply` is an error reply, i.e. it begins with the token the
/// client watches for to route output to stderr and set a nonzero exit
/// status.
pub fn is_error_reply(reply: &str) -> bool {
    reply.starts_with(ERROR_PREFIX)
}

/// Builds a command-parse-error reply: the message, then a blank line,
/// then the full usage text. Used for bad verbs/flags, not for lookup
/// failures (`del`/`pri`/`info` on an unknown id use [`job_not_found_reply`]
/// instead, with no usage attached).
pub fn error_reply(message: impl std::fmt::Display) -> String {
    format!("{ERROR_PREFIX}: {message}\n{USAGE}\n")
}

/// `del`/`pri`/`info` reply when the target id (or `all` with an empty
/// list) matches nothing.
pub fn job_not_found_reply() -> String {
    format!("{ERROR_PREFIX}: Job not found\n")
}

/// Renders a job's state the way client-visible text wants it: a short
/// title-cased word rather than the snake_case label used internally.
fn state_display(state: JobState) -> &'static str {
    match state {
        JobState::Running => "Running",
        JobState::Started => "Started",
        JobState::Waiting => "Waiting",
        JobState::ResourceError => "ResourceError",
        JobState::RunError => "RunError",
        JobState::Done => "Done",
        JobState::Canceled => "Canceled",
    }
}

fn ntask_display(ntask: TaskCount) -> String {
    match ntask {
        TaskCount::Slots(n) => n.to_string(),
        TaskCount::Blocking => "block".to_string(),
    }
}

/// `run`/`sub` success reply: one line naming the id and name, immediately
/// followed by a state-dependent suffix. The three suffixes are reproduced
/// verbatim since spec.md's S1/S5 scenarios assert on them as substrings.
pub fn submit_reply(job: &Job) -> String {
    let head = format!("Submitted job id {}: '{}'. ", job.id(), job.name());
    let tail = match job.state() {
        JobState::Running | JobState::Started => "Job is running.\n".to_string(),
        JobState::Waiting => "Job is waiting to run.\n".to_string(),
        JobState::ResourceError | JobState::RunError => {
            format!("\nJob ERROR: '{}'.\n", job.note().unwrap_or_default())
        }
        other => format!("Job is {}.\n", state_display(other)),
    };
    head + &tail
}

/// `del` reply for one job that was only queued (never started), so it was
/// simply dropped from the list.
pub fn del_removed_reply(job: &Job) -> String {
    format!("Removed job id {}\n", job.id())
}

/// `del` reply for one job that was already running, so it was signalled
/// instead of just dropped.
pub fn del_killed_reply(job: &Job) -> String {
    format!("Killed job id {}\n", job.id())
}

/// `pri` reply for a job whose priority actually changed.
pub fn pri_changed_reply(id: impl std::fmt::Display, old: i32, new: i32) -> String {
    format!("Job id {id} priority set from {old} to {new}\n")
}

/// `pri` reply when every match already held the requested priority.
pub fn pri_unchanged_reply() -> String {
    "No job priority changed\n".to_string()
}

/// `ntask`/`nproc` reply: reports the budget after applying the change.
pub fn ntask_reply(n: u32) -> String {
    format!("Maximum number of tasks is set to: {n}\n")
}

/// One line of `ls` output: id, priority, state, task count, and name.
fn list_line(out: &mut String, job: &Job) {
    let _ = writeln!(
        out,
        "{:>4} {:>4} {:>7} {:>5} {}",
        job.id(),
        job.priority(),
        state_display(job.state()),
        ntask_display(job.ntask()),
        job.name(),
    );
}

/// `ls`/`list` success reply: running/budget header, a column header, then
/// one row per job — or a single "no jobs" line when the list is empty.
pub fn list_reply<'a>(jobs: impl IntoIterator<Item = &'a Job>, running: u32, budget: u32) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "running tasks: {running:>4}");
    let _ = writeln!(out, "max tasks: {budget:>4}");
    let _ = writeln!(out, "  ID PRIO   STATE NTASK NAME");
    let mut any = false;
    for job in jobs {
        any = true;
        list_line(&mut out, job);
    }
    if !any {
        out.push_str("   No jobs.\n");
    }
    out
}

/// `info` success reply: full detail for one job, one field per line.
pub fn info_reply(job: &Job) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Name: {}", job.name());
    let _ = writeln!(out, "Job id: {}", job.id());
    let _ = writeln!(out, "Priority: {}", job.priority());
    let _ = writeln!(out, "State: {}", state_display(job.state()));
    let _ = writeln!(out, "Submit time: {}", job.sub_time());
    if let Some(t) = job.start_time() {
        let _ = writeln!(out, "Start time: {t}");
    }
    if let Some(pid) = job.pid() {
        let _ = writeln!(out, "Process id: {pid}");
    }
    if let Some(t) = job.end_time() {
        let _ = writeln!(out, "End time: {t}");
    }
    if let Some(status) = job.exit_status() {
        let _ = writeln!(out, "Exit status: {status}");
    }
    if let Some(note) = job.note() {
        let _ = writeln!(out, "Error string: {note}");
    }
    let _ = writeln!(out, "Nr. of tasks: {}", ntask_display(job.ntask()));
    let _ = writeln!(out, "Command: {}", job.argv().join(" "));
    let _ = writeln!(out, "Nr. of args: {}", job.argv().len());
    let _ = writeln!(out, "Nr. of env vars: {}", job.envp().len());
    let _ = writeln!(out, "Working directory: {}", job.cwd().display());
    out.push('\n');
    out
}

/// `wait` reply when the connection parks: the predicate didn't hold yet.
pub fn wait_registered_reply() -> String {
    "Waiting...\n".to_string()
}

/// `wait` reply sent immediately when the predicate already holds at
/// request time — distinct from the asynchronous "Finished ..." replies
/// of [`wait_finished_by_id_reply`] and friends, which are only ever sent
/// later, unsolicited, once a parked wait's predicate fires.
pub fn wait_already_satisfied_reply() -> String {
    "Nothing to wait for.\n".to_string()
}

/// Unsolicited reply once a `wait ID` predicate fires.
pub fn wait_finished_by_id_reply(id: impl std::fmt::Display) -> String {
    format!("Finished job id {id}.\n")
}

/// Unsolicited reply once a bare `wait`'s `submitted-before` predicate
/// fires.
pub fn wait_finished_submitted_before_reply() -> String {
    "Finished all pending jobs.\n".to_string()
}

/// Unsolicited reply once a `wait all` predicate fires.
pub fn wait_finished_all_reply() -> String {
    "Finished all jobs.\n".to_string()
}

/// `echo` reply: `Echo:` followed by every token it was sent, each quoted.
pub fn echo_reply(tokens: &[String]) -> String {
    let mut out = String::from("Echo:");
    for token in tokens {
        let _ = write!(out, " '{token}'");
    }
    out.push('\n');
    out
}

#[cfg(test)]
#[path = "reply_tests.rs"]
mod tests;
