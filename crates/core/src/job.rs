// SPDX-License-Identifier: MIT

use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;

/// Numeric job identifier, recycled from a small ring by the config store's
/// `next_id` allocator rather than ever growing unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u32);

impl JobId {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How many of the budget's task slots a job occupies while running.
///
/// `Blocking` jobs (submitted with `-b`) occupy the entire budget by
/// themselves: the scheduler will not start one until nothing else is
/// running, and will not start anything else while one is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskCount {
    Slots(u32),
    Blocking,
}

impl TaskCount {
    /// Slots this job consumes against the budget while active. Blocking
    /// jobs report the full budget so a single admission check covers both
    /// cases identically.
    pub fn weight(self, budget: u32) -> u32 {
        match self {
            TaskCount::Slots(n) => n,
            TaskCount::Blocking => budget,
        }
    }

    pub fn is_blocking(self) -> bool {
        matches!(self, TaskCount::Blocking)
    }
}

impl fmt::Display for TaskCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskCount::Slots(n) => write!(f, "{n}"),
            TaskCount::Blocking => write!(f, "all"),
        }
    }
}

/// Lifecycle state of a job. Declaration order is significant: it is the
/// raw enum value the job list sorts on, descending, for its primary sort
/// axis — so front-to-back in `ls`/`info` output is `Canceled`, `Done`,
/// `Running`, `Started`, `Waiting`, `ResourceError`, `RunError`, matching the
/// original daemon's raw-enum-value-descending comparator exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum JobState {
    RunError,
    ResourceError,
    Waiting,
    Started,
    Running,
    Done,
    Canceled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::RunError | JobState::ResourceError | JobState::Done | JobState::Canceled
        )
    }

    pub fn is_active(self) -> bool {
        matches!(self, JobState::Started | JobState::Running)
    }

    pub fn label(self) -> &'static str {
        match self {
            JobState::RunError => "run_error",
            JobState::ResourceError => "resource_error",
            JobState::Waiting => "waiting",
            JobState::Started => "started",
            JobState::Running => "running",
            JobState::Done => "done",
            JobState::Canceled => "canceled",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single queued, running, or finished unit of work.
///
/// Timestamps are second-resolution, matching the granularity every
/// client-visible reply uses.
#[derive(Debug, Clone)]
pub struct Job {
    id: JobId,
    name: String,
    cwd: PathBuf,
    argv: Vec<String>,
    envp: Vec<String>,
    ntask: TaskCount,
    priority: i32,
    state: JobState,
    sub_time: u64,
    start_time: Option<u64>,
    end_time: Option<u64>,
    run_order: u64,
    pid: Option<u32>,
    exit_status: Option<i32>,
    output_path: PathBuf,
    note: Option<String>,
}

impl Job {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: JobId,
        name: String,
        cwd: PathBuf,
        argv: Vec<String>,
        envp: Vec<String>,
        ntask: TaskCount,
        priority: i32,
        sub_time: u64,
        output_path: PathBuf,
    ) -> Self {
        Self {
            id,
            name,
            cwd,
            argv,
            envp,
            ntask,
            priority,
            state: JobState::Waiting,
            sub_time,
            start_time: None,
            end_time: None,
            run_order: 0,
            pid: None,
            exit_status: None,
            output_path,
            note: None,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cwd(&self) -> &std::path::Path {
        &self.cwd
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn envp(&self) -> &[String] {
        &self.envp
    }

    pub fn ntask(&self) -> TaskCount {
        self.ntask
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn sub_time(&self) -> u64 {
        self.sub_time
    }

    pub fn start_time(&self) -> Option<u64> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<u64> {
        self.end_time
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn exit_status(&self) -> Option<i32> {
        self.exit_status
    }

    pub fn output_path(&self) -> &std::path::Path {
        &self.output_path
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn run_order(&self) -> u64 {
        self.run_order
    }

    /// Waiting -> Started. `run_order` is a process-wide monotonic counter
    /// handed out by the scheduler; it is what keeps started/running jobs
    /// ordered by admission order rather than re-sorting on every pass.
    pub fn mark_started(&mut self, pid: u32, run_order: u64, now: u64) {
        debug_assert_eq!(self.state, JobState::Waiting);
        self.state = JobState::Started;
        self.pid = Some(pid);
        self.run_order = run_order;
        self.start_time = Some(now);
    }

    /// Started -> Running, observed on the scheduler pass after the one
    /// that started the job (mirrors the two-phase check in the original
    /// reconciliation loop: a job is "started" for exactly one pass).
    pub fn mark_running(&mut self) {
        debug_assert_eq!(self.state, JobState::Started);
        self.state = JobState::Running;
    }

    /// Waiting -> ResourceError. The job will never fit the configured
    /// budget; it is left in the list (not silently dropped) so `info`/`ls`
    /// can still report on it, exactly like a run_error.
    pub fn mark_resource_error(&mut self, message: impl Into<String>) {
        self.state = JobState::ResourceError;
        self.note = Some(message.into());
    }

    /// Started -> RunError. Spawning failed after the scheduler already
    /// counted this job's slots against the budget for this pass; the slots
    /// are released back by simply no longer being started/running.
    pub fn mark_run_error(&mut self, message: impl Into<String>, now: u64) {
        self.state = JobState::RunError;
        self.note = Some(message.into());
        self.end_time = Some(now);
    }

    /// ResourceError -> Waiting, when a raised task budget makes the job
    /// fit again. Clears the fixed error note so `info`/`ls` stop showing
    /// it once the job is back in the ordinary queue.
    pub fn revert_to_waiting(&mut self) {
        debug_assert_eq!(self.state, JobState::ResourceError);
        self.state = JobState::Waiting;
        self.note = None;
    }

    /// Running -> Canceled, on `del` of a job already running. The process
    /// group has been sent SIGTERM but may still be alive; accounting is
    /// finalized later by `mark_reaped`.
    pub fn mark_canceled(&mut self) {
        self.state = JobState::Canceled;
    }

    /// Reaper matched this job's pid to an exited child. Running jobs
    /// become Done; jobs already Canceled stay Canceled (cancellation is a
    /// terminal outcome in its own right, not downgraded to Done).
    pub fn mark_reaped(&mut self, exit_status: i32, now: u64) {
        if self.state == JobState::Running {
            self.state = JobState::Done;
        }
        self.exit_status = Some(exit_status);
        self.end_time = Some(now);
    }

    /// Primary sort axis: state (descending on its raw declared order, see
    /// [`JobState`]), then a state-specific key, then submission order,
    /// then id. Implemented as a free function rather than `Ord` because
    /// the state-specific key depends on which state the job is in: once a
    /// job is actually `running` it's ordered by admission order
    /// (`run_order`, earliest first) so it keeps its place even if a
    /// higher-priority job is submitted later; every other state (including
    /// `started`, which hasn't been promoted by a scheduler pass yet) sorts
    /// by priority, higher first.
    fn sort_key(&self) -> (std::cmp::Reverse<JobState>, i64, u64, u32) {
        let state_specific = match self.state {
            JobState::Running => self.run_order as i64,
            _ => -(self.priority as i64),
        };
        (
            std::cmp::Reverse(self.state),
            state_specific,
            self.sub_time,
            self.id.get(),
        )
    }

    pub fn cmp_order(&self, other: &Job) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
