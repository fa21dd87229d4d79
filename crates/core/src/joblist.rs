// SPDX-License-Identifier: MIT

use crate::job::{Job, JobId, JobState, TaskCount};
use crate::RESOURCE_ERROR_MESSAGE;

/// Outcome of attempting to start one job, as decided by the caller's
/// process-spawning side effect. Kept separate from `Job` itself so the
/// scheduling algorithm in this crate stays free of fork/exec and is fully
/// exercisable with a fake.
#[derive(Debug)]
pub enum StartOutcome {
    Started { pid: u32 },
    /// Transient: the OS is out of some resource (e.g. fork hit `EAGAIN`).
    /// The job stays waiting and the whole admission walk stops for this
    /// pass, to be retried next time.
    WouldBlock,
    /// Permanent for this attempt: record a run_error and keep admitting
    /// other waiting jobs.
    Failed(String),
}

/// Performs the side-effecting half of starting a job. Implemented by the
/// daemon using `tokio::process::Command`; a test double can fake spawn
/// results without touching the OS.
pub trait Starter {
    fn start(&mut self, job: &Job) -> StartOutcome;
}

/// A job that finished (one way or another) during a scheduler pass, handed
/// back so the daemon can log it, wake waiters, and remove it from the
/// connection's view.
#[derive(Debug, Clone)]
pub struct FinishedJob {
    pub id: JobId,
    pub name: String,
    pub state: JobState,
    pub exit_status: Option<i32>,
}

/// Everything that changed during one `scheduler_pass` call.
#[derive(Debug, Default)]
pub struct SchedulerReport {
    pub started: Vec<JobId>,
    pub run_errors: Vec<(JobId, String)>,
    pub resource_errors: Vec<JobId>,
    pub finished: Vec<FinishedJob>,
}

/// The in-memory queue of jobs, always kept sorted by [`Job::cmp_order`].
///
/// There is no intrusive linked list here (unlike the original C joblist):
/// a plain `Vec` resorted on demand is simpler and, at the scale a
/// single-user job queue operates at, exactly as fast.
#[derive(Debug, Default)]
pub struct JobList {
    jobs: Vec<Job>,
    next_run_order: u64,
}

impl JobList {
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            next_run_order: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn insert(&mut self, job: Job) {
        let pos = self
            .jobs
            .binary_search_by(|existing| existing.cmp_order(&job))
            .unwrap_or_else(|p| p);
        self.jobs.insert(pos, job);
    }

    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id() == id)
    }

    pub fn get_mut(&mut self, id: JobId) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|j| j.id() == id)
    }

    pub fn remove(&mut self, id: JobId) -> Option<Job> {
        let idx = self.jobs.iter().position(|j| j.id() == id)?;
        Some(self.jobs.remove(idx))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }

    pub fn find_by_pid(&mut self, pid: u32) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|j| j.pid() == Some(pid))
    }

    /// Re-sorts a single job after an in-place mutation that can change its
    /// sort key (currently only `pri`, which changes a waiting job's
    /// priority).
    pub fn reposition(&mut self, id: JobId) {
        let Some(idx) = self.jobs.iter().position(|j| j.id() == id) else {
            return;
        };
        let job = self.jobs.remove(idx);
        self.insert(job);
    }

    /// Total task-weight currently charged against the budget: every job
    /// in `started` or `running`. Jobs marked `canceled` stop counting
    /// immediately even though their process may still be tearing down;
    /// see the data model notes on why that is intentional.
    pub fn committed_weight(&self, budget: u32) -> u32 {
        self.jobs
            .iter()
            .filter(|j| j.state().is_active())
            .map(|j| j.ntask().weight(budget))
            .sum()
    }

    /// Re-evaluates every `resource_error` job against a (possibly just
    /// raised) budget, moving back to `waiting` any whose weight now fits.
    /// Called by the `ntask` verb before the next scheduler pass so a job
    /// that no longer exceeds the budget gets a chance to run again; never
    /// moves a job the other way (see invariant 5: shrinking the budget
    /// must not bump a `waiting` job into `resource_error` here — that is
    /// `scheduler_pass`'s job, on its own admission walk).
    pub fn reconsider_resource_errors(&mut self, budget: u32) {
        let revived: Vec<JobId> = self
            .jobs
            .iter()
            .filter(|j| j.state() == JobState::ResourceError && j.ntask().weight(budget) <= budget)
            .map(|j| j.id())
            .collect();
        for id in revived {
            if let Some(job) = self.get_mut(id) {
                job.revert_to_waiting();
            }
            self.reposition(id);
        }
    }

    /// Runs one reconcile-then-admit pass: `started` jobs observed since
    /// the last pass become `running`; jobs that finished reaping are
    /// dropped from the list; then as many waiting jobs as fit the budget,
    /// in priority order, are started. Admission is non-backfilling: the
    /// first waiting job that does not fit stops the walk even if a
    /// smaller job further back would have fit.
    pub fn scheduler_pass(
        &mut self,
        budget: u32,
        now: u64,
        starter: &mut impl Starter,
    ) -> SchedulerReport {
        let mut report = SchedulerReport::default();

        let mut finished_ids = Vec::new();
        for job in self.jobs.iter_mut() {
            match job.state() {
                JobState::Started => job.mark_running(),
                JobState::Done => {
                    finished_ids.push(job.id());
                    report.finished.push(FinishedJob {
                        id: job.id(),
                        name: job.name().to_string(),
                        state: job.state(),
                        exit_status: job.exit_status(),
                    });
                }
                JobState::Canceled if job.end_time().is_some() => {
                    finished_ids.push(job.id());
                    report.finished.push(FinishedJob {
                        id: job.id(),
                        name: job.name().to_string(),
                        state: job.state(),
                        exit_status: job.exit_status(),
                    });
                }
                _ => {}
            }
        }
        for id in finished_ids {
            self.remove(id);
        }

        let mut committed = self.committed_weight(budget);
        let waiting_ids: Vec<JobId> = self
            .jobs
            .iter()
            .filter(|j| j.state() == JobState::Waiting)
            .map(|j| j.id())
            .collect();

        for id in waiting_ids {
            let Some(job) = self.get(id) else { continue };
            let weight = job.ntask().weight(budget);

            if weight > budget {
                if let Some(job) = self.get_mut(id) {
                    job.mark_resource_error(RESOURCE_ERROR_MESSAGE);
                }
                report.resource_errors.push(id);
                continue;
            }

            if job.ntask().is_blocking() && committed > 0 {
                break;
            }
            if committed + weight > budget {
                break;
            }

            let outcome = starter.start(job);
            match outcome {
                StartOutcome::Started { pid } => {
                    let run_order = self.next_run_order;
                    self.next_run_order += 1;
                    if let Some(job) = self.get_mut(id) {
                        job.mark_started(pid, run_order, now);
                    }
                    self.reposition(id);
                    committed += weight;
                    report.started.push(id);
                }
                StartOutcome::WouldBlock => break,
                StartOutcome::Failed(message) => {
                    if let Some(job) = self.get_mut(id) {
                        job.mark_run_error(message.clone(), now);
                    }
                    self.reposition(id);
                    report.run_errors.push((id, message));
                }
            }
        }

        report
    }
}

#[cfg(test)]
#[path = "joblist_tests.rs"]
mod tests;
