// SPDX-License-Identifier: MIT

use crate::job::JobId;
use crate::joblist::JobList;

/// Opaque handle identifying a connection to the daemon. Defined here (not
/// as a raw `usize`) so the wait bookkeeping reads clearly, but the actual
/// representation is owned by the daemon's connection table.
pub type ConnHandle = usize;

/// What a registered wait is blocked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitKind {
    /// Wait for one specific job, by id, to leave the list.
    ById(JobId),
    /// Wait for every job submitted at or before this timestamp to finish.
    /// A bare `wait` with no job id resolves to this, stamped with the
    /// time the request was received, so jobs submitted afterward don't
    /// extend the wait.
    SubmittedBefore(u64),
    /// Wait for the job list to become empty outright, including jobs
    /// submitted after the wait was registered (`wait all`). Stricter than
    /// `SubmittedBefore`, which only ever looks backward from the moment
    /// the wait was issued.
    All,
}

/// One connection's pending wait request.
#[derive(Debug, Clone, Copy)]
pub struct Wait {
    pub kind: WaitKind,
    pub conn: ConnHandle,
}

impl Wait {
    pub fn is_satisfied(&self, jobs: &JobList) -> bool {
        match self.kind {
            WaitKind::ById(id) => jobs.get(id).is_none(),
            // Only a `done` job is ever actually removed from the list on
            // its own (on the next scheduler pass); resource_error,
            // run_error, and canceled jobs all stay put until an explicit
            // `del`, so they still have to block this the same as a
            // waiting/running one would.
            WaitKind::SubmittedBefore(threshold) => {
                !jobs.iter().any(|j| j.sub_time() < threshold)
            }
            WaitKind::All => jobs.is_empty(),
        }
    }
}

/// Tracks every connection currently blocked in a `wait` request.
#[derive(Debug, Default)]
pub struct WaitList {
    waits: Vec<Wait>,
}

impl WaitList {
    pub fn new() -> Self {
        Self { waits: Vec::new() }
    }

    pub fn register(&mut self, kind: WaitKind, conn: ConnHandle) {
        self.waits.push(Wait { kind, conn });
    }

    /// Drops any wait registered by a connection that has gone away
    /// (client disconnected before its condition was met).
    pub fn remove_for_conn(&mut self, conn: ConnHandle) {
        self.waits.retain(|w| w.conn != conn);
    }

    /// Re-evaluates every registered wait against the current job list,
    /// removing and returning the connections whose condition now holds.
    pub fn drain_satisfied(&mut self, jobs: &JobList) -> Vec<ConnHandle> {
        self.drain_satisfied_full(jobs).into_iter().map(|w| w.conn).collect()
    }

    /// Same sweep as [`Self::drain_satisfied`], but keeps the `WaitKind`
    /// each satisfied wait was registered with, since the unsolicited
    /// reply text differs by kind (`"Finished job id N."` vs `"Finished
    /// all pending jobs."` vs `"Finished all jobs."`, spec.md §4.F) and a
    /// bare `ConnHandle` can't tell those apart.
    pub fn drain_satisfied_full(&mut self, jobs: &JobList) -> Vec<Wait> {
        let mut satisfied = Vec::new();
        self.waits.retain(|wait| {
            if wait.is_satisfied(jobs) {
                satisfied.push(*wait);
                false
            } else {
                true
            }
        });
        satisfied
    }

    pub fn is_empty(&self) -> bool {
        self.waits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.waits.len()
    }
}

#[cfg(test)]
#[path = "wait_tests.rs"]
mod tests;
