use super::*;
use crate::job::{Job, JobState, TaskCount};
use std::path::PathBuf;

fn job(id: u32, sub_time: u64) -> Job {
    Job::new(
        JobId::new(id),
        format!("job{id}"),
        PathBuf::from("/tmp"),
        vec!["true".into()],
        vec![],
        TaskCount::Slots(1),
        0,
        sub_time,
        PathBuf::from(format!("/tmp/job{id}.out")),
    )
}

#[test]
fn wait_by_id_satisfied_once_job_removed() {
    let mut jobs = JobList::new();
    jobs.insert(job(1, 0));
    let mut waits = WaitList::new();
    waits.register(WaitKind::ById(JobId::new(1)), 7);

    assert!(waits.drain_satisfied(&jobs).is_empty());

    jobs.remove(JobId::new(1));
    assert_eq!(waits.drain_satisfied(&jobs), vec![7]);
    assert!(waits.is_empty());
}

#[test]
fn wait_all_ignores_jobs_submitted_after_the_wait() {
    let mut jobs = JobList::new();
    jobs.insert(job(1, 10));
    let mut waits = WaitList::new();
    waits.register(WaitKind::SubmittedBefore(5), 1);

    // job 1 was submitted after the wait's threshold, so it doesn't block.
    assert_eq!(waits.drain_satisfied(&jobs), vec![1]);
}

#[test]
fn wait_all_blocks_on_existing_active_jobs_until_removed() {
    let mut jobs = JobList::new();
    jobs.insert(job(1, 0));
    let mut waits = WaitList::new();
    waits.register(WaitKind::SubmittedBefore(5), 1);

    assert!(waits.drain_satisfied(&jobs).is_empty());

    jobs.remove(JobId::new(1));
    assert_eq!(waits.drain_satisfied(&jobs), vec![1]);
}

#[test]
fn wait_all_still_blocks_on_a_terminal_job_the_list_hasnt_dropped_yet() {
    // Only `done` jobs are ever swept from the list automatically; a
    // resource_error (or run_error, or canceled) job sticks around until an
    // explicit `del`, so it still has to block a submitted-before wait the
    // same as a waiting job would.
    let mut jobs = JobList::new();
    let mut j = job(1, 0);
    j.mark_resource_error("too big");
    jobs.insert(j);
    let mut waits = WaitList::new();
    waits.register(WaitKind::SubmittedBefore(5), 1);

    assert!(waits.drain_satisfied(&jobs).is_empty());

    jobs.remove(JobId::new(1));
    assert_eq!(waits.drain_satisfied(&jobs), vec![1]);
}

#[test]
fn wait_all_is_not_blocked_by_a_job_submitted_in_the_same_second_as_the_threshold() {
    // spec's "no job with sub_time < t remains" is a strict inequality:
    // a job submitted in the very same second as the wait's threshold
    // doesn't block it (timestamps are second-resolution, so same-second
    // collisions between a wait and a fresh submission are realistic).
    let mut jobs = JobList::new();
    jobs.insert(job(1, 5));
    let mut waits = WaitList::new();
    waits.register(WaitKind::SubmittedBefore(5), 1);

    assert_eq!(waits.drain_satisfied(&jobs), vec![1]);
}

#[test]
fn wait_kind_all_blocks_on_jobs_submitted_after_registration() {
    let mut jobs = JobList::new();
    let mut waits = WaitList::new();
    waits.register(WaitKind::All, 9);

    // `wait all` differs from `SubmittedBefore`: a job submitted after the
    // wait was registered still has to finish before it's satisfied.
    jobs.insert(job(1, 1_000));
    assert!(waits.drain_satisfied(&jobs).is_empty());

    jobs.remove(JobId::new(1));
    assert_eq!(waits.drain_satisfied(&jobs), vec![9]);
}

#[test]
fn disconnect_drops_pending_wait() {
    let jobs = JobList::new();
    let mut waits = WaitList::new();
    waits.register(WaitKind::ById(JobId::new(1)), 3);
    waits.remove_for_conn(3);
    assert!(waits.drain_satisfied(&jobs).is_empty());
    assert!(waits.is_empty());
}
