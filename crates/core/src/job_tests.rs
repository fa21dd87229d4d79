use super::*;
use std::path::PathBuf;

fn job(id: u32, state: JobState, priority: i32, sub_time: u64) -> Job {
    let mut j = Job::new(
        JobId::new(id),
        "echo".into(),
        PathBuf::from("/tmp"),
        vec!["echo".into()],
        vec![],
        TaskCount::Slots(1),
        priority,
        sub_time,
        PathBuf::from("/tmp/echo.out"),
    );
    if state != JobState::Waiting {
        j.mark_started(100, 0, sub_time);
    }
    if state == JobState::Running {
        j.mark_running();
    }
    if state == JobState::ResourceError {
        j.mark_resource_error("too big");
    }
    j
}

#[test]
fn active_states_sort_ahead_of_queued_and_finished_ones() {
    let waiting = job(1, JobState::Waiting, 0, 10);
    let err = job(2, JobState::ResourceError, 0, 20);
    let mut running = job(3, JobState::Waiting, 0, 30);
    running.mark_started(10, 1, 30);
    running.mark_running();

    assert_eq!(running.cmp_order(&waiting), Ordering::Less);
    assert_eq!(waiting.cmp_order(&err), Ordering::Less);
}

#[test]
fn waiting_jobs_rank_by_priority_then_submission() {
    let low_pri = job(1, JobState::Waiting, 0, 10);
    let high_pri = job(2, JobState::Waiting, 5, 20);
    assert_eq!(high_pri.cmp_order(&low_pri), Ordering::Less);

    let earlier = job(3, JobState::Waiting, 0, 10);
    let later = job(4, JobState::Waiting, 0, 20);
    assert_eq!(earlier.cmp_order(&later), Ordering::Less);
}

#[test]
fn started_jobs_still_rank_by_priority_until_promoted() {
    let mut low_pri = job(1, JobState::Waiting, 0, 10);
    low_pri.mark_started(10, 5, 10);
    let mut high_pri = job(2, JobState::Waiting, 9, 20);
    high_pri.mark_started(11, 1, 20);

    // run_order favors job 1, but started jobs sort by priority, not
    // run_order, until the next scheduler pass promotes them to running.
    assert_eq!(high_pri.cmp_order(&low_pri), Ordering::Less);
}

#[test]
fn running_jobs_rank_by_run_order_earliest_first() {
    let mut first = job(1, JobState::Waiting, 0, 10);
    first.mark_started(10, 1, 10);
    first.mark_running();
    let mut second = job(2, JobState::Waiting, 0, 10);
    second.mark_started(11, 2, 10);
    second.mark_running();
    assert_eq!(first.cmp_order(&second), Ordering::Less);
}

#[test]
fn canceled_job_keeps_state_through_reap() {
    let mut j = job(1, JobState::Waiting, 0, 10);
    j.mark_started(10, 1, 10);
    j.mark_running();
    j.mark_canceled();
    j.mark_reaped(-15, 42);
    assert_eq!(j.state(), JobState::Canceled);
    assert_eq!(j.end_time(), Some(42));
}

#[test]
fn running_job_becomes_done_on_reap() {
    let mut j = job(1, JobState::Waiting, 0, 10);
    j.mark_started(10, 1, 10);
    j.mark_running();
    j.mark_reaped(0, 42);
    assert_eq!(j.state(), JobState::Done);
}

#[test]
fn terminal_states_sort_by_descending_declared_order_not_declaration_position() {
    // Declared order is (run_error, resource_error, waiting, started,
    // running, done, canceled); the list sorts *descending* on that, so a
    // canceled job floats ahead of a done one, which floats ahead of a
    // running one, all the way down to a stuck run_error job at the very
    // back — not the other way around.
    let mut canceled = job(1, JobState::Waiting, 0, 10);
    canceled.mark_started(10, 1, 10);
    canceled.mark_running();
    canceled.mark_canceled();

    let mut done = job(2, JobState::Waiting, 0, 10);
    done.mark_started(11, 2, 10);
    done.mark_running();
    done.mark_reaped(0, 20);

    let running = {
        let mut j = job(3, JobState::Waiting, 0, 10);
        j.mark_started(12, 3, 10);
        j.mark_running();
        j
    };

    let mut run_error = job(4, JobState::Waiting, 0, 10);
    run_error.mark_started(13, 4, 10);
    run_error.mark_run_error("boom", 20);

    assert_eq!(canceled.cmp_order(&done), Ordering::Less);
    assert_eq!(done.cmp_order(&running), Ordering::Less);
    assert_eq!(run_error.cmp_order(&canceled), Ordering::Greater);
}

#[test]
fn blocking_job_weight_is_full_budget() {
    assert_eq!(TaskCount::Blocking.weight(8), 8);
    assert_eq!(TaskCount::Slots(3).weight(8), 3);
}
