// SPDX-License-Identifier: MIT

//! End-to-end scenarios driving the real `suq`/`suqd` binaries over a
//! real socket, grounded in spec.md §8's S1–S6 walkthroughs. Every test
//! isolates its config file via a fresh tempdir (`SUQ_CONFIG_FILE`), but
//! the listening socket and output directory are uid+hostname-derived
//! and therefore shared with any other `suqd` for this user on this
//! host (spec.md §6: one daemon per user, by design) — these tests run
//! `#[serial]` and each drains its own jobs with `wait all` before
//! finishing, so the daemon self-terminates (idle, non-keep-alive) and
//! leaves a clean socket for the next test.

use std::process::Command as StdCommand;
use std::time::Duration;

use assert_cmd::cargo::CommandCargoExt;
use serial_test::serial;
use tempfile::tempdir;

fn suq() -> StdCommand {
    StdCommand::cargo_bin("suq").expect("suq binary built for this workspace")
}

/// Gives each test its own config file (and therefore its own `next_id`
/// counter) without needing to touch the shared socket path.
fn isolated_config() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempdir().expect("tempdir");
    let config = dir.path().join("config");
    (dir, config)
}

fn run_suq(config: &std::path::Path, args: &[&str]) -> std::process::Output {
    suq()
        .env("SUQ_CONFIG_FILE", config)
        .args(args)
        .output()
        .expect("suq invocation runs")
}

#[test]
#[serial]
fn s1_submit_and_list_reports_the_new_job() {
    let (_dir, config) = isolated_config();

    let submitted = run_suq(&config, &["run", "true"]);
    let stdout = String::from_utf8_lossy(&submitted.stdout).into_owned();
    assert!(stdout.starts_with("Submitted job id 1:"), "unexpected reply: {stdout}");
    assert!(submitted.status.success());

    let drained = run_suq(&config, &["wait", "all"]);
    assert!(drained.status.success());
}

#[test]
#[serial]
fn s2_priority_reorder_moves_a_waiting_job_ahead_by_id() {
    let (_dir, config) = isolated_config();

    // Default budget is 1 slot: job 1 takes the only slot and runs; jobs 2
    // and 3 both stay waiting behind it, ordered by submission until `pri`
    // raises job 3 above job 2.
    let first = run_suq(&config, &["run", "-n", "1", "sleep", "10"]);
    assert!(
        String::from_utf8_lossy(&first.stdout).starts_with("Submitted job id 1:"),
        "unexpected reply: {}",
        String::from_utf8_lossy(&first.stdout)
    );

    let second = run_suq(&config, &["run", "-n", "1", "sleep", "10"]);
    assert!(
        String::from_utf8_lossy(&second.stdout).starts_with("Submitted job id 2:"),
        "unexpected reply: {}",
        String::from_utf8_lossy(&second.stdout)
    );

    let third = run_suq(&config, &["run", "-n", "1", "sleep", "10"]);
    assert!(
        String::from_utf8_lossy(&third.stdout).starts_with("Submitted job id 3:"),
        "unexpected reply: {}",
        String::from_utf8_lossy(&third.stdout)
    );

    let pri = run_suq(&config, &["pri", "3", "10"]);
    let pri_stdout = String::from_utf8_lossy(&pri.stdout).into_owned();
    assert!(pri_stdout.contains("priority set from 0 to 10"), "unexpected reply: {pri_stdout}");

    let listed = run_suq(&config, &["ls"]);
    let stdout = String::from_utf8_lossy(&listed.stdout).into_owned();
    let ids: Vec<&str> = stdout
        .lines()
        .skip(3) // "running tasks:", "max tasks:", and the column header
        .filter_map(|line| line.split_whitespace().next())
        .collect();
    assert_eq!(ids, vec!["1", "3", "2"], "unexpected ls order:\n{stdout}");

    let deleted = run_suq(&config, &["del", "all"]);
    assert!(deleted.status.success());

    let drained = run_suq(&config, &["wait", "all"]);
    assert!(drained.status.success());
}

#[test]
#[serial]
fn s4_wait_all_blocks_until_the_queue_actually_drains() {
    let (_dir, config) = isolated_config();

    let first = run_suq(&config, &["run", "true"]);
    assert!(
        String::from_utf8_lossy(&first.stdout).starts_with("Submitted job id 1:"),
        "unexpected reply: {}",
        String::from_utf8_lossy(&first.stdout)
    );

    // A job that sleeps for a bit keeps `wait all` genuinely parked rather
    // than satisfied on the first check, so this exercises the "Waiting..."
    // interim reply followed by the real terminal one, not just an
    // already-satisfied bare `wait`.
    let second = run_suq(&config, &["run", "sleep", "1"]);
    assert!(
        String::from_utf8_lossy(&second.stdout).starts_with("Submitted job id 2:"),
        "unexpected reply: {}",
        String::from_utf8_lossy(&second.stdout)
    );

    let started = std::time::Instant::now();
    let drained = run_suq(&config, &["wait", "all"]);
    let elapsed = started.elapsed();
    let stdout = String::from_utf8_lossy(&drained.stdout).into_owned();

    assert!(drained.status.success());
    assert!(stdout.trim_end().ends_with("Finished all jobs."), "unexpected reply: {stdout}");
    // The client's read loop has to survive the interim "Waiting...\n"
    // reply and keep reading to EOF — if it stopped early this would
    // return almost immediately instead of actually blocking on job 2.
    assert!(elapsed >= Duration::from_millis(500), "wait all returned too early: {elapsed:?}\n{stdout}");
}

#[test]
#[serial]
fn s3_del_on_a_running_job_kills_its_process_group() {
    let (_dir, config) = isolated_config();

    let submitted = run_suq(&config, &["run", "sleep", "30"]);
    let stdout = String::from_utf8_lossy(&submitted.stdout).into_owned();
    assert!(stdout.contains("id 1"), "unexpected reply: {stdout}");

    // The event loop's scheduler pass runs before every request is
    // dispatched, so by the time this second connection is handled the
    // job has already been promoted out of `started` into `running`.
    let deleted = run_suq(&config, &["del", "1"]);
    let stdout = String::from_utf8_lossy(&deleted.stdout).into_owned();
    assert!(stdout.contains("Killed job id 1"), "unexpected reply: {stdout}");
    assert!(deleted.status.success());

    let drained = run_suq(&config, &["wait", "all"]);
    assert!(drained.status.success());
}

#[test]
#[serial]
fn s5_oversized_ntask_request_is_a_resource_error_not_a_crash() {
    let (_dir, config) = isolated_config();

    // Default ntask is 1 (suq_core::Settings::default); requesting 5
    // slots can never be admitted, so this must resolve as a resource
    // error on the same submit reply rather than ever starting.
    let submitted = run_suq(&config, &["run", "-n", "5", "true"]);
    let stdout = String::from_utf8_lossy(&submitted.stdout).into_owned();
    assert!(stdout.contains("Requested ntask bigger than the total number available"), "unexpected reply: {stdout}");

    let drained = run_suq(&config, &["del", "all"]);
    assert!(drained.status.success() || String::from_utf8_lossy(&drained.stdout).contains("Job not found"));
}

#[test]
#[serial]
fn s6_first_invocation_bootstraps_a_daemon_second_one_just_connects() {
    let (_dir, config) = isolated_config();

    // A long-lived blocking job keeps the freshly bootstrapped daemon
    // alive long enough for the second invocation below to reach it by
    // `connect()` instead of spawning its own instance.
    let first = run_suq(&config, &["run", "-b", "sleep", "2"]);
    let first_stdout = String::from_utf8_lossy(&first.stdout).into_owned();
    assert!(first_stdout.starts_with("Submitted job id 1:"), "unexpected reply: {first_stdout}");

    std::thread::sleep(Duration::from_millis(200));

    let second = run_suq(&config, &["run", "true"]);
    let second_stdout = String::from_utf8_lossy(&second.stdout).into_owned();
    assert!(second_stdout.starts_with("Submitted job id 2:"), "unexpected reply: {second_stdout}");

    let drained = run_suq(&config, &["wait", "all"]);
    assert!(drained.status.success());
}
