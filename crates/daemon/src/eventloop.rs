// SPDX-License-Identifier: MIT

//! The daemon's single owning task (spec.md §4.H, §5): one async loop that
//! races the listening socket, every open connection's readiness, the
//! wake/shutdown signals, and the child-exit channel, and drives the
//! scheduler and wait subsystem between wake-ups. No lock is taken
//! anywhere in this module because nothing outside it ever touches
//! `DaemonState` — that is the whole point of the single-writer design.

use std::future::Future;
use std::pin::Pin;

use suq_core::{Clock, WaitKind};
use suq_wire::RequestFrame;
use tokio::net::UnixListener;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::connection::{ConnId, ConnTable, Connection};
use crate::dispatch;
use crate::spawn::{ProcessStarter, Reaped};
use crate::state::DaemonState;

/// Whether the loop should keep running once both the job list and the
/// connection table are empty (spec.md §4.H step 9): only a daemon started
/// attached to a foreground terminal (`suq -d`/`-c`) stays up indefinitely;
/// every auto-spawned bootstrap daemon exits once idle, the same way the
/// original process-per-session daemon does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdlePolicy {
    ExitWhenIdle,
    KeepAlive,
}

type ConnFuture<'a> = Pin<Box<dyn Future<Output = ConnId> + Send + 'a>>;

/// Runs the event loop to completion. Returns once the loop decides to
/// terminate on its own (idle, non-keep-alive) or a shutdown signal
/// arrives; both are ordinary, non-error exits.
pub async fn run(
    mut state: DaemonState,
    mut conns: ConnTable,
    listener: UnixListener,
    mut starter: ProcessStarter,
    mut reaped_rx: mpsc::UnboundedReceiver<Reaped>,
    clock: &dyn Clock,
    mut signals: crate::signal::Signals,
    idle_policy: IdlePolicy,
) -> std::io::Result<()> {
    loop {
        // Step 4: the scheduler pass always runs first on every wake.
        let report = state
            .jobs
            .scheduler_pass(state.settings.ntask(), clock.now(), &mut starter);
        log_scheduler_report(&report);

        // Step 2: sweep connections that closed since the last pass.
        for id in conns.sweep_closed() {
            state.waits.remove_for_conn(id);
        }

        // Step 8: notify anything whose wait predicate now holds.
        notify_satisfied_waits(&mut state, &mut conns).await;

        // Step 9: terminate once both lists are empty, unless keep-alive.
        if idle_policy == IdlePolicy::ExitWhenIdle && conns.is_empty() && state.jobs.is_empty() {
            info!("job list and connection list both empty, exiting");
            return Ok(());
        }

        let conn_ready = build_conn_ready_future(&mut conns);

        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _addr)) => {
                        conns.insert(Connection::from_stream(stream));
                    }
                    Err(e) => warn!(error = %e, "accept failed"),
                }
            }
            _ = signals.wake.recv() => {
                debug!("woken by SIGUSR1");
            }
            _ = signals.term.recv() => {
                info!("received SIGTERM, shutting down");
                return Ok(());
            }
            _ = signals.interrupt.recv() => {
                info!("received SIGINT, shutting down");
                return Ok(());
            }
            reaped = reaped_rx.recv() => {
                if let Some(reaped) = reaped {
                    reap_one(&mut state, reaped, clock.now());
                }
            }
            id = conn_ready => {
                handle_readable(&mut state, &mut conns, &mut starter, clock, id).await;
            }
        }
    }
}

/// One boxed future per open connection, each resolving to that
/// connection's id once it has something to read (spec.md §4.H step 1's
/// readiness set, minus the listener and self-pipe, which `run` folds in
/// as separate `select!` arms). Rebuilt every iteration: connections come
/// and go between wake-ups, and nothing here needs to survive past one
/// `select!`.
fn build_conn_ready_future(conns: &mut ConnTable) -> impl Future<Output = ConnId> + '_ {
    let futs: Vec<ConnFuture<'_>> = conns
        .iter_mut()
        .map(|(id, conn)| {
            let fut: ConnFuture<'_> = Box::pin(async move {
                let _ = conn.readable().await;
                id
            });
            fut
        })
        .collect();

    async move {
        if futs.is_empty() {
            std::future::pending().await
        } else {
            let (id, _idx, _rest) = futures_util::future::select_all(futs).await;
            id
        }
    }
}

fn reap_one(state: &mut DaemonState, reaped: Reaped, now: u64) {
    if let Some(job) = state.jobs.find_by_pid(reaped.pid) {
        job.mark_reaped(reaped.exit_status, now);
    } else {
        warn!(pid = reaped.pid, "reaped a pid with no matching job");
    }
}

/// Reads whatever is available on `id`, decodes and dispatches every
/// complete request frame it contains, and replies to each in turn
/// (spec.md §4.D: "requests received on a single connection are processed
/// in order").
async fn handle_readable(
    state: &mut DaemonState,
    conns: &mut ConnTable,
    starter: &mut ProcessStarter,
    clock: &dyn Clock,
    id: ConnId,
) {
    let Some(conn) = conns.get_mut(id) else { return };
    let more = match conn.drain_available() {
        Ok(more) => more,
        Err(e) => {
            warn!(error = %e, "connection read error");
            if let Some(conn) = conns.get_mut(id) {
                conn.close_write();
            }
            return;
        }
    };

    if !more {
        // EOF: spec.md §4.H step 7. A wait this connection was parked on
        // no longer has anyone to deliver its result to.
        state.waits.remove_for_conn(id);
        if let Some(conn) = conns.get_mut(id) {
            conn.keep_alive = false;
        }
    }

    loop {
        let Some(conn) = conns.get_mut(id) else { return };
        let frame: RequestFrame = match conn.take_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => return,
            Err(e) => {
                let _ = conn.send_reply(&suq_wire::error_reply(e)).await;
                conn.close_write();
                return;
            }
        };

        let dispatched = dispatch::handle_request(state, starter, clock, id, &frame);

        let Some(conn) = conns.get_mut(id) else { return };
        if conn.send_reply(&dispatched.reply).await.is_err() {
            return;
        }
        if dispatched.keep_alive {
            conn.keep_alive = true;
        } else {
            conn.close_write();
        }
    }
}

/// Delivers the unsolicited terminal reply for every wait whose predicate
/// now holds, then closes its connection (spec.md §4.F).
async fn notify_satisfied_waits(state: &mut DaemonState, conns: &mut ConnTable) {
    let satisfied = state.waits.drain_satisfied_full(&state.jobs);
    for wait in satisfied {
        let message = match wait.kind {
            WaitKind::ById(id) => suq_wire::wait_finished_by_id_reply(id),
            WaitKind::SubmittedBefore(_) => suq_wire::wait_finished_submitted_before_reply(),
            WaitKind::All => suq_wire::wait_finished_all_reply(),
        };
        if let Some(conn) = conns.get_mut(wait.conn) {
            let _ = conn.send_reply(&message).await;
            conn.close_write();
        }
    }
}

/// Logs the transitions spec.md §4.E's scheduler pass calls out
/// explicitly ("emit a start log record" / "emit a finish log record");
/// resource/run errors get a line too since both are otherwise silent
/// until the next `ls`/`info`.
fn log_scheduler_report(report: &suq_core::SchedulerReport) {
    for id in &report.started {
        info!(id = %id, "job started");
    }
    for job in &report.finished {
        info!(id = %job.id, name = job.name, state = %job.state, exit_status = ?job.exit_status, "job finished");
    }
    for (id, message) in &report.run_errors {
        warn!(id = %id, error = message, "job failed to start");
    }
    for id in &report.resource_errors {
        warn!(id = %id, "job exceeds the task budget");
    }
}

#[cfg(test)]
mod tests {
    use super::IdlePolicy;

    #[test]
    fn idle_policy_values_are_distinct() {
        assert_ne!(IdlePolicy::ExitWhenIdle, IdlePolicy::KeepAlive);
    }
}
