// SPDX-License-Identifier: MIT

//! The event loop's only asynchronous producers besides child exits and
//! client bytes (spec.md §4.G). The original's single hand-rolled
//! self-pipe is superseded here by `tokio::signal::unix`, which is itself
//! a self-pipe under the hood (see SPEC_FULL.md §4.G): the handler's body
//! is still, in spirit, "write one byte and return" — that plumbing now
//! lives in the runtime instead of this crate.
//!
//! `SIGUSR1` is the external "wake the scheduler" signal spec.md calls
//! out; `SIGTERM`/`SIGINT` request a graceful shutdown of a foreground
//! daemon (spec.md's non-detached keep-alive mode is the only one a user
//! can plausibly send a signal to from a terminal).

use tokio::signal::unix::{signal, Signal, SignalKind};

use crate::error::DaemonError;

pub struct Signals {
    pub wake: Signal,
    pub term: Signal,
    pub interrupt: Signal,
}

impl Signals {
    pub fn install() -> Result<Self, DaemonError> {
        let wake = signal(SignalKind::user_defined1()).map_err(DaemonError::Signal)?;
        let term = signal(SignalKind::terminate()).map_err(DaemonError::Signal)?;
        let interrupt = signal(SignalKind::interrupt()).map_err(DaemonError::Signal)?;
        Ok(Self { wake, term, interrupt })
    }
}
