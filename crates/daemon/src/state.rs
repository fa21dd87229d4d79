// SPDX-License-Identifier: MIT

//! Everything the single owning task mutates between wake-ups (spec.md
//! §5: "one task owns all daemon state... no locking is required").

use suq_core::{JobList, Settings, WaitList};
use tracing::warn;

use crate::paths::Paths;

pub struct DaemonState {
    pub jobs: JobList,
    pub waits: WaitList,
    pub settings: Settings,
    pub paths: Paths,
}

impl DaemonState {
    pub fn new(settings: Settings, paths: Paths) -> Self {
        Self {
            jobs: JobList::new(),
            waits: WaitList::new(),
            settings,
            paths,
        }
    }

    /// Writes the config file back out if `alloc_id`/`set_ntask` has left
    /// it dirty. `suq_core::Settings`'s own doc comment calls this out:
    /// an id allocation must hit disk before the daemon can safely hand
    /// that id back to a client, so a crash right after can't replay it.
    /// A write failure is logged, not fatal — the daemon keeps serving
    /// with the in-memory settings rather than go down over a log-only
    /// bookkeeping file.
    pub fn persist_settings(&mut self) {
        if !self.settings.is_dirty() {
            return;
        }
        match write_config_atomically(&self.paths.config_file, &self.settings.to_file_string()) {
            Ok(()) => self.settings.clear_dirty(),
            Err(e) => warn!(path = ?self.paths.config_file, error = %e, "failed to persist config"),
        }
    }
}

/// Write-to-temp-and-rename (spec.md §5): a crash mid-write can never
/// leave the config file half-written, since `rename` within the same
/// directory is atomic on every filesystem this daemon targets.
fn write_config_atomically(path: &std::path::Path, contents: &str) -> std::io::Result<()> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path)
}
