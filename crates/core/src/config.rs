// SPDX-License-Identifier: MIT

use crate::job::JobId;
use std::fmt::Write as _;

/// Highest job id ever handed out; ids recycle within `0..=MAX_ID` rather
/// than growing forever, so a long-lived daemon's config file never grows
/// either. `next_id` holds the *next* id to hand out; allocation returns
/// it and advances the counter, wrapping from `MAX_ID` back to 0 (not to
/// 1 — 0 is a perfectly good id once the counter has gone all the way
/// around, it's just never the *first* one handed out by a fresh daemon).
const MAX_ID: u32 = 10_000;

/// First id a freshly bootstrapped daemon (no config file yet) hands out.
const MIN_ID: u32 = 1;

/// Default task budget for a freshly bootstrapped config file.
const DEFAULT_NTASK: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("malformed config line {line}: {text:?}")]
    MalformedLine { line: usize, text: String },
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// The daemon's persisted, user-editable settings: the task budget the
/// scheduler enforces, the next job id to hand out, and optional overrides
/// for the socket, log directory, and output directory paths the daemon
/// would otherwise compute from the environment and uid alone.
///
/// This doubles as both configuration (a user may hand-edit `ntask`) and
/// daemon state (`next_id` must survive restarts so ids don't collide with
/// ones still referenced in old output file names). The two are kept in one
/// file because the original implementation did, and because a single-user
/// daemon has no need for a separate state store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    ntask: u32,
    next_id: u32,
    dirty: bool,
    socket_filename: Option<String>,
    log_dir: Option<String>,
    output_dir: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ntask: DEFAULT_NTASK,
            next_id: MIN_ID,
            dirty: false,
            socket_filename: None,
            log_dir: None,
            output_dir: None,
        }
    }
}

impl Settings {
    pub fn new(ntask: u32, next_id: u32) -> Self {
        Self {
            ntask,
            next_id: next_id.min(MAX_ID),
            dirty: false,
            socket_filename: None,
            log_dir: None,
            output_dir: None,
        }
    }

    /// Parses the `key=value` config file format. Blank lines and lines
    /// starting with `#` are ignored; unrecognized keys are ignored too
    /// (forward compatibility with a newer config written by a future
    /// version), but a recognized key with a value that doesn't parse is an
    /// error, since silently falling back to a default there could mask a
    /// typo that changes scheduling behavior.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let mut settings = Settings::default();
        for (idx, raw_line) in contents.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::MalformedLine {
                    line: idx + 1,
                    text: raw_line.to_string(),
                });
            };
            let key = key.trim();
            let value = value.trim();
            match key {
                "ntask" => {
                    settings.ntask = value.parse().map_err(|_| ConfigError::InvalidValue {
                        key: "ntask",
                        value: value.to_string(),
                    })?;
                }
                "next_id" => {
                    let parsed: u32 = value.parse().map_err(|_| ConfigError::InvalidValue {
                        key: "next_id",
                        value: value.to_string(),
                    })?;
                    settings.next_id = parsed.min(MAX_ID);
                }
                "socket_filename" => settings.socket_filename = Some(value.to_string()),
                "log_dir" => settings.log_dir = Some(value.to_string()),
                "output_dir" => settings.output_dir = Some(value.to_string()),
                other => {
                    tracing::warn!(key = other, "ignoring unrecognized config key");
                }
            }
        }
        Ok(settings)
    }

    /// Renders the settings back into the `key=value` file format. Path
    /// overrides are only written out if a prior parse (or explicit setter)
    /// set them; an unset override is simply absent from the file rather
    /// than round-tripping as an empty value.
    pub fn to_file_string(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "ntask={}", self.ntask);
        let _ = writeln!(out, "next_id={}", self.next_id);
        if let Some(v) = &self.socket_filename {
            let _ = writeln!(out, "socket_filename={v}");
        }
        if let Some(v) = &self.log_dir {
            let _ = writeln!(out, "log_dir={v}");
        }
        if let Some(v) = &self.output_dir {
            let _ = writeln!(out, "output_dir={v}");
        }
        out
    }

    pub fn ntask(&self) -> u32 {
        self.ntask
    }

    pub fn socket_filename(&self) -> Option<&str> {
        self.socket_filename.as_deref()
    }

    pub fn log_dir(&self) -> Option<&str> {
        self.log_dir.as_deref()
    }

    pub fn output_dir(&self) -> Option<&str> {
        self.output_dir.as_deref()
    }

    pub fn set_ntask(&mut self, ntask: u32) {
        if ntask != self.ntask {
            self.ntask = ntask;
            self.dirty = true;
        }
    }

    /// Hands out the next job id and advances the counter, wrapping back
    /// to 0 (not to `MIN_ID`) once it passes `MAX_ID` — 0 becomes a valid
    /// id again only after the counter has gone all the way around once.
    /// Every allocation marks the settings dirty: callers should write the
    /// file back out synchronously afterward so a crash can't replay an id
    /// that's already in use.
    pub fn alloc_id(&mut self) -> JobId {
        let id = JobId::new(self.next_id);
        self.next_id = if self.next_id >= MAX_ID {
            0
        } else {
            self.next_id + 1
        };
        self.dirty = true;
        id
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
