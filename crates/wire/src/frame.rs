// SPDX-License-Identifier: MIT

use std::fmt;

/// A request frame mirrors exactly what the client process saw at the
/// moment it ran: its current working directory, its own argv (including
/// `argv[0]`), and its environment. The daemon does all command-line
/// parsing; the client is otherwise a dumb proxy.
///
/// On the wire: `cwd` is a single NUL-terminated string, followed by the
/// `argv` section and the `envp` section. Each section is zero or more
/// NUL-terminated strings followed by one more NUL marking the end of the
/// section (so an empty section is just that single NUL) — i.e. exactly
/// `<cwd>\0<argv[0]>\0…\0\0<envp[0]>\0…\0\0` per spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFrame {
    pub cwd: String,
    pub argv: Vec<String>,
    pub envp: Vec<String>,
}

/// Kept for documentation purposes: callers scanning a raw byte stream for
/// a complete frame can stop trying to decode once they see a run of NULs
/// this long with nothing printable since the last section, though
/// `RequestFrame::decode` itself doesn't depend on it (it detects
/// completion structurally, one section at a time).
pub const FRAME_TERMINATOR: [u8; 2] = [0, 0];

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame section is not valid UTF-8")]
    InvalidUtf8,
}

/// Reads one NUL-delimited section starting at `pos`. Returns `None` if the
/// buffer runs out before a terminating empty string is found, meaning the
/// caller should wait for more bytes from the socket.
fn decode_section(buf: &[u8], pos: &mut usize) -> Result<Option<Vec<String>>, FrameError> {
    let mut strings = Vec::new();
    loop {
        let start = *pos;
        let Some(nul_offset) = buf[start..].iter().position(|&b| b == 0) else {
            return Ok(None);
        };
        let end = start + nul_offset;
        if end == start {
            // Zero-length string: marks the end of this section.
            *pos = end + 1;
            return Ok(Some(strings));
        }
        let s = std::str::from_utf8(&buf[start..end]).map_err(|_| FrameError::InvalidUtf8)?;
        strings.push(s.to_string());
        *pos = end + 1;
    }
}

fn encode_section(strings: &[impl AsRef<str>], out: &mut Vec<u8>) {
    for s in strings {
        out.extend_from_slice(s.as_ref().as_bytes());
        out.push(0);
    }
    out.push(0);
}

/// Reads one plain NUL-terminated string starting at `pos`, with no
/// section terminator of its own (used only for `cwd`, which per spec is
/// a lone NUL-terminated string ahead of the argv/envp sections).
fn decode_string(buf: &[u8], pos: &mut usize) -> Result<Option<String>, FrameError> {
    let start = *pos;
    let Some(nul_offset) = buf[start..].iter().position(|&b| b == 0) else {
        return Ok(None);
    };
    let end = start + nul_offset;
    let s = std::str::from_utf8(&buf[start..end]).map_err(|_| FrameError::InvalidUtf8)?;
    *pos = end + 1;
    Ok(Some(s.to_string()))
}

impl RequestFrame {
    pub fn new(cwd: impl Into<String>, argv: Vec<String>, envp: Vec<String>) -> Self {
        Self {
            cwd: cwd.into(),
            argv,
            envp,
        }
    }

    /// Attempts to decode one complete frame from the front of `buf`.
    /// Returns `Some((frame, bytes_consumed))` once `cwd`, `argv`, and
    /// `envp` have all been read in full; `None` if `buf` doesn't yet
    /// contain a complete frame (the caller should read more and retry).
    pub fn decode(buf: &[u8]) -> Result<Option<(RequestFrame, usize)>, FrameError> {
        let mut pos = 0;
        let Some(cwd) = decode_string(buf, &mut pos)? else {
            return Ok(None);
        };
        let Some(argv) = decode_section(buf, &mut pos)? else {
            return Ok(None);
        };
        let Some(envp) = decode_section(buf, &mut pos)? else {
            return Ok(None);
        };
        Ok(Some((RequestFrame { cwd, argv, envp }, pos)))
    }

    /// Encodes this frame for transmission to the daemon.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(self.cwd.as_bytes());
        out.push(0);
        encode_section(&self.argv, &mut out);
        encode_section(&self.envp, &mut out);
        out
    }
}

impl fmt::Display for RequestFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.cwd, self.argv.join(" "))
    }
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
