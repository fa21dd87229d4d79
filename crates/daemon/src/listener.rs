// SPDX-License-Identifier: MIT

//! Binds the daemon's listening socket (spec.md §4.H, §6): unlinks any
//! stale socket file left by a crashed instance, binds fresh, and tightens
//! permissions to user-only. A sibling lock file (held for the daemon's
//! whole lifetime via an advisory exclusive lock) is what actually answers
//! "is another instance already running" — a stale socket file alone can't
//! tell a live daemon from a dead one's leftovers.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tokio::net::UnixListener;

use crate::error::DaemonError;

/// Permission bits applied to the socket after bind (spec.md §6: `0600`).
const SOCKET_MODE: u32 = 0o600;

fn lock_path(socket: &Path) -> PathBuf {
    socket.with_extension("lock")
}

/// Holds the advisory lock for as long as the daemon runs; dropping it
/// (on exit, including panic-unwind-free process termination via `fatal`)
/// releases the lock so the next invocation can bind cleanly.
pub struct SocketLock {
    _file: File,
}

/// Acquires the instance lock and binds the listening socket, unlinking a
/// stale socket path first (spec.md §5: "on startup the daemon unlinks any
/// stale file and re-binds"). Returns the lock alongside the listener: the
/// lock must outlive the listener for the "only one instance" invariant to
/// hold, so callers should keep both bound in the same scope.
pub fn bind(socket_path: &Path) -> Result<(SocketLock, UnixListener), DaemonError> {
    let lock_file = OpenOptions::new()
        .create(true)
        .write(true)
        .open(lock_path(socket_path))
        .map_err(|source| DaemonError::Bind {
            path: socket_path.to_path_buf(),
            source,
        })?;
    lock_file
        .try_lock_exclusive()
        .map_err(|_| DaemonError::AlreadyRunning(socket_path.to_path_buf()))?;

    // A previous crash can leave a stale socket inode around; since we
    // just won the lock, no other instance can be bound to it.
    let _ = std::fs::remove_file(socket_path);

    let std_listener = std::os::unix::net::UnixListener::bind(socket_path)
        .map_err(|source| DaemonError::Bind {
            path: socket_path.to_path_buf(),
            source,
        })?;
    std_listener.set_nonblocking(true).map_err(|source| DaemonError::Bind {
        path: socket_path.to_path_buf(),
        source,
    })?;
    std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(SOCKET_MODE)).map_err(
        |source| DaemonError::Bind {
            path: socket_path.to_path_buf(),
            source,
        },
    )?;

    let listener = UnixListener::from_std(std_listener).map_err(|source| DaemonError::Bind {
        path: socket_path.to_path_buf(),
        source,
    })?;

    Ok((SocketLock { _file: lock_file }, listener))
}
