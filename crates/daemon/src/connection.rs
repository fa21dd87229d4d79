// SPDX-License-Identifier: MIT

//! The bidirectional byte channel a client talks to the daemon over
//! (spec.md §4.C). Backed by either a Unix-domain stream (the normal case)
//! or a pair of named pipes (the bootstrap connection a freshly double-
//! forked daemon inherits from the client that spawned it, spec.md §4.I).
//!
//! Connections are kept in a `HashMap<ConnId, Connection>` rather than the
//! original's intrusive circular linked list — spec.md §9 notes any
//! O(1)-remove-by-handle structure is an acceptable substitute.

use std::collections::HashMap;
use std::io;

use suq_wire::{FrameError, RequestFrame};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::pipe;
use tokio::net::UnixStream;

pub type ConnId = usize;

/// How a connection's bytes actually travel.
pub enum ConnIo {
    Socket(UnixStream),
    Pipe {
        reader: pipe::Receiver,
        writer: pipe::Sender,
    },
    /// The bootstrap connection a freshly spawned `suqd --bootstrap` is
    /// handed on its own standard streams (spec.md §4.I): the spawning
    /// client keeps the other ends as a `tokio::process::Child`'s piped
    /// stdio and sends its first request over them directly, never by
    /// re-probing the socket. `tokio::io::Stdin`/`Stdout` wrap a blocking
    /// background thread rather than exposing an edge-triggered fd, so
    /// readiness here means "a chunk has been prefetched", not "the OS
    /// says data is waiting" — see `readable`/`try_read` below.
    Stdio {
        stdin: tokio::io::Stdin,
        stdout: tokio::io::Stdout,
        pending: Option<Vec<u8>>,
    },
}

impl ConnIo {
    async fn readable(&mut self) -> io::Result<()> {
        match self {
            ConnIo::Socket(s) => s.readable().await,
            ConnIo::Pipe { reader, .. } => reader.readable().await,
            ConnIo::Stdio { stdin, pending, .. } => {
                if pending.is_some() {
                    return Ok(());
                }
                let mut chunk = vec![0u8; READ_CHUNK];
                let n = stdin.read(&mut chunk).await?;
                chunk.truncate(n);
                *pending = Some(chunk);
                Ok(())
            }
        }
    }

    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            ConnIo::Socket(s) => s.try_read(buf),
            ConnIo::Pipe { reader, .. } => reader.try_read(buf),
            ConnIo::Stdio { pending, .. } => match pending.take() {
                Some(chunk) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    Ok(n)
                }
                None => Err(io::Error::new(io::ErrorKind::WouldBlock, "no chunk prefetched yet")),
            },
        }
    }

    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        match self {
            ConnIo::Socket(s) => s.write_all(data).await,
            ConnIo::Pipe { writer, .. } => writer.write_all(data).await,
            ConnIo::Stdio { stdout, .. } => stdout.write_all(data).await,
        }
    }
}

const READ_CHUNK: usize = 4096;

/// One client's connection state: the io handle, the growable read buffer,
/// and the open/keep-alive flags that decide when the connection is swept
/// from the table.
pub struct Connection {
    io: ConnIo,
    buf: Vec<u8>,
    pub read_open: bool,
    pub write_open: bool,
    pub keep_alive: bool,
}

impl Connection {
    pub fn from_stream(stream: UnixStream) -> Self {
        Self {
            io: ConnIo::Socket(stream),
            buf: Vec::new(),
            read_open: true,
            write_open: true,
            keep_alive: true,
        }
    }

    pub fn from_pipes(reader: pipe::Receiver, writer: pipe::Sender) -> Self {
        Self {
            io: ConnIo::Pipe { reader, writer },
            buf: Vec::new(),
            read_open: true,
            write_open: true,
            keep_alive: true,
        }
    }

    /// Wraps the daemon's own standard streams as a connection: used only
    /// by `suqd --bootstrap`, for the one connection handed to it by the
    /// client that spawned it (spec.md §4.I).
    pub fn from_stdio(stdin: tokio::io::Stdin, stdout: tokio::io::Stdout) -> Self {
        Self {
            io: ConnIo::Stdio {
                stdin,
                stdout,
                pending: None,
            },
            buf: Vec::new(),
            read_open: true,
            write_open: true,
            keep_alive: true,
        }
    }

    /// Waits until there is something to read. Part of the event loop's
    /// readiness set (spec.md §4.H step 1).
    pub async fn readable(&mut self) -> io::Result<()> {
        self.io.readable().await
    }

    /// Drains everything currently available into the buffer, growing it
    /// as needed, stopping at the first short read (nothing more is
    /// immediately available) or at EOF. Returns `Ok(false)` on EOF, after
    /// setting `read_open = false`.
    pub fn drain_available(&mut self) -> io::Result<bool> {
        loop {
            let mut chunk = [0u8; READ_CHUNK];
            match self.io.try_read(&mut chunk) {
                Ok(0) => {
                    self.read_open = false;
                    return Ok(false);
                }
                Ok(n) => {
                    self.buf.extend_from_slice(&chunk[..n]);
                    if n < READ_CHUNK {
                        return Ok(true);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(true),
                Err(e) => return Err(e),
            }
        }
    }

    /// Attempts to decode one complete request frame from the front of the
    /// buffer. Scans the whole buffer each call, matching the original's
    /// whole-buffer NUL scan (spec.md §4.C) — acceptable at this message
    /// scale. On success, shifts the residual bytes down to offset 0 so
    /// the next `drain_available` keeps appending from a clean base.
    pub fn take_frame(&mut self) -> Result<Option<RequestFrame>, FrameError> {
        match RequestFrame::decode(&self.buf)? {
            Some((frame, consumed)) => {
                self.buf.drain(0..consumed);
                Ok(Some(frame))
            }
            None => Ok(None),
        }
    }

    /// Sends one reply: the text, NUL-terminated (spec.md §4.D: "a single
    /// byte sequence of zero-terminated text"). Short writes on this path
    /// are fatal to the connection — the protocol's replies are always
    /// small (spec.md §5) — so any error just tears the connection down.
    pub async fn send_reply(&mut self, reply: &str) -> io::Result<()> {
        let mut bytes = Vec::with_capacity(reply.len() + 1);
        bytes.extend_from_slice(reply.as_bytes());
        bytes.push(0);
        let result = self.io.write_all(&bytes).await;
        if result.is_err() {
            self.write_open = false;
        }
        result
    }

    pub fn close_write(&mut self) {
        self.write_open = false;
    }

    /// Matches spec.md §4.C's invariant: a connection is removed as soon
    /// as either its write side is closed, or its read side is closed and
    /// it isn't being kept alive for a pending `wait`.
    pub fn should_close(&self) -> bool {
        !self.write_open || (!self.read_open && !self.keep_alive)
    }
}

/// The daemon's open connections, addressed by a stable [`ConnId`] handle
/// rather than position — ids are never reused while a connection they
/// named is still live, satisfying the wait subsystem's "refers to a
/// connection currently in the list" invariant (spec.md §3).
#[derive(Default)]
pub struct ConnTable {
    conns: HashMap<ConnId, Connection>,
    next_id: ConnId,
}

impl ConnTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, conn: Connection) -> ConnId {
        let id = self.next_id;
        self.next_id += 1;
        self.conns.insert(id, conn);
        id
    }

    pub fn get_mut(&mut self, id: ConnId) -> Option<&mut Connection> {
        self.conns.get_mut(&id)
    }

    pub fn remove(&mut self, id: ConnId) -> Option<Connection> {
        self.conns.remove(&id)
    }

    pub fn ids(&self) -> Vec<ConnId> {
        self.conns.keys().copied().collect()
    }

    /// Disjoint mutable access to every open connection, keyed by its id.
    /// Used to build one readiness future per connection (the daemon's
    /// per-connection slice of spec.md §4.H step 1's readiness set)
    /// without holding the whole table borrowed.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ConnId, &mut Connection)> {
        self.conns.iter_mut().map(|(id, conn)| (*id, conn))
    }

    pub fn is_empty(&self) -> bool {
        self.conns.is_empty()
    }

    /// Removes every connection that meets [`Connection::should_close`],
    /// returning their ids so callers can drop any wait referencing them
    /// (spec.md §4.H step 2).
    pub fn sweep_closed(&mut self) -> Vec<ConnId> {
        let dead: Vec<ConnId> = self
            .conns
            .iter()
            .filter(|(_, c)| c.should_close())
            .map(|(id, _)| *id)
            .collect();
        for id in &dead {
            self.conns.remove(id);
        }
        dead
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
