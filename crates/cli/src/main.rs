// SPDX-License-Identifier: MIT

//! `suq` — the client half of the job-queuing daemon (spec.md §4.I, §6).
//! A thin, mostly dumb proxy: strip the handful of client-only flags,
//! hand everything else to the daemon verbatim, and translate its reply
//! into stdout/stderr plus an exit code. All real command parsing and
//! scheduling lives in `suqd`.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use clap::Parser;
use suq_daemon::paths::Paths;
use suq_wire::{is_error_reply, RequestFrame, USAGE};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const GIT_HASH: &str = env!("BUILD_GIT_HASH");

/// The handful of flags the client strips for itself before forwarding
/// the rest of argv to the daemon untouched (spec.md §4.I). Anything
/// after the first non-flag token — including further `-`-prefixed
/// tokens that belong to a verb like `run -n 2` — is passed through
/// rather than parsed here.
#[derive(Parser)]
#[command(name = "suq", disable_help_flag = true, disable_version_flag = true)]
struct Cli {
    #[arg(short = 'd', long = "debug")]
    debug: bool,

    #[arg(short = 'c')]
    detached_debug: bool,

    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(short = 'h')]
    help: bool,

    #[arg(short = 'v')]
    version: bool,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    rest: Vec<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.help {
        print!("{USAGE}");
        std::process::exit(0);
    }
    if cli.version {
        println!("suq {VERSION} ({GIT_HASH})");
        std::process::exit(0);
    }
    // `suq help` has no man page installed in this build, so it falls
    // back to the same usage text `-h` prints (spec.md §6).
    if cli.rest.first().map(String::as_str) == Some("help") {
        print!("{USAGE}");
        std::process::exit(0);
    }

    let debug_level: u8 = if cli.debug { 2 } else if cli.detached_debug { 2 } else { 0 };
    let foreground = cli.debug;

    match run(cli.config, debug_level, foreground, cli.rest).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            eprintln!("suq: {e}");
            std::process::exit(1);
        }
    }
}

async fn run(
    config: Option<PathBuf>,
    debug_level: u8,
    foreground: bool,
    rest: Vec<String>,
) -> anyhow::Result<i32> {
    let paths = Paths::resolve(config.as_deref());
    let frame = build_frame(rest)?;

    let reply = match UnixStream::connect(&paths.socket).await {
        Ok(stream) => send_attached(stream, &frame).await?,
        Err(_) => send_via_bootstrap(&paths, config.as_deref(), debug_level, foreground, &frame).await?,
    };

    Ok(emit(&reply))
}

fn build_frame(rest: Vec<String>) -> anyhow::Result<RequestFrame> {
    let cwd = std::env::current_dir()?.to_string_lossy().into_owned();
    let argv: Vec<String> = std::iter::once("suq".to_string()).chain(rest).collect();
    let envp: Vec<String> = std::env::vars().map(|(k, v)| format!("{k}={v}")).collect();
    Ok(RequestFrame::new(cwd, argv, envp))
}

/// Writes the request to `stream` and reads the reply through to EOF.
async fn send_attached(mut stream: UnixStream, frame: &RequestFrame) -> anyhow::Result<String> {
    stream.write_all(&frame.encode()).await?;
    read_to_eof(&mut stream).await
}

/// Detached bootstrap (spec.md §4.I): spawns `suqd --bootstrap`, piping
/// its stdin/stdout, and sends the very first request over that pipe
/// rather than by re-probing the socket (the daemon's own `accept()`
/// loop may not have bound yet). The child is deliberately never
/// awaited in the non-foreground case: dropping its `Child` handle
/// without `kill_on_drop` lets it keep running, orphaned from this
/// client process, the async-native stand-in for the original's
/// double-fork (see SPEC_FULL.md §4.I).
async fn send_via_bootstrap(
    paths: &Paths,
    config: Option<&Path>,
    debug_level: u8,
    foreground: bool,
    frame: &RequestFrame,
) -> anyhow::Result<String> {
    paths.create_dirs()?;

    let suqd_path = find_suqd_binary();
    let mut command = tokio::process::Command::new(&suqd_path);
    command.arg("--bootstrap");
    if foreground {
        command.arg("--foreground");
    }
    if debug_level > 0 {
        command.args(["--debug", &debug_level.to_string()]);
    }
    if let Some(cfg) = config {
        command.args(["--config", &cfg.to_string_lossy()]);
    }
    command.stdin(Stdio::piped()).stdout(Stdio::piped());
    command.stderr(if foreground { Stdio::inherit() } else { Stdio::null() });

    let mut child = command.spawn()?;
    let mut child_stdin = child.stdin.take().ok_or_else(|| anyhow::anyhow!("no stdin on bootstrap child"))?;
    let mut child_stdout =
        child.stdout.take().ok_or_else(|| anyhow::anyhow!("no stdout on bootstrap child"))?;

    child_stdin.write_all(&frame.encode()).await?;
    let reply = read_to_eof(&mut child_stdout).await?;

    if foreground {
        let _ = child.wait().await;
    }

    Ok(reply)
}

/// Reads the connection through to EOF (spec.md §4.I). Most verbs send a
/// single NUL-terminated reply and the daemon closes its write side right
/// behind it, so this returns after one read. `wait` is the exception: it
/// can send an interim "Waiting...\n" reply and keep the connection open
/// (spec.md §4.D), only closing once the real terminal message ("Finished
/// ...\n") has been written, so reading to EOF rather than stopping at the
/// first NUL is what lets a blocking `wait` actually block here. The NUL
/// terminators themselves are framing, not content, so they're dropped
/// before the text reaches stdout/stderr.
async fn read_to_eof(reader: &mut (impl tokio::io::AsyncRead + Unpin)) -> anyhow::Result<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let text = String::from_utf8_lossy(&buf).into_owned();
    Ok(text.replace('\0', ""))
}

/// Writes the reply to stdout or stderr according to the `ERROR` prefix
/// convention and returns the matching exit status (spec.md §6).
fn emit(reply: &str) -> i32 {
    if is_error_reply(reply) {
        eprint!("{reply}");
        1
    } else {
        print!("{reply}");
        0
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;

fn find_suqd_binary() -> PathBuf {
    let current_exe = std::env::current_exe().ok();

    let is_debug_build =
        current_exe.as_ref().and_then(|p| p.to_str()).map(|s| s.contains("target/debug")).unwrap_or(false);

    if is_debug_build {
        if let Some(manifest_dir) = option_env!("CARGO_MANIFEST_DIR") {
            let dev_path = PathBuf::from(manifest_dir).parent().and_then(Path::parent).map(|p| p.join("target/debug/suqd"));
            if let Some(path) = dev_path {
                if path.exists() {
                    return path;
                }
            }
        }
    }

    if let Some(exe) = &current_exe {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("suqd");
            if sibling.exists() {
                return sibling;
            }
        }
    }

    PathBuf::from("suqd")
}
