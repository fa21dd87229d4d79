// SPDX-License-Identifier: MIT

use crate::frame::RequestFrame;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("no command")]
    NoCommand,
    #[error("Command error")]
    MissingArgument,
    #[error("suq run -n is not a number > 1")]
    BadNtask,
    #[error("suq run -p is not a number")]
    BadPriority,
    #[error("{0} argument is not a number")]
    BadTarget(&'static str),
    #[error("wrong command")]
    UnknownVerb,
}

/// Which job(s) a `del`/`pri`/`info` request applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobTarget {
    All,
    Id(u32),
}

impl JobTarget {
    fn parse(arg: &str, context: &'static str) -> Result<Self, CommandError> {
        if arg == "all" {
            Ok(JobTarget::All)
        } else {
            arg.parse()
                .map(JobTarget::Id)
                .map_err(|_| CommandError::BadTarget(context))
        }
    }
}

/// A parsed `suq <verb> ...` request, decoded from the client's raw argv.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run {
        cwd: String,
        argv: Vec<String>,
        envp: Vec<String>,
        ntask: Option<u32>,
        blocking: bool,
        priority: i32,
    },
    Del(JobTarget),
    Pri(JobTarget, i32),
    Info(JobTarget),
    List,
    Ntask(i64),
    Wait(Option<JobTarget>),
    Help,
    /// Replies with the tokens it was given, verb included — a
    /// connectivity/plumbing smoke test, not a scheduling operation.
    Echo(Vec<String>),
}

impl Command {
    /// Parses a decoded request frame into a command, exactly the way the
    /// daemon's dispatcher would: `argv[0]` is the client binary name and
    /// is ignored, `argv[1]` is the verb, and everything after that is
    /// verb-specific.
    pub fn parse(frame: &RequestFrame) -> Result<Command, CommandError> {
        if frame.argv.len() < 2 {
            return Err(CommandError::NoCommand);
        }
        let verb = frame.argv[1].as_str();
        let rest = &frame.argv[2..];

        match verb {
            "run" | "sub" => Self::parse_run(frame, rest),
            "del" => {
                let arg = rest.first().ok_or(CommandError::MissingArgument)?;
                Ok(Command::Del(JobTarget::parse(arg, "del")?))
            }
            "pri" => {
                let id_arg = rest.first().ok_or(CommandError::MissingArgument)?;
                let pri_arg = rest.get(1).ok_or(CommandError::MissingArgument)?;
                let target = JobTarget::parse(id_arg, "pri id")?;
                let priority: i32 = pri_arg
                    .parse()
                    .map_err(|_| CommandError::BadTarget("pri priority"))?;
                Ok(Command::Pri(target, priority))
            }
            "info" => {
                let arg = rest.first().ok_or(CommandError::MissingArgument)?;
                Ok(Command::Info(JobTarget::parse(arg, "info")?))
            }
            "ls" | "list" => Ok(Command::List),
            "ntask" | "nproc" => {
                let arg = rest.first().ok_or(CommandError::MissingArgument)?;
                let n: i64 = arg
                    .parse()
                    .map_err(|_| CommandError::BadTarget("ntask"))?;
                Ok(Command::Ntask(n))
            }
            "wait" => {
                let target = match rest.first() {
                    Some(arg) => Some(JobTarget::parse(arg, "wait")?),
                    None => None,
                };
                Ok(Command::Wait(target))
            }
            "help" => Ok(Command::Help),
            "echo" => Ok(Command::Echo(frame.argv.to_vec())),
            _ => Err(CommandError::UnknownVerb),
        }
    }

    fn parse_run(frame: &RequestFrame, mut rest: &[String]) -> Result<Command, CommandError> {
        let mut cwd = frame.cwd.clone();
        let mut ntask: Option<u32> = None;
        let mut blocking = false;
        let mut priority = 0i32;

        loop {
            let Some(arg) = rest.first() else {
                return Err(CommandError::MissingArgument);
            };
            match arg.as_str() {
                "-d" => {
                    let dir = rest.get(1).ok_or(CommandError::MissingArgument)?;
                    cwd = dir.clone();
                    rest = &rest[2..];
                }
                "-n" => {
                    let n = rest.get(1).ok_or(CommandError::MissingArgument)?;
                    let parsed: u32 = n.parse().map_err(|_| CommandError::BadNtask)?;
                    if parsed < 1 {
                        return Err(CommandError::BadNtask);
                    }
                    // A blocking job (`-b`) never gets un-blocked by a
                    // later `-n`; this mirrors a deliberate quirk in the
                    // reference implementation rather than a bug.
                    if !blocking {
                        ntask = Some(parsed);
                    }
                    rest = &rest[2..];
                }
                "-p" => {
                    let p = rest.get(1).ok_or(CommandError::MissingArgument)?;
                    priority = p.parse().map_err(|_| CommandError::BadPriority)?;
                    rest = &rest[2..];
                }
                "-b" => {
                    blocking = true;
                    rest = &rest[1..];
                }
                _ => break,
            }
        }

        let cmd = rest.first().ok_or(CommandError::MissingArgument)?;
        let mut argv = Vec::with_capacity(rest.len());
        argv.push(cmd.clone());
        argv.extend(rest[1..].iter().cloned());

        Ok(Command::Run {
            cwd,
            argv,
            envp: frame.envp.clone(),
            ntask,
            blocking,
            priority,
        })
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
