use super::*;
use crate::frame::RequestFrame;

fn frame(argv: &[&str]) -> RequestFrame {
    RequestFrame::new(
        "/home/user/project",
        argv.iter().map(|s| s.to_string()).collect(),
        vec!["PATH=/usr/bin".into()],
    )
}

#[test]
fn no_verb_is_an_error() {
    let f = frame(&["suq"]);
    assert_eq!(Command::parse(&f), Err(CommandError::NoCommand));
}

#[test]
fn unknown_verb_is_rejected() {
    let f = frame(&["suq", "frobnicate"]);
    assert_eq!(Command::parse(&f), Err(CommandError::UnknownVerb));
}

#[test]
fn run_defaults_ntask_and_priority_and_cwd() {
    let f = frame(&["suq", "run", "make", "-j4"]);
    let cmd = Command::parse(&f).unwrap();
    match cmd {
        Command::Run {
            cwd,
            argv,
            ntask,
            blocking,
            priority,
            ..
        } => {
            assert_eq!(cwd, "/home/user/project");
            assert_eq!(argv, vec!["make".to_string(), "-j4".to_string()]);
            assert_eq!(ntask, None);
            assert!(!blocking);
            assert_eq!(priority, 0);
        }
        other => panic!("expected Run, got {other:?}"),
    }
}

#[test]
fn sub_is_an_alias_for_run() {
    let f = frame(&["suq", "sub", "echo", "hi"]);
    assert!(matches!(Command::parse(&f).unwrap(), Command::Run { .. }));
}

#[test]
fn run_parses_workdir_ntask_priority_and_blocking_flags() {
    let f = frame(&["suq", "run", "-d", "/tmp/work", "-n", "3", "-p", "5", "make"]);
    let cmd = Command::parse(&f).unwrap();
    match cmd {
        Command::Run {
            cwd,
            ntask,
            priority,
            blocking,
            argv,
            ..
        } => {
            assert_eq!(cwd, "/tmp/work");
            assert_eq!(ntask, Some(3));
            assert_eq!(priority, 5);
            assert!(!blocking);
            assert_eq!(argv, vec!["make".to_string()]);
        }
        other => panic!("expected Run, got {other:?}"),
    }
}

#[test]
fn blocking_flag_before_ntask_suppresses_it() {
    let f = frame(&["suq", "run", "-b", "-n", "4", "make"]);
    let cmd = Command::parse(&f).unwrap();
    match cmd {
        Command::Run { ntask, blocking, .. } => {
            assert!(blocking);
            assert_eq!(ntask, None);
        }
        other => panic!("expected Run, got {other:?}"),
    }
}

#[test]
fn ntask_before_blocking_flag_is_overridden() {
    let f = frame(&["suq", "run", "-n", "4", "-b", "make"]);
    let cmd = Command::parse(&f).unwrap();
    match cmd {
        Command::Run { ntask, blocking, .. } => {
            assert!(blocking);
            assert_eq!(ntask, Some(4));
        }
        other => panic!("expected Run, got {other:?}"),
    }
}

#[test]
fn run_with_no_command_token_is_an_error() {
    let f = frame(&["suq", "run", "-n", "2"]);
    assert_eq!(Command::parse(&f), Err(CommandError::MissingArgument));
}

#[test]
fn run_rejects_zero_ntask() {
    let f = frame(&["suq", "run", "-n", "0", "make"]);
    assert_eq!(Command::parse(&f), Err(CommandError::BadNtask));
}

#[test]
fn del_accepts_all_or_a_numeric_id() {
    let f = frame(&["suq", "del", "all"]);
    assert_eq!(Command::parse(&f).unwrap(), Command::Del(JobTarget::All));

    let f = frame(&["suq", "del", "42"]);
    assert_eq!(
        Command::parse(&f).unwrap(),
        Command::Del(JobTarget::Id(42))
    );
}

#[test]
fn pri_parses_id_and_new_priority() {
    let f = frame(&["suq", "pri", "7", "-3"]);
    assert_eq!(
        Command::parse(&f).unwrap(),
        Command::Pri(JobTarget::Id(7), -3)
    );
}

#[test]
fn list_ignores_aliases() {
    assert_eq!(Command::parse(&frame(&["suq", "ls"])).unwrap(), Command::List);
    assert_eq!(
        Command::parse(&frame(&["suq", "list"])).unwrap(),
        Command::List
    );
}

#[test]
fn ntask_verb_parses_a_signed_count() {
    assert_eq!(
        Command::parse(&frame(&["suq", "ntask", "4"])).unwrap(),
        Command::Ntask(4)
    );
    assert_eq!(
        Command::parse(&frame(&["suq", "nproc", "4"])).unwrap(),
        Command::Ntask(4)
    );
}

#[test]
fn wait_with_no_argument_means_wait_for_all() {
    assert_eq!(
        Command::parse(&frame(&["suq", "wait"])).unwrap(),
        Command::Wait(None)
    );
    assert_eq!(
        Command::parse(&frame(&["suq", "wait", "9"])).unwrap(),
        Command::Wait(Some(JobTarget::Id(9)))
    );
    assert_eq!(
        Command::parse(&frame(&["suq", "wait", "all"])).unwrap(),
        Command::Wait(Some(JobTarget::All))
    );
}

#[test]
fn echo_carries_the_client_binary_the_verb_and_every_argument() {
    assert_eq!(
        Command::parse(&frame(&["suq", "echo", "a", "b"])).unwrap(),
        Command::Echo(vec![
            "suq".to_string(),
            "echo".to_string(),
            "a".to_string(),
            "b".to_string()
        ])
    );
}
