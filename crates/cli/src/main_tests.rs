use super::*;

#[test]
fn emit_routes_an_error_reply_to_stderr_with_exit_one() {
    assert_eq!(emit("ERROR: job not found\n"), 1);
}

#[test]
fn emit_routes_an_ordinary_reply_to_stdout_with_exit_zero() {
    assert_eq!(emit("Submitted job id 1: true\n"), 0);
}

#[test]
fn build_frame_puts_suq_itself_ahead_of_the_forwarded_argv() {
    let frame = build_frame(vec!["run".to_string(), "true".to_string()]).expect("cwd is readable");
    assert_eq!(frame.argv, vec!["suq".to_string(), "run".to_string(), "true".to_string()]);
}

#[test]
fn build_frame_carries_the_current_directory() {
    let frame = build_frame(vec!["list".to_string()]).expect("cwd is readable");
    assert_eq!(frame.cwd, std::env::current_dir().expect("cwd").to_string_lossy());
}
