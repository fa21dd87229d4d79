use super::*;
use suq_core::Settings;

#[test]
fn socket_path_is_scoped_to_uid_and_hostname() {
    let paths = Paths::resolve(None);
    let uid = Uid::current().as_raw();
    assert!(paths.socket.to_string_lossy().contains(&format!("suq-{uid}")));
    assert!(paths.socket.extension().is_some_and(|ext| ext == "socket"));
}

#[test]
fn explicit_config_override_wins_over_everything_else() {
    let explicit = PathBuf::from("/tmp/explicit-suq-config");
    let paths = Paths::resolve(Some(&explicit));
    assert_eq!(paths.config_file, explicit);
}

#[test]
fn server_and_job_log_files_live_under_the_same_log_dir() {
    let paths = Paths::resolve(None);
    assert_eq!(paths.server_log_file().parent(), Some(paths.log_dir.as_path()));
    assert_eq!(paths.job_log_file().parent(), Some(paths.log_dir.as_path()));
}

#[test]
fn config_file_path_overrides_win_over_computed_defaults() {
    let mut paths = Paths::resolve(None);
    let settings = Settings::parse(
        "socket_filename=/tmp/override.socket\nlog_dir=/tmp/override-logs\noutput_dir=/tmp/override-out\n",
    )
    .unwrap();

    paths.apply_settings(&settings);

    assert_eq!(paths.socket, PathBuf::from("/tmp/override.socket"));
    assert_eq!(paths.log_dir, PathBuf::from("/tmp/override-logs"));
    assert_eq!(paths.output_dir, PathBuf::from("/tmp/override-out"));
}

#[test]
fn absent_overrides_leave_computed_defaults_untouched() {
    let mut paths = Paths::resolve(None);
    let before = paths.clone();
    paths.apply_settings(&Settings::default());
    assert_eq!(paths.socket, before.socket);
    assert_eq!(paths.log_dir, before.log_dir);
    assert_eq!(paths.output_dir, before.output_dir);
}
