use std::path::PathBuf;

pub const DAEMON_NAME: &str = "hideaway-daemon";

/// The daemon binary is installed next to the cli.
pub fn to_daemon_path(mut path: PathBuf) -> PathBuf {
    path.set_file_name(DAEMON_NAME);
    path
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::to_daemon_path;

    #[test]
    fn daemon_lives_next_to_cli() {
        assert_eq!(
            to_daemon_path(PathBuf::from("/usr/local/bin/hideaway")),
            PathBuf::from("/usr/local/bin/hideaway-daemon")
        );
    }
}
