use std::{
    env, io,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Result};

pub const APPLICATION_DIR_NAME: &str = "hideaway";

/// Resolves the application directory and makes sure it exists.
pub fn create_application_default_path() -> Result<PathBuf> {
    let path = default_application_path(|v| env::var(v).ok())?;
    ensure_dir(&path)?;
    Ok(path)
}

/// Uses `dir` when given, the default application directory otherwise.
pub fn application_path(dir: Option<PathBuf>) -> Result<PathBuf> {
    match dir {
        Some(dir) => {
            ensure_dir(&dir)?;
            Ok(dir)
        }
        None => create_application_default_path(),
    }
}

fn ensure_dir(path: &Path) -> Result<()> {
    match std::fs::create_dir_all(path) {
        Ok(_) => Ok(()),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(v) => Err(v.into()),
    }
}

fn default_application_path(var: impl Fn(&str) -> Option<String>) -> Result<PathBuf> {
    let home = || {
        var("HOME")
            .map(PathBuf::from)
            .ok_or_else(|| anyhow!("HOME is not set"))
    };

    let mut path = if cfg!(target_os = "macos") {
        let mut path = home()?;
        path.push("Library/Application Support");
        path
    } else {
        match var("XDG_STATE_HOME").filter(|v| !v.is_empty()) {
            Some(state) => PathBuf::from(state),
            None => {
                let mut path = home()?;
                path.push(".local/state");
                path
            }
        }
    };
    path.push(APPLICATION_DIR_NAME);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tempfile::tempdir;

    use super::{application_path, default_application_path};

    #[test]
    #[cfg(not(target_os = "macos"))]
    fn state_home_is_preferred() {
        let path = default_application_path(|v| match v {
            "XDG_STATE_HOME" => Some("/state".into()),
            "HOME" => Some("/home/user".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(path, PathBuf::from("/state/hideaway"));

        let path = default_application_path(|v| (v == "HOME").then(|| "/home/user".into())).unwrap();
        assert_eq!(path, PathBuf::from("/home/user/.local/state/hideaway"));
    }

    #[test]
    #[cfg(target_os = "macos")]
    fn application_support_is_used() {
        let path = default_application_path(|v| (v == "HOME").then(|| "/Users/me".into())).unwrap();
        assert_eq!(
            path,
            PathBuf::from("/Users/me/Library/Application Support/hideaway")
        );
    }

    #[test]
    fn missing_home_is_an_error() {
        assert!(default_application_path(|_| None).is_err());
    }

    #[test]
    fn explicit_dir_is_created() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a/b");
        assert_eq!(application_path(Some(nested.clone())).unwrap(), nested);
        assert!(nested.is_dir());
    }
}
