use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{trace, warn};

/// Watches the preference document for changes made by the cli. The directory is watched instead
/// of the file, so that the document may be created or replaced after the daemon starts.
///
/// Dropping the returned watcher stops watching.
pub fn watch_preferences(
    path: &Path,
    changed: mpsc::UnboundedSender<()>,
) -> Result<RecommendedWatcher> {
    let dir = path
        .parent()
        .ok_or_else(|| anyhow!("Preferences path {path:?} has no parent directory"))?;
    let file_name = path.file_name().map(ToOwned::to_owned);

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        let event = match res {
            Ok(event) => event,
            Err(e) => {
                warn!("Preferences watcher error {e:?}");
                return;
            }
        };
        if !is_relevant(&event.kind, &event.paths, file_name.as_deref()) {
            return;
        }
        trace!("Preferences changed {:?}", event.kind);
        let _ = changed.send(());
    })?;
    watcher.watch(dir, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

fn is_relevant(kind: &EventKind, paths: &[PathBuf], file_name: Option<&std::ffi::OsStr>) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && paths.iter().any(|v| v.file_name() == file_name)
}

#[cfg(test)]
mod tests {
    use std::{ffi::OsStr, path::PathBuf, time::Duration};

    use anyhow::Result;
    use notify::{
        event::{AccessKind, CreateKind, ModifyKind},
        EventKind,
    };
    use tempfile::tempdir;
    use tokio::{sync::mpsc, time::timeout};

    use super::{is_relevant, watch_preferences};
    use crate::settings::{
        entities::Preferences,
        store::{JsonPreferenceStore, PreferenceStore},
    };

    #[test]
    fn only_changes_to_the_document_count() {
        let name = Some(OsStr::new("preferences.json"));
        let document = vec![PathBuf::from("/state/preferences.json")];
        let log = vec![PathBuf::from("/state/logs")];

        assert!(is_relevant(&EventKind::Modify(ModifyKind::Any), &document, name));
        assert!(is_relevant(&EventKind::Create(CreateKind::File), &document, name));
        assert!(!is_relevant(&EventKind::Access(AccessKind::Any), &document, name));
        assert!(!is_relevant(&EventKind::Modify(ModifyKind::Any), &log, name));
    }

    #[tokio::test]
    async fn saving_preferences_is_signalled() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonPreferenceStore::in_dir(dir.path());
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let _watcher = watch_preferences(store.path(), sender)?;

        store.save(&Preferences::default()).await?;

        assert!(timeout(Duration::from_secs(5), receiver.recv())
            .await?
            .is_some());
        Ok(())
    }
}
