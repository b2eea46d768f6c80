use std::{
    future::Future,
    ops::Deref,
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::fs::operations::{read_locked, write_locked};

use super::entities::{Preferences, PreferencesDocument, StoredPreferences};

pub const PREFERENCES_FILE: &str = "preferences.json";

/// Interface for abstracting persistence of [Preferences]. Every mutation is saved immediately,
/// there is no batching.
pub trait PreferenceStore {
    fn load(&self) -> impl Future<Output = Result<Preferences>>;

    fn save(&self, preferences: &Preferences) -> impl Future<Output = Result<()>>;
}

impl<T: Deref> PreferenceStore for T
where
    T::Target: PreferenceStore,
{
    fn load(&self) -> impl Future<Output = Result<Preferences>> {
        self.deref().load()
    }

    fn save(&self, preferences: &Preferences) -> impl Future<Output = Result<()>> {
        self.deref().save(preferences)
    }
}

/// The main realization of [PreferenceStore]. Keeps the document as json in a single file.
pub struct JsonPreferenceStore {
    path: PathBuf,
}

impl JsonPreferenceStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(PREFERENCES_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for JsonPreferenceStore {
    async fn load(&self) -> Result<Preferences> {
        let Some(contents) = read_locked(&self.path).await? else {
            debug!("No preferences at {:?}, using defaults", self.path);
            return Ok(Preferences::default());
        };

        let stored = serde_json::from_str::<StoredPreferences>(&contents)
            .with_context(|| format!("Failed to parse preferences in {:?}", self.path))?;

        let needs_upgrade = stored.needs_upgrade();
        let preferences = stored.upgrade();
        if needs_upgrade {
            self.save(&preferences).await?;
            info!("Saved upgraded preferences to {:?}", self.path);
        }
        Ok(preferences)
    }

    async fn save(&self, preferences: &Preferences) -> Result<()> {
        let contents = serde_json::to_vec_pretty(&PreferencesDocument::current(preferences))?;
        write_locked(&self.path, &contents)
            .await
            .with_context(|| format!("Failed to write preferences to {:?}", self.path))?;
        Ok(())
    }
}

/// Keeps preferences in memory. Used where nothing should touch the disk.
#[derive(Default)]
pub struct MemoryPreferenceStore {
    preferences: Mutex<Preferences>,
}

impl MemoryPreferenceStore {
    pub fn new(preferences: Preferences) -> Self {
        Self {
            preferences: Mutex::new(preferences),
        }
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    async fn load(&self) -> Result<Preferences> {
        Ok(self
            .preferences
            .lock()
            .map_err(|e| anyhow::anyhow!("Preferences lock poisoned {e}"))?
            .clone())
    }

    async fn save(&self, preferences: &Preferences) -> Result<()> {
        *self
            .preferences
            .lock()
            .map_err(|e| anyhow::anyhow!("Preferences lock poisoned {e}"))? = preferences.clone();
        Ok(())
    }
}
