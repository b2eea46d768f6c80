use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::duration_table;

/// Default inactivity duration for applications without a custom setting, in seconds.
pub const DEFAULT_HIDE_AFTER: f64 = 600.;

/// Version written into every saved preference document. Version 1 documents predate bundle
/// identifier support.
pub const PREFERENCES_VERSION: u32 = 2;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AppAction {
    #[default]
    Hide,
    Quit,
}

/// Per application override of the inactivity duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomAppSetting {
    pub app_name: String,
    /// For settings saved before bundle identifiers were recorded this holds [Self::app_name].
    pub bundle_identifier: String,
    pub hide_after: f64,
    #[serde(default)]
    pub action: AppAction,
}

impl CustomAppSetting {
    pub fn new(app_name: impl Into<String>, bundle_identifier: impl Into<String>, hide_after: f64) -> Self {
        Self {
            app_name: app_name.into(),
            bundle_identifier: bundle_identifier.into(),
            hide_after,
            action: AppAction::Hide,
        }
    }

    pub fn is_legacy(&self) -> bool {
        self.bundle_identifier == self.app_name
    }

    pub fn identity_key(&self) -> String {
        identity_key(&self.bundle_identifier, &self.app_name)
    }

    /// Whether `key` names this setting, either by bundle identifier or by display name.
    pub fn is_named(&self, key: &str) -> bool {
        self.bundle_identifier == key || self.app_name == key
    }
}

/// Key deduplicating settings. Legacy settings are only known by name.
pub fn identity_key(bundle_identifier: &str, app_name: &str) -> String {
    if bundle_identifier == app_name {
        format!("name:{app_name}")
    } else {
        format!("bundle:{bundle_identifier}")
    }
}

/// Everything the daemon and the cli persist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preferences {
    /// Seconds. 0 means never.
    pub hide_after: f64,
    pub custom_app_settings: Vec<CustomAppSetting>,
    pub paused: bool,
    pub first_run_date: Option<DateTime<Utc>>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            hide_after: DEFAULT_HIDE_AFTER,
            custom_app_settings: vec![],
            paused: false,
            first_run_date: None,
        }
    }
}

/// The document as written to disk.
#[derive(Serialize)]
pub struct PreferencesDocument<'a> {
    pub version: u32,
    #[serde(flatten)]
    pub preferences: &'a Preferences,
}

impl<'a> PreferencesDocument<'a> {
    pub fn current(preferences: &'a Preferences) -> Self {
        Self {
            version: PREFERENCES_VERSION,
            preferences,
        }
    }
}

/// The document as read from disk. Every field is optional so that older documents still load.
#[derive(Debug, Deserialize)]
pub struct StoredPreferences {
    #[serde(default = "legacy_version")]
    pub version: u32,
    #[serde(default = "default_hide_after")]
    pub hide_after: f64,
    #[serde(default)]
    pub custom_app_settings: Vec<StoredAppSetting>,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub first_run_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct StoredAppSetting {
    pub app_name: String,
    #[serde(default)]
    pub bundle_identifier: Option<String>,
    pub hide_after: f64,
    #[serde(default)]
    pub action: AppAction,
}

fn legacy_version() -> u32 {
    1
}

fn default_hide_after() -> f64 {
    DEFAULT_HIDE_AFTER
}

fn known_duration(seconds: f64, fallback: f64, owner: &str) -> f64 {
    if duration_table::option_for_seconds(seconds).is_some() {
        return seconds;
    }
    warn!("Ignoring unknown duration {seconds} for {owner}, using {fallback}");
    fallback
}

impl StoredPreferences {
    pub fn needs_upgrade(&self) -> bool {
        self.version < PREFERENCES_VERSION
    }

    /// Brings a stored document up to [PREFERENCES_VERSION]. Settings without a bundle identifier
    /// get their display name in its place, which marks them for name based matching.
    ///
    /// Durations that are not in the duration table fall back to the default, or for custom
    /// settings to the document's default.
    pub fn upgrade(self) -> Preferences {
        if self.needs_upgrade() {
            info!(
                "Upgrading preferences from version {} to {PREFERENCES_VERSION}",
                self.version
            );
        }
        let hide_after = known_duration(self.hide_after, DEFAULT_HIDE_AFTER, "default");
        let custom_app_settings = self
            .custom_app_settings
            .into_iter()
            .map(|v| {
                let bundle_identifier = v
                    .bundle_identifier
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| v.app_name.clone());
                CustomAppSetting {
                    hide_after: known_duration(v.hide_after, hide_after, &v.app_name),
                    app_name: v.app_name,
                    bundle_identifier,
                    action: v.action,
                }
            })
            .collect();

        Preferences {
            hide_after,
            custom_app_settings,
            paused: self.paused,
            first_run_date: self.first_run_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::{AppAction, CustomAppSetting, Preferences, PreferencesDocument, StoredPreferences};

    #[test]
    fn legacy_document_is_upgraded() -> Result<()> {
        let stored: StoredPreferences = serde_json::from_str(
            r#"{
                "hide_after": 300.0,
                "custom_app_settings": [
                    { "app_name": "Notes", "hide_after": 180.0 },
                    { "app_name": "Mail", "hide_after": 60.0, "action": "quit" }
                ]
            }"#,
        )?;
        assert!(stored.needs_upgrade());

        let preferences = stored.upgrade();
        assert_eq!(preferences.hide_after, 300.);
        assert_eq!(
            preferences.custom_app_settings,
            vec![
                CustomAppSetting::new("Notes", "Notes", 180.),
                CustomAppSetting {
                    action: AppAction::Quit,
                    ..CustomAppSetting::new("Mail", "Mail", 60.)
                },
            ]
        );
        assert!(preferences.custom_app_settings.iter().all(|v| v.is_legacy()));
        Ok(())
    }

    #[test]
    fn current_document_loads_unchanged() -> Result<()> {
        let mut preferences = Preferences::default();
        preferences
            .custom_app_settings
            .push(CustomAppSetting::new("Safari", "com.apple.Safari", 120.));
        preferences.paused = true;

        let json = serde_json::to_string(&PreferencesDocument::current(&preferences))?;
        let stored: StoredPreferences = serde_json::from_str(&json)?;

        assert!(!stored.needs_upgrade());
        assert_eq!(stored.upgrade(), preferences);
        Ok(())
    }

    #[test]
    fn identity_keys_separate_legacy_settings() {
        assert_eq!(
            CustomAppSetting::new("Notes", "Notes", 0.).identity_key(),
            "name:Notes"
        );
        assert_eq!(
            CustomAppSetting::new("Safari", "com.apple.Safari", 0.).identity_key(),
            "bundle:com.apple.Safari"
        );
    }

    #[test]
    fn unknown_durations_fall_back() -> Result<()> {
        let stored: StoredPreferences = serde_json::from_str(
            r#"{
                "version": 2,
                "hide_after": 100000000.0,
                "custom_app_settings": [
                    { "app_name": "Notes", "bundle_identifier": "com.apple.Notes", "hide_after": -5.0 },
                    { "app_name": "Mail", "bundle_identifier": "com.apple.mail", "hide_after": 1e300 },
                    { "app_name": "Safari", "bundle_identifier": "com.apple.Safari", "hide_after": 3600.0 }
                ]
            }"#,
        )?;

        let preferences = stored.upgrade();
        assert_eq!(preferences.hide_after, 600.);
        let durations = preferences
            .custom_app_settings
            .iter()
            .map(|v| v.hide_after)
            .collect::<Vec<_>>();
        assert_eq!(durations, vec![600., 600., 3600.]);
        Ok(())
    }
}
