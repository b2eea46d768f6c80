//! Mutations applied to [Preferences] on behalf of the user. Every function reports whether the
//! document changed so that the caller can persist it right away.

use std::collections::{BTreeMap, HashSet};

use anyhow::{anyhow, Result};

use crate::app_api::{ActivationPolicy, RunningApp};

use super::{
    duration_table,
    entities::{identity_key, AppAction, CustomAppSetting, Preferences},
};

/// Name of this program as reported by the OS. It is never offered as an application to manage.
pub const OWN_APP_NAME: &str = "hideaway";

const HELPER_NAME_TOKENS: [&str; 10] = [
    "helper",
    "agent",
    "launcher",
    "daemon",
    "updater",
    "plugin",
    "loginitem",
    "menubar",
    "menuextra",
    "statusitem",
];

const HELPER_BUNDLE_TOKENS: [&str; 12] = [
    ".helper",
    ".agent",
    ".launcher",
    ".daemon",
    ".updater",
    ".plugin",
    ".loginitem",
    ".login-item",
    ".menubar",
    ".menuextra",
    ".statusitem",
    ".status-item",
];

/// A running application that can be added to the custom settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateApp {
    pub name: String,
    pub bundle_identifier: String,
}

impl CandidateApp {
    pub fn identity_key(&self) -> String {
        identity_key(&self.bundle_identifier, &self.name)
    }
}

fn known_duration(seconds: f64) -> Result<f64> {
    duration_table::option_for_seconds(seconds)
        .map(|v| v.seconds)
        .ok_or_else(|| anyhow!("{seconds} seconds is not one of the available durations"))
}

fn find_setting<'p>(preferences: &'p mut Preferences, key: &str) -> Result<&'p mut CustomAppSetting> {
    preferences
        .custom_app_settings
        .iter_mut()
        .find(|v| v.is_named(key))
        .ok_or_else(|| anyhow!("No custom setting for {key}"))
}

pub fn set_default_hide_after(preferences: &mut Preferences, seconds: f64) -> Result<bool> {
    let seconds = known_duration(seconds)?;
    if preferences.hide_after == seconds {
        return Ok(false);
    }
    preferences.hide_after = seconds;
    Ok(true)
}

pub fn set_paused(preferences: &mut Preferences, paused: bool) -> bool {
    let changed = preferences.paused != paused;
    preferences.paused = paused;
    changed
}

/// Appends settings for candidates that are not configured yet. New settings start with the
/// current default duration. Returns the added settings.
pub fn add_applications(
    preferences: &mut Preferences,
    candidates: &[CandidateApp],
) -> Vec<CustomAppSetting> {
    let mut existing = preferences
        .custom_app_settings
        .iter()
        .map(CustomAppSetting::identity_key)
        .collect::<HashSet<_>>();

    let added = candidates
        .iter()
        .filter(|v| existing.insert(v.identity_key()))
        .map(|v| CustomAppSetting::new(&v.name, &v.bundle_identifier, preferences.hide_after))
        .collect::<Vec<_>>();

    preferences.custom_app_settings.extend(added.iter().cloned());
    added
}

pub fn remove_application(preferences: &mut Preferences, key: &str) -> Result<CustomAppSetting> {
    let index = preferences
        .custom_app_settings
        .iter()
        .position(|v| v.is_named(key))
        .ok_or_else(|| anyhow!("No custom setting for {key}"))?;
    Ok(preferences.custom_app_settings.remove(index))
}

pub fn update_hide_after(preferences: &mut Preferences, key: &str, seconds: f64) -> Result<bool> {
    let seconds = known_duration(seconds)?;
    let setting = find_setting(preferences, key)?;
    if setting.hide_after == seconds {
        return Ok(false);
    }
    setting.hide_after = seconds;
    Ok(true)
}

pub fn set_action(preferences: &mut Preferences, key: &str, action: AppAction) -> Result<bool> {
    let setting = find_setting(preferences, key)?;
    if setting.action == action {
        return Ok(false);
    }
    setting.action = action;
    Ok(true)
}

fn is_helper(name: &str, bundle_identifier: &str) -> bool {
    let compact_name = name.to_lowercase().replace(' ', "");
    if HELPER_NAME_TOKENS.iter().any(|v| compact_name.contains(v)) {
        return true;
    }
    let bundle_identifier = bundle_identifier.to_lowercase();
    HELPER_BUNDLE_TOKENS
        .iter()
        .any(|v| bundle_identifier.contains(v))
}

/// Filters running applications down to the ones worth offering for a custom setting. Helpers,
/// agents, this program and already configured applications are left out.
pub fn candidate_applications(
    running: impl IntoIterator<Item = RunningApp>,
    existing: &[CustomAppSetting],
) -> Vec<CandidateApp> {
    let excluded = existing
        .iter()
        .map(CustomAppSetting::identity_key)
        .collect::<HashSet<_>>();

    let mut unique = BTreeMap::new();
    for app in running {
        if app.activation_policy != ActivationPolicy::Regular || app.is_agent_bundle {
            continue;
        }
        let Some(bundle_identifier) = app.bundle_identifier.filter(|v| !v.is_empty()) else {
            continue;
        };
        let name = app
            .localized_name
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| bundle_identifier.clone());
        if name.eq_ignore_ascii_case(OWN_APP_NAME) || is_helper(&name, &bundle_identifier) {
            continue;
        }

        let candidate = CandidateApp {
            name: name.to_string(),
            bundle_identifier: bundle_identifier.to_string(),
        };
        let key = candidate.identity_key();
        if excluded.contains(&key) {
            continue;
        }
        unique.insert(key, candidate);
    }

    let mut candidates = unique.into_values().collect::<Vec<_>>();
    candidates.sort_by_key(|v| v.name.to_lowercase());
    candidates
}
