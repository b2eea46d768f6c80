use std::collections::HashMap;

use super::entities::{CustomAppSetting, Preferences};

/// Notification that part of the preferences changed and watched applications should be
/// re-evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsEvent {
    DefaultChanged(f64),
    AppSettingUpdated {
        bundle_identifier: Option<String>,
        app_name: Option<String>,
    },
    PauseChanged(bool),
}

impl SettingsEvent {
    pub fn app_setting_updated(setting: &CustomAppSetting) -> Self {
        Self::AppSettingUpdated {
            bundle_identifier: Some(setting.bundle_identifier.clone()),
            app_name: Some(setting.app_name.clone()),
        }
    }
}

/// Computes the events that turn `old` into `new`. Settings are paired by identity key, so a
/// setting that was added, removed or edited produces exactly one event.
pub fn changes(old: &Preferences, new: &Preferences) -> Vec<SettingsEvent> {
    let mut events = vec![];

    if old.hide_after != new.hide_after {
        events.push(SettingsEvent::DefaultChanged(new.hide_after));
    }

    if old.paused != new.paused {
        events.push(SettingsEvent::PauseChanged(new.paused));
    }

    let mut previous = old
        .custom_app_settings
        .iter()
        .map(|v| (v.identity_key(), v))
        .collect::<HashMap<_, _>>();

    for setting in &new.custom_app_settings {
        match previous.remove(&setting.identity_key()) {
            Some(before)
                if before.hide_after == setting.hide_after && before.action == setting.action => {}
            _ => events.push(SettingsEvent::app_setting_updated(setting)),
        }
    }

    // Removals follow the order of the old document.
    for setting in &old.custom_app_settings {
        if previous.contains_key(&setting.identity_key()) {
            events.push(SettingsEvent::app_setting_updated(setting));
        }
    }

    events
}
