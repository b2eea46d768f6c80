use super::entities::{AppAction, CustomAppSetting};

/// What an application is known by when matching it against custom settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppIdentity<'a> {
    pub bundle_identifier: Option<&'a str>,
    pub localized_name: Option<&'a str>,
}

impl<'a> AppIdentity<'a> {
    pub fn new(bundle_identifier: Option<&'a str>, localized_name: Option<&'a str>) -> Self {
        Self {
            bundle_identifier,
            localized_name,
        }
    }
}

/// Finds the custom setting for an application. Bundle identifiers are matched first. Settings
/// recorded before bundle identifiers were known are matched by display name.
pub fn custom_setting<'s>(
    identity: &AppIdentity,
    settings: &'s [CustomAppSetting],
) -> Option<&'s CustomAppSetting> {
    if let Some(bundle_identifier) = identity.bundle_identifier {
        if let Some(setting) = settings
            .iter()
            .find(|v| v.bundle_identifier == bundle_identifier)
        {
            return Some(setting);
        }
    }

    let localized_name = identity.localized_name?;
    settings
        .iter()
        .find(|v| v.is_legacy() && v.app_name == localized_name)
}

pub fn effective_hide_after(
    identity: &AppIdentity,
    settings: &[CustomAppSetting],
    default_hide_after: f64,
) -> f64 {
    custom_setting(identity, settings).map_or(default_hide_after, |v| v.hide_after)
}

pub fn effective_action(identity: &AppIdentity, settings: &[CustomAppSetting]) -> AppAction {
    custom_setting(identity, settings).map_or_else(AppAction::default, |v| v.action)
}

#[cfg(test)]
mod tests {
    use super::{effective_action, effective_hide_after, AppIdentity};
    use crate::settings::entities::{AppAction, CustomAppSetting};

    fn settings() -> Vec<CustomAppSetting> {
        vec![
            CustomAppSetting::new("Safari", "com.apple.Safari", 120.),
            CustomAppSetting::new("Mail", "com.apple.mail", 300.),
            CustomAppSetting::new("Notes", "Notes", 180.),
        ]
    }

    #[test]
    fn uses_bundle_identifier_when_available() {
        let identity = AppIdentity::new(Some("com.apple.Safari"), Some("Safari"));
        assert_eq!(effective_hide_after(&identity, &settings(), 600.), 120.);
    }

    #[test]
    fn falls_back_to_legacy_name_matching() {
        let identity = AppIdentity::new(None, Some("Notes"));
        assert_eq!(effective_hide_after(&identity, &settings(), 600.), 180.);
    }

    #[test]
    fn legacy_match_applies_when_identifier_is_unknown_to_settings() {
        let identity = AppIdentity::new(Some("com.apple.Notes"), Some("Notes"));
        assert_eq!(effective_hide_after(&identity, &settings(), 600.), 180.);
    }

    #[test]
    fn name_does_not_match_settings_with_identifiers() {
        let identity = AppIdentity::new(None, Some("Safari"));
        assert_eq!(effective_hide_after(&identity, &settings(), 600.), 600.);
    }

    #[test]
    fn unmatched_identity_gets_default() {
        let identity = AppIdentity::new(Some("org.mozilla.firefox"), Some("Firefox"));
        assert_eq!(effective_hide_after(&identity, &settings(), 42.), 42.);
        assert_eq!(effective_hide_after(&AppIdentity::default(), &settings(), 42.), 42.);
    }

    #[test]
    fn action_follows_matched_setting() {
        let mut settings = settings();
        settings[1].action = AppAction::Quit;

        let mail = AppIdentity::new(Some("com.apple.mail"), Some("Mail"));
        let safari = AppIdentity::new(Some("com.apple.Safari"), None);
        let unknown = AppIdentity::new(Some("com.example"), None);

        assert_eq!(effective_action(&mail, &settings), AppAction::Quit);
        assert_eq!(effective_action(&safari, &settings), AppAction::Hide);
        assert_eq!(effective_action(&unknown, &settings), AppAction::Hide);
    }
}
