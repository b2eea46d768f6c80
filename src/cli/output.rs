use ansi_term::{Colour, Style};

use crate::settings::{
    duration_table::{self, HideAfterOption},
    entities::{AppAction, CustomAppSetting, Preferences},
};

pub fn header(text: &str) -> String {
    Style::new().bold().paint(text).to_string()
}

pub fn action_name(action: AppAction) -> &'static str {
    match action {
        AppAction::Hide => "hide",
        AppAction::Quit => "quit",
    }
}

pub fn format_option(option: &HideAfterOption) -> String {
    format!(
        "{:>6}\t{:>6}\t{}",
        option.snapped_position, option.seconds, option.label
    )
}

/// One line per setting: name, bundle identifier, duration and action. Legacy settings are
/// dimmed, they only match by name.
pub fn format_setting(setting: &CustomAppSetting) -> String {
    let line = format!(
        "{}\t{}\t{}\t{}",
        setting.app_name,
        setting.bundle_identifier,
        duration_table::label(setting.hide_after),
        action_name(setting.action),
    );
    if setting.is_legacy() {
        Colour::Fixed(8).paint(line).to_string()
    } else {
        line
    }
}

pub fn format_summary(preferences: &Preferences) -> Vec<String> {
    let paused = if preferences.paused {
        Colour::Yellow.paint("paused").to_string()
    } else {
        Colour::Green.paint("active").to_string()
    };
    vec![
        format!("Hiding:\t{paused}"),
        format!(
            "Default:\t{}",
            duration_table::label(preferences.hide_after)
        ),
        format!(
            "Custom settings:\t{}",
            preferences.custom_app_settings.len()
        ),
    ]
}
