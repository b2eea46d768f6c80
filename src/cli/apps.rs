use anyhow::{anyhow, bail, Result};
use clap::Subcommand;
use tracing::info;

use crate::{
    app_api::{AppController, GenericAppController},
    settings::{
        editor::{self, candidate_applications, CandidateApp},
        entities::{AppAction, Preferences},
        store::{JsonPreferenceStore, PreferenceStore},
    },
};

use super::{
    output::{action_name, format_setting, header},
    DurationArg,
};

#[derive(Subcommand, Debug)]
pub enum AppsCommand {
    #[command(about = "List applications with a custom setting")]
    List,
    #[command(
        about = "Add custom settings. Without arguments prints the running applications that can be added"
    )]
    Add {
        #[arg(help = "Names or bundle identifiers of running applications")]
        apps: Vec<String>,
        #[arg(
            long = "bundle-id",
            conflicts_with = "apps",
            requires = "name",
            help = "Add an application that is not running"
        )]
        bundle_identifier: Option<String>,
        #[arg(long, requires = "bundle_identifier", help = "Display name for --bundle-id")]
        name: Option<String>,
    },
    #[command(about = "Remove a custom setting")]
    Remove {
        #[arg(help = "Name or bundle identifier")]
        key: String,
    },
    #[command(about = "Change the duration or action of a custom setting")]
    Set {
        #[arg(help = "Name or bundle identifier")]
        key: String,
        #[command(flatten)]
        duration: DurationArg,
        #[arg(long, value_enum)]
        action: Option<AppAction>,
    },
}

pub async fn process_apps_command(store: &JsonPreferenceStore, command: AppsCommand) -> Result<()> {
    let mut preferences = store.load().await?;

    match command {
        AppsCommand::List => {
            if preferences.custom_app_settings.is_empty() {
                println!("No custom settings");
                return Ok(());
            }
            println!("{}", header("Name\tBundle\tHide after\tAction"));
            for setting in &preferences.custom_app_settings {
                println!("{}", format_setting(setting));
            }
            Ok(())
        }
        AppsCommand::Add {
            bundle_identifier: Some(bundle_identifier),
            name,
            ..
        } => {
            let candidate = manual_candidate(bundle_identifier, name)?;
            add(store, &mut preferences, &[candidate]).await
        }
        AppsCommand::Add { apps, .. } => {
            let running = GenericAppController::new()?.running_applications()?;
            let candidates = candidate_applications(running, &preferences.custom_app_settings);

            if apps.is_empty() {
                if candidates.is_empty() {
                    println!("No running applications to add");
                }
                for candidate in candidates {
                    println!("{}\t{}", candidate.name, candidate.bundle_identifier);
                }
                return Ok(());
            }

            let selected = select_candidates(&candidates, &apps)?;
            add(store, &mut preferences, &selected).await
        }
        AppsCommand::Remove { key } => {
            let removed = editor::remove_application(&mut preferences, &key)?;
            store.save(&preferences).await?;
            println!("Removed {}", removed.app_name);
            Ok(())
        }
        AppsCommand::Set {
            key,
            duration,
            action,
        } => {
            let seconds = duration.seconds()?;
            if seconds.is_none() && action.is_none() {
                bail!("Nothing to change, pass a duration or --action");
            }

            let mut changed = false;
            if let Some(seconds) = seconds {
                changed |= editor::update_hide_after(&mut preferences, &key, seconds)?;
            }
            if let Some(action) = action {
                changed |= editor::set_action(&mut preferences, &key, action)?;
            }
            if changed {
                store.save(&preferences).await?;
                info!("Updated {key}");
            }
            if let Some(setting) = preferences
                .custom_app_settings
                .iter()
                .find(|v| v.is_named(&key))
            {
                println!("{}", format_setting(setting));
            }
            Ok(())
        }
    }
}

async fn add(
    store: &JsonPreferenceStore,
    preferences: &mut Preferences,
    candidates: &[CandidateApp],
) -> Result<()> {
    let added = editor::add_applications(preferences, candidates);
    if added.is_empty() {
        println!("Nothing to add, the applications already have a custom setting");
        return Ok(());
    }
    store.save(preferences).await?;
    for setting in added {
        println!("Added {} ({})", setting.app_name, action_name(setting.action));
    }
    Ok(())
}

/// Builds a candidate for an application that is not running. The name has to differ from the
/// identifier, otherwise the setting would be keyed and matched as a legacy one.
fn manual_candidate(bundle_identifier: String, name: Option<String>) -> Result<CandidateApp> {
    let Some(name) = name.filter(|v| !v.is_empty()) else {
        bail!("--bundle-id needs a --name");
    };
    if name == bundle_identifier {
        bail!("--name must differ from --bundle-id");
    }
    Ok(CandidateApp {
        name,
        bundle_identifier,
    })
}

/// Picks the candidates named by `requested`, by display name (case insensitive) or bundle
/// identifier.
fn select_candidates(candidates: &[CandidateApp], requested: &[String]) -> Result<Vec<CandidateApp>> {
    requested
        .iter()
        .map(|key| {
            candidates
                .iter()
                .find(|v| v.bundle_identifier == *key || v.name.eq_ignore_ascii_case(key))
                .cloned()
                .ok_or_else(|| anyhow!("{key} is not a running application that can be added"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{manual_candidate, select_candidates, AppsCommand};
    use crate::settings::editor::CandidateApp;

    #[derive(Parser, Debug)]
    struct Apps {
        #[command(subcommand)]
        command: AppsCommand,
    }

    fn candidates() -> Vec<CandidateApp> {
        vec![
            CandidateApp {
                name: "Safari".into(),
                bundle_identifier: "com.apple.Safari".into(),
            },
            CandidateApp {
                name: "Notes".into(),
                bundle_identifier: "com.apple.Notes".into(),
            },
        ]
    }

    #[test]
    fn candidates_are_selected_by_name_or_identifier() {
        let selected =
            select_candidates(&candidates(), &["safari".into(), "com.apple.Notes".into()]).unwrap();
        assert_eq!(selected, candidates());
    }

    #[test]
    fn unknown_candidate_is_an_error() {
        assert!(select_candidates(&candidates(), &["Mail".into()]).is_err());
    }

    #[test]
    fn manual_add_needs_a_distinct_name() {
        assert!(Apps::try_parse_from(["apps", "add", "--bundle-id", "com.apple.Notes"]).is_err());
        assert!(Apps::try_parse_from([
            "apps",
            "add",
            "--bundle-id",
            "com.apple.Notes",
            "--name",
            "Notes"
        ])
        .is_ok());

        assert!(manual_candidate("com.apple.Notes".into(), None).is_err());
        assert!(manual_candidate("com.apple.Notes".into(), Some("com.apple.Notes".into())).is_err());

        let candidate = manual_candidate("com.apple.Notes".into(), Some("Notes".into())).unwrap();
        assert_eq!(candidate.identity_key(), "bundle:com.apple.Notes");
    }
}
