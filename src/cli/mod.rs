pub mod apps;
pub mod daemon_path;
pub mod output;
pub mod process;

use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use apps::{process_apps_command, AppsCommand};
use clap::{Parser, Subcommand};
use output::{format_option, format_summary, header};
use process::{daemon_executable, kill_previous_servers, restart_server, running_servers};
use tracing::{info, level_filters::LevelFilter};

use crate::{
    daemon::run_daemon_blocking,
    settings::{
        duration_table::{self, option_for_position},
        editor,
        store::{JsonPreferenceStore, PreferenceStore},
    },
    utils::{
        dir::application_path,
        logging::{enable_logging, CLI_PREFIX, DAEMON_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "Hideaway", version, long_about = None)]
#[command(about = "Hides or quits applications that were left in the background")]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default $HOME/Library/Application Support/hideaway on macOS and $XDG_STATE_HOME or $HOME/.local/state elsewhere"
    )]
    dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Enable logging")]
    log: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Starts a daemon for the application")]
    Init,
    #[command(
        about = "Run a daemon directly in current console. Used for debugging"
    )]
    Serve,
    #[command(about = "Stop currently running daemon.")]
    Stop,
    #[command(about = "Show whether the daemon runs and a summary of the preferences")]
    Status,
    #[command(about = "List the available durations with their slider positions")]
    Options,
    #[command(about = "Change the default duration")]
    Default {
        #[command(flatten)]
        duration: DurationArg,
    },
    #[command(about = "Stop hiding applications until resumed")]
    Pause,
    #[command(about = "Resume hiding applications")]
    Resume,
    #[command(about = "Manage per application settings")]
    Apps {
        #[command(subcommand)]
        command: AppsCommand,
    },
}

/// A duration given either as a slider position or directly in seconds.
#[derive(Debug, Clone, Copy, clap::Args)]
#[group(multiple = false)]
pub struct DurationArg {
    #[arg(long, help = "Slider position from 0 to 100, snapped to the closest duration")]
    position: Option<f64>,
    #[arg(long, help = "Duration in seconds, 0 means never. See `options`")]
    seconds: Option<f64>,
}

impl DurationArg {
    pub fn seconds(&self) -> Result<Option<f64>> {
        match (self.position, self.seconds) {
            (Some(position), _) => option_for_position(position)
                .map(|v| Some(v.seconds))
                .ok_or_else(|| anyhow!("Position {position} is outside of 0..=100")),
            (None, seconds) => Ok(seconds),
        }
    }
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();
    let dir = application_path(args.dir.clone())?;

    let (prefix, logging_level, show_std) = match args.commands {
        Commands::Serve => (DAEMON_PREFIX, Some(LevelFilter::TRACE), true),
        _ => (CLI_PREFIX, args.log.then_some(LevelFilter::TRACE), args.log),
    };
    enable_logging(prefix, &dir, logging_level, show_std)?;

    let store = JsonPreferenceStore::in_dir(&dir);

    match args.commands {
        // AppKit wants the main thread, so the runtime gives it up for the daemon.
        Commands::Serve => tokio::task::block_in_place(|| run_daemon_blocking(dir)),
        Commands::Init => {
            restart_server(args.dir.as_deref())?;
            println!("Started daemon");
            Ok(())
        }
        Commands::Stop => {
            let stopped = kill_previous_servers(&daemon_executable()?)?;
            println!("Stopped {stopped} daemon(s)");
            Ok(())
        }
        Commands::Status => {
            let running = !running_servers(&daemon_executable()?)?.is_empty();
            println!(
                "Daemon:\t{}",
                if running { "running" } else { "not running" }
            );
            let preferences = store.load().await?;
            for line in format_summary(&preferences) {
                println!("{line}");
            }
            #[cfg(feature = "trial")]
            println!(
                "Trial days left:\t{}",
                crate::settings::trial::trial_days_left(&preferences, chrono::Utc::now())
            );
            Ok(())
        }
        Commands::Options => {
            println!("{}", header("Position\tSeconds\tLabel"));
            for option in duration_table::options() {
                println!("{}", format_option(option));
            }
            Ok(())
        }
        Commands::Default { duration } => {
            let Some(seconds) = duration.seconds()? else {
                bail!("Pass either --position or --seconds");
            };
            let mut preferences = store.load().await?;
            if editor::set_default_hide_after(&mut preferences, seconds)? {
                store.save(&preferences).await?;
                info!("Default changed to {seconds}");
            }
            println!("Default:\t{}", duration_table::label(preferences.hide_after));
            Ok(())
        }
        Commands::Pause => set_paused(&store, true).await,
        Commands::Resume => set_paused(&store, false).await,
        Commands::Apps { command } => process_apps_command(&store, command).await,
    }
}

async fn set_paused(store: &JsonPreferenceStore, paused: bool) -> Result<()> {
    let mut preferences = store.load().await?;
    if editor::set_paused(&mut preferences, paused) {
        store.save(&preferences).await?;
    }
    println!("{}", if paused { "Paused" } else { "Resumed" });
    Ok(())
}
