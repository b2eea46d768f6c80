use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;

#[derive(Parser, Debug)]
#[command(name = "hideaway-daemon", version, about = "Hides applications that stay inactive")]
pub struct DaemonArgs {
    /// Run in the current process instead of detaching.
    #[arg(long)]
    pub force: bool,
    /// Application directory holding the preferences and logs.
    #[arg(long)]
    pub dir: Option<PathBuf>,
    /// This option is for debugging purposes only.
    #[arg(long = "log-console")]
    pub log_console: bool,
    #[arg(long = "log-filter")]
    pub log: Option<LevelFilter>,
}
