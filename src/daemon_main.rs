use std::env::args;

use anyhow::Result;
use clap::Parser;
use hideaway::{
    daemon::{args::DaemonArgs, run_daemon_blocking},
    utils::{
        dir::application_path,
        logging::{enable_logging, DAEMON_PREFIX},
    },
};
use tracing::error;

fn main() -> Result<()> {
    run_service(args().collect::<Vec<_>>())
}

fn run_service(command_args: Vec<String>) -> Result<()> {
    let args = DaemonArgs::parse_from(&command_args);

    #[cfg(unix)]
    if !args.force {
        use daemonize::Daemonize;

        let daemonize = Daemonize::new()
            .stdout(daemonize::Stdio::devnull())
            .stderr(daemonize::Stdio::devnull())
            .execute();
        match daemonize {
            daemonize::Outcome::Parent(parent) => {
                parent.inspect_err(|e| eprintln!("Failed to create daemon on parent side {e:?}"))?;
                println!("Created daemon");
                return Ok(());
            }
            daemonize::Outcome::Child(_) => (),
        }
    }

    run(args)
}

fn run(args: DaemonArgs) -> Result<()> {
    let app_dir = application_path(args.dir)?;
    enable_logging(DAEMON_PREFIX, &app_dir, args.log, args.log_console)?;
    run_daemon_blocking(app_dir).inspect_err(|e| error!("Daemon stopped with an error {e:?}"))
}
