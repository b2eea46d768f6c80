use std::{
    env,
    path::{Path, PathBuf},
    process::Stdio,
};

use anyhow::{anyhow, Result};
use sysinfo::{get_current_pid, Pid, Signal, System};
use tracing::{debug, info};

use super::daemon_path::to_daemon_path;

pub fn daemon_executable() -> Result<PathBuf> {
    Ok(to_daemon_path(env::current_exe()?))
}

fn find_servers(system: &System, name: &Path) -> Result<Vec<Pid>> {
    let current_id = get_current_pid().map_err(|e| anyhow!("Can't get current pid: {e}"))?;
    Ok(system
        .processes()
        .iter()
        .filter(|(pid, _)| **pid != current_id)
        .filter(|(_, process)| !matches!(process.parent(), Some(p) if p == current_id))
        .filter(|(_, process)| {
            process
                .exe()
                .filter(|v| v.exists())
                .is_some_and(|v| name == v)
        })
        .map(|(pid, _)| *pid)
        .collect())
}

/// Process ids of running daemons started from `name`.
pub fn running_servers(name: &Path) -> Result<Vec<Pid>> {
    find_servers(&System::new_all(), name)
}

/// Stops every daemon started from `name`. Returns how many were stopped.
pub fn kill_previous_servers(name: &Path) -> Result<usize> {
    let system = System::new_all();
    let servers = find_servers(&system, name)?;
    for pid in &servers {
        let Some(process) = system.process(*pid) else {
            continue;
        };
        debug!("Stopping daemon {pid}");
        if process.kill_with(Signal::Term).is_none() {
            process.kill();
        }
        process.wait();
    }
    Ok(servers.len())
}

/// Intended for shutting down previous daemon and starting new one. The daemon runs as a process
/// in its own group, so that it survives the terminal it was started from.
pub fn restart_server(dir: Option<&Path>) -> Result<()> {
    let daemon = daemon_executable()?;
    kill_previous_servers(&daemon)?;

    let mut command = std::process::Command::new(&daemon);
    command.arg("--force");
    if let Some(dir) = dir {
        command.arg("--dir").arg(dir);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    command.stdin(Stdio::null());
    command.stdout(Stdio::null());
    command.stderr(Stdio::null());

    info!("Spawning {daemon:?}");
    #[allow(clippy::zombie_processes)]
    let _ = command.spawn()?;
    Ok(())
}
