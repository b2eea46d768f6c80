//! Background daemon and cli that hide, or quit, applications once they have been left in the
//! background for a while. Durations can be set globally and per application, and the daemon
//! picks up every change the cli makes to the preferences without restarting.

pub mod app_api;
pub mod cli;
pub mod daemon;
pub mod fs;
pub mod settings;
pub mod utils;
