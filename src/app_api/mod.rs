//! Contains the contracts with the operating system: querying and commanding running
//! applications, and receiving their lifecycle notifications. [GenericAppController] and
//! [GenericAppEventSource] pick the implementation for the current platform.

#[cfg(all(feature = "macos", target_os = "macos"))]
pub mod macos;

use std::{fmt, sync::Arc};

use anyhow::Result;
use tokio::sync::mpsc;

use crate::settings::resolver::AppIdentity;

pub type Pid = i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationPolicy {
    /// Has a dock icon and ordinary windows.
    Regular,
    /// Menu bar extras and similar, may have windows but no dock icon.
    Accessory,
    /// Background only.
    Prohibited,
}

/// Snapshot of a running process as reported by the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningApp {
    pub pid: Pid,
    pub bundle_identifier: Option<Arc<str>>,
    pub localized_name: Option<Arc<str>>,
    pub activation_policy: ActivationPolicy,
    /// The bundle declares itself a UI element or background only in its Info.plist.
    pub is_agent_bundle: bool,
    pub is_active: bool,
    pub is_hidden: bool,
}

impl RunningApp {
    pub fn identity(&self) -> AppIdentity<'_> {
        AppIdentity::new(
            self.bundle_identifier.as_deref(),
            self.localized_name.as_deref(),
        )
    }

    pub fn display_name(&self) -> &str {
        self.localized_name
            .as_deref()
            .or(self.bundle_identifier.as_deref())
            .unwrap_or("<unnamed>")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppState {
    pub is_active: bool,
    pub is_hidden: bool,
}

/// Lifecycle notifications delivered by the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Launched(RunningApp),
    Terminated(Pid),
    Activated(Pid),
    Deactivated(Pid),
    Hidden(Pid),
    Unhidden(Pid),
}

/// Process control and queries. Commands are fire-and-forget, their completion is observed
/// through [AppEvent]s.
#[cfg_attr(test, mockall::automock)]
pub trait AppController {
    fn running_applications(&self) -> Result<Vec<RunningApp>>;

    /// Current state of a process, [None] once it is gone.
    fn app_state(&self, pid: Pid) -> Option<AppState>;

    fn hide(&self, pid: Pid) -> Result<()>;

    fn terminate(&self, pid: Pid) -> Result<()>;
}

/// Source of [AppEvent]s.
pub trait AppEventSource {
    /// Starts delivering events into `sender` until the returned [Subscription] is dropped.
    fn subscribe(&mut self, sender: mpsc::UnboundedSender<AppEvent>) -> Result<Subscription>;

    /// Drives the platform event loop on the current thread until `done` returns true.
    fn run_until(&self, done: &dyn Fn() -> bool) -> Result<()>;
}

/// Handle for an active observation. Cancels it when dropped.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(mut self) {
        self.cancel_inner();
    }

    fn cancel_inner(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_inner();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Serves as a cross-compatible AppController implementation.
pub struct GenericAppController {
    inner: Box<dyn AppController + Send>,
}

impl GenericAppController {
    pub fn new() -> Result<Self> {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "macos", target_os = "macos"))] {
                Ok(Self {
                    inner: Box::new(macos::WorkspaceAppController),
                })
            } else {
                Err(anyhow::anyhow!("No application backend was enabled for this build"))
            }
        }
    }
}

impl AppController for GenericAppController {
    fn running_applications(&self) -> Result<Vec<RunningApp>> {
        self.inner.running_applications()
    }

    fn app_state(&self, pid: Pid) -> Option<AppState> {
        self.inner.app_state(pid)
    }

    fn hide(&self, pid: Pid) -> Result<()> {
        self.inner.hide(pid)
    }

    fn terminate(&self, pid: Pid) -> Result<()> {
        self.inner.terminate(pid)
    }
}

/// Serves as a cross-compatible AppEventSource implementation.
pub struct GenericAppEventSource {
    inner: Box<dyn AppEventSource>,
}

impl GenericAppEventSource {
    pub fn new() -> Result<Self> {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "macos", target_os = "macos"))] {
                Ok(Self {
                    inner: Box::new(macos::WorkspaceEventSource::new()?),
                })
            } else {
                Err(anyhow::anyhow!("No application backend was enabled for this build"))
            }
        }
    }
}

impl AppEventSource for GenericAppEventSource {
    fn subscribe(&mut self, sender: mpsc::UnboundedSender<AppEvent>) -> Result<Subscription> {
        self.inner.subscribe(sender)
    }

    fn run_until(&self, done: &dyn Fn() -> bool) -> Result<()> {
        self.inner.run_until(done)
    }
}
