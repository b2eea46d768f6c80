//! AppKit backed implementation. Lifecycle notifications come from the shared workspace
//! notification center, which only delivers while the main thread run loop is running.

use std::{thread, time::Duration};

use anyhow::{anyhow, Result};
use objc2::{
    define_class, msg_send,
    rc::{Allocated, Retained},
    sel, AnyThread, DefinedClass,
};
use objc2_app_kit::{
    NSApplicationActivationPolicy, NSRunningApplication, NSWorkspace, NSWorkspaceApplicationKey,
};
use objc2_foundation::{
    MainThreadMarker, NSBundle, NSDate, NSDefaultRunLoopMode, NSKeyValueCoding, NSNotification,
    NSNotificationCenter, NSNumber, NSObject, NSRunLoop, NSString,
};
use tokio::sync::mpsc;
use tracing::{debug, info_span, trace, warn};

use super::{
    ActivationPolicy, AppController, AppEvent, AppEventSource, AppState, Pid, RunningApp,
    Subscription,
};

const RUN_LOOP_SLICE: Duration = Duration::from_millis(250);

define_class! {
    // SAFETY:
    // - The superclass NSObject does not have any subclassing requirements.
    // - `WorkspaceObserver` does not implement `Drop`.
    #[unsafe(super(NSObject))]
    #[ivars = mpsc::UnboundedSender<AppEvent>]
    struct WorkspaceObserver;

    // SAFETY: Each of these method signatures must match their invocations.
    impl WorkspaceObserver {
        #[unsafe(method(recvAppEvent:))]
        fn recv_app_event(&self, notif: &NSNotification) {
            trace!("{notif:#?}");
            self.handle_app_event(notif);
        }
    }
}

impl WorkspaceObserver {
    fn new(sender: mpsc::UnboundedSender<AppEvent>) -> Retained<Self> {
        let this: Allocated<Self> = Self::alloc();
        let this = this.set_ivars(sender);
        unsafe { msg_send![super(this), init] }
    }

    fn handle_app_event(&self, notif: &NSNotification) {
        use objc2_app_kit::*;
        let Some(app) = running_application(notif) else {
            return;
        };
        let pid = unsafe { app.processIdentifier() };
        let name = &*notif.name();
        let span = info_span!("workspace_observer::handle_app_event", ?name, pid);
        let _guard = span.enter();

        let event = unsafe {
            if NSWorkspaceDidLaunchApplicationNotification == name {
                AppEvent::Launched(snapshot(&app))
            } else if NSWorkspaceDidTerminateApplicationNotification == name {
                AppEvent::Terminated(pid)
            } else if NSWorkspaceDidActivateApplicationNotification == name {
                AppEvent::Activated(pid)
            } else if NSWorkspaceDidDeactivateApplicationNotification == name {
                AppEvent::Deactivated(pid)
            } else if NSWorkspaceDidHideApplicationNotification == name {
                AppEvent::Hidden(pid)
            } else if NSWorkspaceDidUnhideApplicationNotification == name {
                AppEvent::Unhidden(pid)
            } else {
                warn!("Unexpected workspace notification {notif:?}");
                return;
            }
        };

        if self.ivars().send(event).is_err() {
            debug!("Event receiver is gone, dropping notification");
        }
    }
}

fn running_application(notif: &NSNotification) -> Option<Retained<NSRunningApplication>> {
    let Some(info) = notif.userInfo() else {
        warn!("Got app notification without user info: {notif:?}");
        return None;
    };
    let Some(app) = (unsafe { info.valueForKey(NSWorkspaceApplicationKey) }) else {
        warn!("Got app notification without app object: {notif:?}");
        return None;
    };
    app.downcast::<NSRunningApplication>()
        .inspect_err(|v| warn!("Application key holds an unexpected object {v:?}"))
        .ok()
}

fn snapshot(app: &NSRunningApplication) -> RunningApp {
    unsafe {
        let policy = app.activationPolicy();
        let activation_policy = if policy == NSApplicationActivationPolicy::Regular {
            ActivationPolicy::Regular
        } else if policy == NSApplicationActivationPolicy::Accessory {
            ActivationPolicy::Accessory
        } else {
            ActivationPolicy::Prohibited
        };

        RunningApp {
            pid: app.processIdentifier(),
            bundle_identifier: app.bundleIdentifier().map(|v| v.to_string().into()),
            localized_name: app.localizedName().map(|v| v.to_string().into()),
            activation_policy,
            is_agent_bundle: is_agent_bundle(app),
            is_active: app.isActive(),
            is_hidden: app.isHidden(),
        }
    }
}

/// Reads `LSUIElement` and `LSBackgroundOnly` from the bundle's Info.plist.
fn is_agent_bundle(app: &NSRunningApplication) -> bool {
    #[allow(unused_unsafe)]
    unsafe {
        let Some(bundle) = app.bundleURL().and_then(|url| NSBundle::bundleWithURL(&url)) else {
            return false;
        };
        ["LSUIElement", "LSBackgroundOnly"].into_iter().any(|key| {
            bundle
                .objectForInfoDictionaryKey(&NSString::from_str(key))
                .and_then(|v| v.downcast::<NSNumber>().ok())
                .is_some_and(|v| v.as_bool())
        })
    }
}

fn find_application(pid: Pid) -> Option<Retained<NSRunningApplication>> {
    unsafe { NSRunningApplication::runningApplicationWithProcessIdentifier(pid) }
        .filter(|v| unsafe { !v.isTerminated() })
}

/// Queries and commands processes through `NSRunningApplication`.
pub struct WorkspaceAppController;

impl AppController for WorkspaceAppController {
    fn running_applications(&self) -> Result<Vec<RunningApp>> {
        let workspace = NSWorkspace::sharedWorkspace();
        let apps = unsafe { workspace.runningApplications() };
        Ok(apps.iter().map(|v| snapshot(&v)).collect())
    }

    fn app_state(&self, pid: Pid) -> Option<AppState> {
        let app = find_application(pid)?;
        unsafe {
            Some(AppState {
                is_active: app.isActive(),
                is_hidden: app.isHidden(),
            })
        }
    }

    fn hide(&self, pid: Pid) -> Result<()> {
        let app = find_application(pid).ok_or_else(|| anyhow!("Process {pid} is gone"))?;
        if !unsafe { app.hide() } {
            return Err(anyhow!("Process {pid} refused to hide"));
        }
        Ok(())
    }

    fn terminate(&self, pid: Pid) -> Result<()> {
        let app = find_application(pid).ok_or_else(|| anyhow!("Process {pid} is gone"))?;
        if !unsafe { app.terminate() } {
            return Err(anyhow!("Process {pid} refused to terminate"));
        }
        Ok(())
    }
}

/// Delivers workspace notifications. Has to live on the main thread.
pub struct WorkspaceEventSource {
    _main_thread: MainThreadMarker,
}

impl WorkspaceEventSource {
    pub fn new() -> Result<Self> {
        let main_thread = MainThreadMarker::new()
            .ok_or_else(|| anyhow!("Workspace notifications must be observed from the main thread"))?;
        Ok(Self {
            _main_thread: main_thread,
        })
    }
}

impl AppEventSource for WorkspaceEventSource {
    fn subscribe(&mut self, sender: mpsc::UnboundedSender<AppEvent>) -> Result<Subscription> {
        let observer = WorkspaceObserver::new(sender);
        let workspace = NSWorkspace::sharedWorkspace();
        let center: Retained<NSNotificationCenter> = unsafe { workspace.notificationCenter() };

        unsafe {
            use objc2_app_kit::*;
            for name in [
                NSWorkspaceDidLaunchApplicationNotification,
                NSWorkspaceDidTerminateApplicationNotification,
                NSWorkspaceDidActivateApplicationNotification,
                NSWorkspaceDidDeactivateApplicationNotification,
                NSWorkspaceDidHideApplicationNotification,
                NSWorkspaceDidUnhideApplicationNotification,
            ] {
                // SAFETY: Selector must have signature fn(&self, &NSNotification)
                center.addObserver_selector_name_object(
                    &observer,
                    sel!(recvAppEvent:),
                    Some(name),
                    None,
                );
            }
        }

        Ok(Subscription::new(move || {
            debug!("Removing workspace observer");
            unsafe { center.removeObserver(&observer) };
        }))
    }

    fn run_until(&self, done: &dyn Fn() -> bool) -> Result<()> {
        let run_loop = NSRunLoop::currentRunLoop();
        while !done() {
            let limit = NSDate::dateWithTimeIntervalSinceNow(RUN_LOOP_SLICE.as_secs_f64());
            // Without attached sources the run loop returns immediately.
            if !unsafe { run_loop.runMode_beforeDate(NSDefaultRunLoopMode, &limit) } {
                thread::sleep(RUN_LOOP_SLICE);
            }
        }
        Ok(())
    }
}
