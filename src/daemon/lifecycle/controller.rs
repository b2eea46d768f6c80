use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, info_span, trace, warn};

use crate::{
    app_api::{ActivationPolicy, AppController, AppEvent, Pid, RunningApp},
    settings::{
        entities::{AppAction, Preferences},
        events::{changes, SettingsEvent},
        resolver::{effective_action, effective_hide_after},
    },
};

use super::{
    registry::{WatchRecord, WatchRegistry, WatchState},
    timers::{DelayTimers, TimerKey},
};

/// Reacts to application lifecycle events and preference changes by arming and disarming one
/// inactivity timer per watched process.
///
/// Invariant: a record has a pending timer only while it is [WatchState::VisibleInactive], the
/// pause flag was off when it was armed and its resolved duration is not "never". Re-arming always
/// cancels first, so there is at most one pending timer per process.
pub struct LifecycleController<C> {
    apps: C,
    registry: WatchRegistry,
    timers: DelayTimers,
    preferences: Preferences,
}

impl<C: AppController> LifecycleController<C> {
    pub fn new(apps: C, preferences: Preferences) -> Self {
        Self {
            apps,
            registry: WatchRegistry::new(),
            timers: DelayTimers::new(),
            preferences,
        }
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn registry(&self) -> &WatchRegistry {
        &self.registry
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Starts watching every regular application that is already running.
    pub fn watch_running_applications(&mut self) -> Result<()> {
        for app in self.apps.running_applications()? {
            self.watch(app);
        }
        info!("Watching {} applications", self.registry.len());
        Ok(())
    }

    pub fn handle_app_event(&mut self, event: AppEvent) {
        let span = info_span!("Handling app event", ?event);
        let _guard = span.enter();

        match event {
            AppEvent::Launched(app) => self.watch(app),
            AppEvent::Terminated(pid) => self.forget(pid),
            AppEvent::Activated(pid) => self.update_record(pid, |v| v.is_active = true),
            AppEvent::Deactivated(pid) => self.update_record(pid, |v| v.is_active = false),
            AppEvent::Hidden(pid) => self.update_record(pid, |v| v.is_hidden = true),
            AppEvent::Unhidden(pid) => self.update_record(pid, |v| v.is_hidden = false),
        }
    }

    /// Replaces the preferences and re-evaluates whatever the difference affects.
    pub fn reload_preferences(&mut self, preferences: Preferences) {
        let events = changes(&self.preferences, &preferences);
        self.preferences = preferences;
        for event in events {
            self.handle_settings_event(event);
        }
    }

    /// Re-evaluates timers after the preferences were changed. Expects [Self::preferences] to
    /// already hold the new values.
    pub fn handle_settings_event(&mut self, event: SettingsEvent) {
        let span = info_span!("Handling settings event", ?event);
        let _guard = span.enter();

        match event {
            SettingsEvent::DefaultChanged(_) | SettingsEvent::PauseChanged(false) => {
                for pid in self.registry.pids_in_state(WatchState::VisibleInactive) {
                    self.rearm(pid);
                }
            }
            // Armed timers stay armed, the flag is checked when they fire.
            SettingsEvent::PauseChanged(true) => info!("Paused"),
            SettingsEvent::AppSettingUpdated {
                bundle_identifier,
                app_name,
            } => {
                for pid in self
                    .registry
                    .pids_matching(bundle_identifier.as_deref(), app_name.as_deref())
                {
                    self.rearm(pid);
                }
            }
        }
    }

    /// Waits for the next inactivity timer to expire. The result is meant for
    /// [Self::handle_timer_fired].
    pub async fn next_expired(&mut self) -> (Pid, TimerKey) {
        self.timers.next_expired().await
    }

    pub fn handle_timer_fired(&mut self, pid: Pid, key: TimerKey) {
        let span = info_span!("Handling expired timer", pid);
        let _guard = span.enter();

        let Some(record) = self.registry.get_mut(pid) else {
            debug!("Process is no longer watched");
            return;
        };
        if record.timer.as_ref() != Some(&key) {
            debug!("Timer was superseded");
            return;
        }
        record.timer = None;

        if self.preferences.paused {
            debug!("Paused, leaving {} alone", record.app.display_name());
            return;
        }

        let Some(state) = self.apps.app_state(pid) else {
            debug!("Process is gone");
            return;
        };
        record.is_active = state.is_active;
        record.is_hidden = state.is_hidden;
        if record.state() != WatchState::VisibleInactive {
            debug!("{} is {:?}, nothing to do", record.app.display_name(), record.state());
            return;
        }

        match effective_action(&record.app.identity(), &self.preferences.custom_app_settings) {
            AppAction::Hide => {
                info!("Hiding {}", record.app.display_name());
                match self.apps.hide(pid) {
                    Ok(()) => record.is_hidden = true,
                    Err(e) => warn!("Failed to hide {}: {e:?}", record.app.display_name()),
                }
            }
            AppAction::Quit => {
                info!("Quitting {}", record.app.display_name());
                if let Err(e) = self.apps.terminate(pid) {
                    warn!("Failed to quit {}: {e:?}", record.app.display_name());
                }
            }
        }
    }

    fn watch(&mut self, app: RunningApp) {
        if app.activation_policy != ActivationPolicy::Regular {
            trace!("Ignoring {} with {:?} policy", app.display_name(), app.activation_policy);
            return;
        }
        let pid = app.pid;
        let Some(record) = self.registry.insert(app) else {
            trace!("Process {pid} is already watched");
            return;
        };
        debug!("Watching {} ({pid})", record.app.display_name());
        self.rearm(pid);
    }

    fn forget(&mut self, pid: Pid) {
        let Some(record) = self.registry.remove(pid) else {
            trace!("Process {pid} was not watched");
            return;
        };
        if let Some(key) = record.timer {
            self.timers.cancel(&key);
        }
        debug!("Stopped watching {} ({pid})", record.app.display_name());
    }

    fn update_record(&mut self, pid: Pid, update: impl FnOnce(&mut WatchRecord)) {
        let Some(record) = self.registry.get_mut(pid) else {
            trace!("Process {pid} is not watched");
            return;
        };
        update(record);
        self.rearm(pid);
    }

    /// Cancels the pending timer of a record and arms a new one if the record is eligible.
    fn rearm(&mut self, pid: Pid) {
        let Some(record) = self.registry.get_mut(pid) else {
            return;
        };
        if let Some(key) = record.timer.take() {
            self.timers.cancel(&key);
            trace!("Cancelled timer for {}", record.app.display_name());
        }

        if record.state() != WatchState::VisibleInactive {
            return;
        }
        if self.preferences.paused {
            trace!("Paused, not arming a timer for {}", record.app.display_name());
            return;
        }

        let seconds = effective_hide_after(
            &record.app.identity(),
            &self.preferences.custom_app_settings,
            self.preferences.hide_after,
        );
        // 0 means never
        if seconds <= 0. {
            trace!("{} is never hidden", record.app.display_name());
            return;
        }
        let Ok(delay) = Duration::try_from_secs_f64(seconds) else {
            warn!("{} has an unusable duration {seconds}", record.app.display_name());
            return;
        };

        record.timer = Some(self.timers.arm(pid, delay));
        debug!("{} scheduled timer for {seconds}s", record.app.display_name());
    }
}
