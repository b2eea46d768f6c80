use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    app_api::{AppController, AppEvent},
    settings::{entities::Preferences, store::PreferenceStore, trial},
    utils::clock::Clock,
};

use super::controller::LifecycleController;

/// Single threaded event loop that owns the [LifecycleController]. Everything that mutates the
/// watch registry goes through here: OS notifications, preference reloads and expired timers.
pub struct LifecycleModule<C, S> {
    controller: LifecycleController<C>,
    store: S,
    app_events: mpsc::UnboundedReceiver<AppEvent>,
    preference_changes: mpsc::UnboundedReceiver<()>,
    shutdown: CancellationToken,
    clock: Box<dyn Clock>,
}

impl<C: AppController, S: PreferenceStore> LifecycleModule<C, S> {
    /// Loads the preferences and stamps the first run date when it is missing.
    pub async fn new(
        apps: C,
        store: S,
        app_events: mpsc::UnboundedReceiver<AppEvent>,
        preference_changes: mpsc::UnboundedReceiver<()>,
        shutdown: CancellationToken,
        clock: Box<dyn Clock>,
    ) -> Result<Self> {
        let mut preferences = store.load().await?;
        if trial::stamp_first_run(&mut preferences, clock.time()) {
            info!("First run, recording {:?}", preferences.first_run_date);
            store.save(&preferences).await?;
        }
        let preferences = enforce_trial(preferences, clock.time());

        Ok(Self {
            controller: LifecycleController::new(apps, preferences),
            store,
            app_events,
            preference_changes,
            shutdown,
            clock,
        })
    }

    async fn reload_preferences(&mut self) -> Result<()> {
        let preferences = self.store.load().await?;
        let preferences = enforce_trial(preferences, self.clock.time());
        self.controller.reload_preferences(preferences);
        Ok(())
    }

    /// Executes the event loop until shutdown or until the OS event source goes away.
    pub async fn run(mut self) -> Result<()> {
        self.controller
            .watch_running_applications()
            .inspect_err(|e| error!("Failed to list running applications {e:?}"))?;

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Shutting down");
                    return Ok(());
                }
                event = self.app_events.recv() => {
                    let Some(event) = event else {
                        warn!("Application event source closed");
                        return Ok(());
                    };
                    self.controller.handle_app_event(event);
                }
                Some(()) = self.preference_changes.recv() => {
                    debug!("Reloading preferences");
                    if let Err(e) = self.reload_preferences().await {
                        // Keep the previous preferences, the cli may be halfway through a write.
                        error!("Failed to reload preferences {e:?}");
                    }
                }
                (pid, key) = self.controller.next_expired() => {
                    self.controller.handle_timer_fired(pid, key);
                }
            }
        }
    }
}

/// Trial builds stop hiding once the trial is over. The document itself is left untouched.
fn enforce_trial(mut preferences: Preferences, now: DateTime<Utc>) -> Preferences {
    if cfg!(feature = "trial") && trial::trial_expired(&preferences, now) {
        warn!("Trial period is over, not hiding applications");
        preferences.paused = true;
    }
    preferences
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use anyhow::Result;
    use chrono::{DateTime, TimeZone, Utc};
    use mockall::predicate::eq;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use super::LifecycleModule;
    use crate::{
        app_api::{ActivationPolicy, AppEvent, AppState, MockAppController, RunningApp},
        settings::{
            entities::Preferences,
            store::{MemoryPreferenceStore, PreferenceStore},
        },
        utils::{clock::Clock, logging::TEST_LOGGING},
    };

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn time(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn start_date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2018, 7, 4, 0, 0, 0).unwrap()
    }

    fn notes() -> RunningApp {
        RunningApp {
            pid: 3,
            bundle_identifier: Some(Arc::from("com.apple.Notes")),
            localized_name: Some(Arc::from("Notes")),
            activation_policy: ActivationPolicy::Regular,
            is_agent_bundle: false,
            is_active: true,
            is_hidden: false,
        }
    }

    #[tokio::test]
    async fn first_run_date_is_recorded_once() -> Result<()> {
        let store = Arc::new(MemoryPreferenceStore::default());
        let (_, app_events) = mpsc::unbounded_channel();
        let (_, changes) = mpsc::unbounded_channel();

        LifecycleModule::new(
            MockAppController::new(),
            store.clone(),
            app_events,
            changes,
            CancellationToken::new(),
            Box::new(FixedClock(start_date())),
        )
        .await?;
        assert_eq!(store.load().await?.first_run_date, Some(start_date()));

        let (_, app_events) = mpsc::unbounded_channel();
        let (_, changes) = mpsc::unbounded_channel();
        LifecycleModule::new(
            MockAppController::new(),
            store.clone(),
            app_events,
            changes,
            CancellationToken::new(),
            Box::new(FixedClock(start_date() + chrono::Duration::days(3))),
        )
        .await?;
        assert_eq!(store.load().await?.first_run_date, Some(start_date()));
        Ok(())
    }

    /// Drives the loop end to end: a running application is deactivated, gets hidden after the
    /// default duration and the loop stops on shutdown.
    #[tokio::test(start_paused = true)]
    async fn smoke_test_module() -> Result<()> {
        *TEST_LOGGING;
        let mut apps = MockAppController::new();
        apps.expect_running_applications()
            .returning(|| Ok(vec![notes()]));
        apps.expect_app_state().return_const(Some(AppState {
            is_active: false,
            is_hidden: false,
        }));
        apps.expect_hide().with(eq(3)).times(1).returning(|_| Ok(()));

        let store = Arc::new(MemoryPreferenceStore::new(Preferences {
            hide_after: 30.,
            ..Default::default()
        }));
        let (app_sender, app_events) = mpsc::unbounded_channel();
        let (change_sender, changes) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();

        let module = LifecycleModule::new(
            apps,
            store.clone(),
            app_events,
            changes,
            shutdown.clone(),
            Box::new(FixedClock(start_date())),
        )
        .await?;

        let (result, _) = tokio::join!(module.run(), async {
            app_sender.send(AppEvent::Deactivated(3)).unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
            // A reload without changes leaves the pending timer alone.
            change_sender.send(()).unwrap();
            tokio::time::sleep(Duration::from_secs(60)).await;
            shutdown.cancel();
        });

        result
    }
}
