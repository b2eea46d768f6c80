use std::{path::PathBuf, thread};

use anyhow::{anyhow, Result};
use lifecycle::module::LifecycleModule;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    app_api::{AppController, AppEvent, AppEventSource, GenericAppController, GenericAppEventSource},
    settings::store::{JsonPreferenceStore, PreferenceStore},
    utils::{
        clock::{Clock, DefaultClock},
        runtime::single_thread_runtime,
    },
};

pub mod args;
pub mod lifecycle;
pub mod shutdown;
pub mod watcher;

/// Runs the daemon on the calling thread, which must be the main thread on macOS.
///
/// The platform event loop is driven here while the lifecycle module runs on a worker thread with
/// its own single threaded runtime. Returns once the module stops.
pub fn run_daemon_blocking(dir: PathBuf) -> Result<()> {
    let mut source = GenericAppEventSource::new()?;
    let (sender, receiver) = mpsc::unbounded_channel::<AppEvent>();
    let subscription = source.subscribe(sender)?;

    let worker = thread::Builder::new()
        .name("lifecycle".into())
        .spawn(move || single_thread_runtime()?.block_on(start_daemon(dir, receiver)))?;

    source
        .run_until(&|| worker.is_finished())
        .inspect_err(|e| error!("Platform event loop failed {e:?}"))?;
    subscription.cancel();

    worker
        .join()
        .map_err(|_| anyhow!("Lifecycle thread panicked"))?
}

/// Represents the starting point for the daemon
pub async fn start_daemon(
    dir: PathBuf,
    app_events: mpsc::UnboundedReceiver<AppEvent>,
) -> Result<()> {
    std::env::set_current_dir("/")?;

    let store = JsonPreferenceStore::in_dir(&dir);
    let apps = GenericAppController::new()?;

    run_lifecycle(apps, store, app_events, DefaultClock).await
}

/// Wires the preference watcher, the lifecycle module and shutdown detection together and runs
/// them until one of them stops.
async fn run_lifecycle(
    apps: impl AppController,
    store: JsonPreferenceStore,
    app_events: mpsc::UnboundedReceiver<AppEvent>,
    clock: impl Clock,
) -> Result<()> {
    let (changed, changes) = mpsc::unbounded_channel();
    let _watcher = watcher::watch_preferences(store.path(), changed)?;
    info!("Watching preferences at {:?}", store.path());

    let shutdown_token = CancellationToken::new();
    let module = create_module(apps, store, app_events, changes, &shutdown_token, clock).await?;

    let (_, result) = tokio::join!(shutdown::detect_shutdown(shutdown_token.clone()), async {
        let result = module.run().await;
        shutdown_token.cancel();
        result
    });

    result.inspect_err(|e| error!("Lifecycle module got an error {e:?}"))
}

async fn create_module<C: AppController, S: PreferenceStore>(
    apps: C,
    store: S,
    app_events: mpsc::UnboundedReceiver<AppEvent>,
    changes: mpsc::UnboundedReceiver<()>,
    shutdown_token: &CancellationToken,
    clock: impl Clock,
) -> Result<LifecycleModule<C, S>> {
    LifecycleModule::new(
        apps,
        store,
        app_events,
        changes,
        shutdown_token.clone(),
        Box::new(clock),
    )
    .await
}

#[cfg(test)]
mod daemon_tests {
    use std::{sync::Arc, time::Duration};

    use anyhow::Result;
    use chrono::{DateTime, TimeZone, Utc};
    use tempfile::tempdir;
    use tokio::{sync::mpsc, time::timeout};

    use super::run_lifecycle;
    use crate::{
        app_api::{ActivationPolicy, AppEvent, MockAppController, RunningApp},
        settings::{
            entities::Preferences,
            store::{JsonPreferenceStore, PreferenceStore},
        },
        utils::{clock::Clock, logging::TEST_LOGGING, runtime::single_thread_runtime},
    };

    struct TestClock(DateTime<Utc>);

    impl Clock for TestClock {
        fn time(&self) -> DateTime<Utc> {
            self.0
        }
    }

    /// Very simple smoke test: the daemon starts against a real preference file, picks up an
    /// edit made while it runs and stops once the event source is closed.
    #[tokio::test]
    async fn smoke_test_daemon() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let start = Utc.with_ymd_and_hms(2018, 7, 4, 0, 0, 0).unwrap();

        let mut apps = MockAppController::new();
        apps.expect_running_applications().returning(|| {
            Ok(vec![RunningApp {
                pid: 5,
                bundle_identifier: Some(Arc::from("com.apple.Notes")),
                localized_name: Some(Arc::from("Notes")),
                activation_policy: ActivationPolicy::Regular,
                is_agent_bundle: false,
                is_active: true,
                is_hidden: false,
            }])
        });
        apps.expect_hide().never();

        let (sender, receiver) = mpsc::unbounded_channel();
        let editor = JsonPreferenceStore::in_dir(dir.path());

        let run = async {
            tokio::join!(
                run_lifecycle(
                    apps,
                    JsonPreferenceStore::in_dir(dir.path()),
                    receiver,
                    TestClock(start)
                ),
                async {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    // The cli writes from another process, the file lock must not be taken from
                    // the daemon's only runtime thread.
                    let path = dir.path().to_path_buf();
                    let result = tokio::task::spawn_blocking(move || {
                        single_thread_runtime()?.block_on(JsonPreferenceStore::in_dir(&path).save(
                            &Preferences {
                                hide_after: 0.,
                                first_run_date: Some(start),
                                ..Default::default()
                            },
                        ))
                    })
                    .await;
                    sender.send(AppEvent::Deactivated(5)).unwrap();
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    drop(sender);
                    result
                }
            )
        };
        let (result, edit) = timeout(Duration::from_secs(10), run).await?;
        result?;
        edit??;

        let stored = editor.load().await?;
        assert_eq!(stored.first_run_date, Some(start));
        assert_eq!(stored.hide_after, 0.);
        Ok(())
    }
}
