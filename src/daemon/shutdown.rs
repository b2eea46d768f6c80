use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Cancels `cancelation` once the process is asked to stop. Returns early when something else
/// cancels it first.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received interrupt");
            cancelation.cancel();
        },
        _ = terminate() => {
            info!("Received termination request");
            cancelation.cancel();
        },
        _ = cancelation.cancelled() => (),
    };
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut signal) => {
            signal.recv().await;
        }
        Err(e) => {
            warn!("Can't listen for SIGTERM {e:?}");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
