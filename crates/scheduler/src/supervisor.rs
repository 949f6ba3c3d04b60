use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::SchedulerError;

/// Sleep for `duration` unless cancelled first. Returns `false` on cancellation.
pub async fn pause(cancel: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

/// Keeps one worker loop alive until shutdown.
///
/// The loop body is started after `start_delay` and restarted after
/// `restart_delay` whenever it returns while the token is still live.
#[derive(Debug, Clone)]
pub struct Supervisor {
    name: &'static str,
    start_delay: Duration,
    restart_delay: Duration,
}

impl Supervisor {
    pub fn new(name: &'static str, start_delay: Duration, restart_delay: Duration) -> Self {
        Self {
            name,
            start_delay,
            restart_delay,
        }
    }

    /// Returns the number of restarts performed.
    pub async fn run<F, Fut>(&self, cancel: CancellationToken, mut body: F) -> usize
    where
        F: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = Result<(), SchedulerError>>,
    {
        let mut restarts = 0;

        if pause(&cancel, self.start_delay).await {
            tracing::info!(worker = self.name, "Worker started");

            loop {
                match body(cancel.clone()).await {
                    Ok(()) if cancel.is_cancelled() => break,
                    Ok(()) => {
                        tracing::warn!(worker = self.name, "Worker loop returned unexpectedly, restarting")
                    }
                    Err(e) => {
                        tracing::error!(worker = self.name, error = %e, "Worker loop failed, restarting")
                    }
                }

                if !pause(&cancel, self.restart_delay).await {
                    break;
                }
                restarts += 1;
            }
        }

        tracing::info!(worker = self.name, restarts, "Worker stopped");
        restarts
    }
}
