//! Liveness gate for the fast tier.
//!
//! The monitor probes on a fixed interval and publishes a single boolean. The
//! schedulers consult it before doing any work that depends on the fast tier.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::store::LivenessProbe;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(60);

pub struct HealthMonitor {
    probe: Arc<dyn LivenessProbe>,
    healthy: AtomicBool,
    timeout: Duration,
    interval: Duration,
}

impl HealthMonitor {
    /// Starts out unhealthy until the first probe succeeds.
    pub fn new(probe: Arc<dyn LivenessProbe>) -> Self {
        Self {
            probe,
            healthy: AtomicBool::new(false),
            timeout: DEFAULT_PROBE_TIMEOUT,
            interval: DEFAULT_PROBE_INTERVAL,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    /// One liveness check. A timeout counts as a failure.
    ///
    /// Logs only when the state flips.
    pub async fn probe(&self) -> bool {
        let healthy = match tokio::time::timeout(self.timeout, self.probe.ping()).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "Fast tier probe failed");
                false
            }
            Err(_) => {
                tracing::debug!(timeout_ms = self.timeout.as_millis() as u64, "Fast tier probe timed out");
                false
            }
        };

        let was_healthy = self.healthy.swap(healthy, Ordering::AcqRel);
        if was_healthy != healthy {
            if healthy {
                tracing::info!("Fast tier is healthy");
            } else {
                tracing::warn!("Fast tier is unhealthy");
            }
        }
        healthy
    }

    /// Probe immediately, then once per interval until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            timeout_ms = self.timeout.as_millis() as u64,
            "Health monitor started"
        );

        loop {
            self.probe().await;
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        tracing::info!("Health monitor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::store::Result;
    use async_trait::async_trait;

    struct StalledProbe;

    #[async_trait]
    impl LivenessProbe for StalledProbe {
        async fn ping(&self) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_starts_unhealthy_and_follows_probe() {
        let store = Arc::new(MemoryStore::new());
        let monitor = HealthMonitor::new(store.clone());
        assert!(!monitor.is_healthy());

        assert!(monitor.probe().await);
        assert!(monitor.is_healthy());

        store.set_available(false);
        assert!(!monitor.probe().await);
        assert!(!monitor.is_healthy());

        store.set_available(true);
        assert!(monitor.probe().await);
    }

    #[tokio::test]
    async fn test_probe_timeout_marks_unhealthy() {
        let monitor =
            HealthMonitor::new(Arc::new(StalledProbe)).with_timeout(Duration::from_millis(20));
        assert!(!monitor.probe().await);
        assert!(!monitor.is_healthy());
    }

    #[tokio::test]
    async fn test_run_probes_until_cancelled() {
        let store = Arc::new(MemoryStore::new());
        let monitor = Arc::new(
            HealthMonitor::new(store.clone()).with_interval(Duration::from_millis(10)),
        );
        let cancel = CancellationToken::new();

        let handle = tokio::spawn({
            let monitor = monitor.clone();
            let cancel = cancel.clone();
            async move { monitor.run(cancel).await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(monitor.is_healthy());
        assert!(store.operations() >= 2);

        cancel.cancel();
        handle.await.unwrap();
    }
}
