//! Periodic deletion of stale durable-tier forecasts.
//!
//! The fast tier expires forecasts by TTL; the durable tier keeps them until
//! this task removes rows that missed two refresh cycles.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use weatherbell_storage::ForecastRetention;

use crate::error::SchedulerError;
use crate::supervisor::pause;

pub struct CleanupTask {
    store: Arc<dyn ForecastRetention>,
    interval: Duration,
    retention: chrono::Duration,
}

impl CleanupTask {
    pub fn new(
        store: Arc<dyn ForecastRetention>,
        interval: Duration,
        retention: chrono::Duration,
    ) -> Self {
        Self {
            store,
            interval,
            retention,
        }
    }

    pub async fn tick(&self) -> Result<u64, SchedulerError> {
        let removed = self
            .store
            .purge_forecasts_older_than(self.retention)
            .await?;
        tracing::info!(
            removed,
            retention_hours = self.retention.num_hours(),
            "Stale forecasts purged"
        );
        Ok(removed)
    }

    /// Wait one interval, purge, repeat. Failures are logged and never stop the loop.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), SchedulerError> {
        while pause(&cancel, self.interval).await {
            if let Err(e) = self.tick().await {
                tracing::error!(error = %e, "Forecast cleanup failed");
            }
        }
        Ok(())
    }
}
