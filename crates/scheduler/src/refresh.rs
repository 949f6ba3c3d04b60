//! Daily refresh of every forecast some user depends on.
//!
//! A single job lives in the `weather_updates` log. When it comes due the
//! worker refreshes all demanded cities, one provider request at a time, then
//! replaces the job with one for 00:01 the next day. A crash mid-refresh
//! leaves the job in place, so the refresh simply runs again.

use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use tokio_util::sync::CancellationToken;

use weatherbell_storage::{JobClass, ScheduledJob};

use crate::Tick;
use crate::clock::{Clock, next_refresh_at};
use crate::context::{Services, WorkerConfig};
use crate::error::SchedulerError;
use crate::provider::ForecastService;
use crate::supervisor::pause;

/// Outcome of one bulk refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub refreshed: usize,
    pub failed: usize,
}

pub struct RefreshScheduler {
    services: Arc<Services>,
    forecasts: Arc<ForecastService>,
    clock: Arc<dyn Clock>,
    config: WorkerConfig,
}

impl RefreshScheduler {
    pub fn new(
        services: Arc<Services>,
        forecasts: Arc<ForecastService>,
        clock: Arc<dyn Clock>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            services,
            forecasts,
            clock,
            config,
        }
    }

    /// Replace whatever refresh job exists with one for tomorrow 00:01.
    ///
    /// The new entry is appended before older ones are deleted, so a failure
    /// at any point leaves at least one refresh job in the log.
    pub async fn install(&self) -> Result<DateTime<Local>, SchedulerError> {
        let queue = &self.services.queue;
        let execute_at = next_refresh_at(&self.clock.now())?;
        let job = ScheduledJob::Refresh {
            execute_at: execute_at.with_timezone(&Utc),
        };
        let installed = queue
            .append(JobClass::WeatherRefresh, &job.to_record())
            .await?;

        for entry in queue.range_all(JobClass::WeatherRefresh).await? {
            if entry.id == installed {
                continue;
            }
            if let Err(e) = queue.delete(JobClass::WeatherRefresh, &entry.id).await {
                tracing::error!(job_id = %entry.id, error = %e, "Failed to delete refresh job");
            }
        }

        tracing::info!(%execute_at, job_id = %installed, "Weather refresh scheduled");
        Ok(execute_at)
    }

    /// Refresh every city referenced by a user, pacing provider requests.
    ///
    /// A failure for one city is counted and does not stop the rest.
    pub async fn refresh_all(&self) -> Result<RefreshReport, SchedulerError> {
        let city_ids = self.services.cities.demanded_city_ids().await?;
        let mut report = RefreshReport::default();

        for (i, city_id) in city_ids.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.config.refresh_pacing).await;
            }
            match self.forecasts.refresh(*city_id).await {
                Ok(_) => report.refreshed += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(city_id, error = %e, "Failed to refresh forecast");
                }
            }
        }

        tracing::info!(
            refreshed = report.refreshed,
            failed = report.failed,
            "Weather refresh finished"
        );
        Ok(report)
    }

    /// One pass over the refresh log.
    ///
    /// Several due entries (left over from an interrupted reschedule) still
    /// trigger a single refresh.
    pub async fn tick(&self) -> Result<Tick, SchedulerError> {
        if !self.services.health.is_healthy() {
            return Ok(Tick::Unhealthy);
        }

        let entries = self
            .services
            .queue
            .range_all(JobClass::WeatherRefresh)
            .await?;
        let now = self.clock.now().with_timezone(&Utc);

        let mut pending = 0;
        let mut due = false;
        for entry in &entries {
            match entry.decode(JobClass::WeatherRefresh) {
                Ok(job) => {
                    pending += 1;
                    due |= job.is_due(now);
                }
                Err(e) => {
                    tracing::warn!(job_id = %entry.id, error = %e, "Dropping malformed refresh job");
                    if let Err(e) = self
                        .services
                        .queue
                        .delete(JobClass::WeatherRefresh, &entry.id)
                        .await
                    {
                        tracing::error!(job_id = %entry.id, error = %e, "Failed to delete malformed job");
                    }
                }
            }
        }

        if pending == 0 {
            tracing::warn!("No refresh job pending, reinstalling");
            self.install().await?;
            return Ok(Tick::Idle);
        }
        if !due {
            return Ok(Tick::Idle);
        }

        tracing::info!("Weather refresh due");
        self.refresh_all().await?;
        self.install().await?;
        Ok(Tick::Processed(1))
    }

    /// Poll until cancelled.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), SchedulerError> {
        loop {
            let outcome = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                outcome = self.tick() => outcome,
            };

            let wait = match outcome {
                Ok(Tick::Unhealthy) => {
                    tracing::warn!(
                        backoff_secs = self.config.unhealthy_backoff.as_secs(),
                        "Fast tier unhealthy, refresh worker backing off"
                    );
                    self.config.unhealthy_backoff
                }
                Ok(_) => self.config.poll_interval,
                Err(e) => {
                    tracing::error!(error = %e, "Refresh pass failed");
                    self.config.poll_interval
                }
            };

            if !pause(&cancel, wait).await {
                return Ok(());
            }
        }
    }
}
